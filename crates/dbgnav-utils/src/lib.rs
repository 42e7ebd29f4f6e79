//! # dbgnav Utilities
//!
//! Ambient helpers shared by the dbgnav crates. At the moment that is the
//! `tracing` subscriber setup used by the command-line front end.

pub mod logging;

pub use logging::{default_log_file, init_logging, LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
