//! TOML configuration for the `dbgnav` binary.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "json"
//! file = "/tmp/dbgnav.log"   # or: dir = "/tmp" for a dated file
//!
//! [modules]
//! lowercase = true
//! aliases = { app_debug = "app" }
//!
//! [[overrides]]
//! type = "app!Holder"
//! field = "numbers"
//! as = "unsigned int[4]"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dbgnav_core::RegistryBuilder;
use dbgnav_utils::{LogFormat, LogLevel, LoggingConfig};
use serde::Deserialize;
use tracing::debug;

/// Errors raised while loading the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError
{
    /// The file could not be read
    #[error("Failed to read configuration file '{path}': {source}")]
    Read
    {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config
{
    pub logging: LoggingSection,
    pub modules: ModulesSection,
    pub overrides: Vec<FieldOverride>,
}

/// `[logging]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection
{
    pub level: Option<LogLevel>,
    pub format: Option<LogFormat>,
    pub file: Option<PathBuf>,
    /// Directory for a dated log file; `file` wins when both are set
    pub dir: Option<PathBuf>,
}

/// `[modules]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModulesSection
{
    /// Compare module names case-insensitively
    pub lowercase: bool,
    /// Module renames applied after lower-casing
    pub aliases: BTreeMap<String, String>,
}

/// One `[[overrides]]` entry: read `field` of `type` as type `as`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOverride
{
    #[serde(rename = "type")]
    pub owner: String,
    pub field: String,
    #[serde(rename = "as")]
    pub overridden: String,
}

impl Config
{
    /// Parse a configuration from TOML text.
    ///
    /// ## Errors
    ///
    /// `ConfigError::Parse` on malformed TOML or unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError>
    {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse the file at `path`.
    ///
    /// ## Errors
    ///
    /// `ConfigError::Read` if the file cannot be read, `ConfigError::Parse`
    /// if it does not parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError>
    {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Engine registry for the module filters and field overrides.
    ///
    /// Lower-casing runs first, so alias keys are lower-cased too when it is on.
    pub fn registry_builder(&self) -> RegistryBuilder
    {
        let mut builder = RegistryBuilder::new();
        if self.modules.lowercase {
            builder = builder.with_lowercase_modules();
        }
        for (from, to) in &self.modules.aliases {
            let from = if self.modules.lowercase { from.to_lowercase() } else { from.clone() };
            builder = builder.with_module_alias(from, to.clone());
        }
        for entry in &self.overrides {
            builder = builder.with_type_override(entry.owner.clone(), entry.field.clone(), entry.overridden.clone());
        }
        builder
    }

    /// Apply the `[logging]` section on top of `base`.
    pub fn apply_logging(&self, mut base: LoggingConfig) -> LoggingConfig
    {
        if let Some(level) = self.logging.level {
            base = base.with_level(level);
        }
        if let Some(format) = self.logging.format {
            base = base.with_format(format);
        }
        if let Some(dir) = &self.logging.dir {
            base = base.with_default_file(dir);
        }
        if let Some(file) = &self.logging.file {
            base = base.with_file(file.clone());
        }
        base
    }
}
