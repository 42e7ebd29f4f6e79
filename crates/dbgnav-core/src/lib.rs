//! # dbgnav-core
//!
//! Typed navigation of a remote debuggee's memory.
//!
//! A [`DbgObject`] is a lightweight, immutable handle to a typed location in
//! the debuggee. Handles are derived from one another by field access,
//! pointer dereference, array indexing and casts; each derivation is either
//! pure (no I/O) or a single asynchronous round trip to a [`SymbolService`].
//!
//! This crate provides:
//! - Handle navigation: fields, pointers, arrays, bitfields and linked lists
//! - Exact and native scalar reads and writes
//! - Inheritance-aware casts driven by vtable symbols
//! - A frozen [`Registry`] of module aliases, field type overrides, extended
//!   fields, named arrays and custom descriptions
//! - [`SnapshotSymbols`](snapshot::SnapshotSymbols), an in-memory symbol
//!   service backed by JSON
//!
//! ## NULL
//!
//! A handle at address zero is NULL. Navigating from NULL yields NULL (or
//! an empty list) without a round trip, so chains like
//! `obj.f("a").await?.f("b").await?` can be written without checks.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use dbgnav_core::snapshot::{SnapshotSymbols, TypeLayout};
//! use dbgnav_core::types::Address;
//! use dbgnav_core::{Navigator, RegistryBuilder};
//!
//! # async fn run() -> dbgnav_core::NavResult<()> {
//! let symbols = SnapshotSymbols::new()
//!     .with_type("app", "Point", TypeLayout::new(8).with_field("x", "int", 0, 4).with_field("y", "int", 4, 4))
//!     .with_memory(Address::from(0x1000), &[1, 0, 0, 0, 2, 0, 0, 0]);
//! let nav = Navigator::new(Arc::new(symbols), RegistryBuilder::new().build());
//!
//! let point = nav.create(&nav.type_descriptor("app!Point"), Address::from(0x1000));
//! assert_eq!(point.f("y").await?.val().await?, Some(2.0));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extensions;
pub mod navigator;
pub mod numeric;
pub mod object;
pub mod prelude;
pub mod registry;
pub mod snapshot;
pub mod symbols;
pub mod types;

pub use error::{NavError, NavResult};
pub use navigator::Navigator;
pub use object::{DbgObject, ListStep, ObjectField};
pub use registry::{Registry, RegistryBuilder};
pub use symbols::SymbolService;
pub use types::{Address, BigValue, Scalar, TypeDescriptor};
