//! Common module for library exports

pub use crate::error::{NavError, NavResult};
pub use crate::extensions::TypeMatcher;
pub use crate::navigator::Navigator;
pub use crate::object::{BitField, DbgObject, ListStep, ObjectField};
pub use crate::registry::{Registry, RegistryBuilder};
pub use crate::snapshot::{SnapshotSymbols, TypeLayout};
pub use crate::symbols::SymbolService;
pub use crate::types::{Address, BigValue, Scalar, StackFrame, TypeDescriptor};
