//! Platform-agnostic types shared by the navigation engine.

pub mod address;
pub mod descriptor;
pub mod symbols;
pub mod value;

pub use address::Address;
pub use descriptor::TypeDescriptor;
pub use symbols::{BaseTypeInfo, FieldInfo, GlobalSymbol, LocalSymbol, StackFrame, SymbolInfo};
pub use value::{BigValue, Scalar};
