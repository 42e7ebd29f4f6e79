//! # Error Types
//!
//! Error handling for typed memory navigation.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for navigation operations
///
/// Every failed round trip or misuse of a [`DbgObject`](crate::DbgObject)
/// surfaces as one of these variants. A failure aborts only the chain of
/// operations that produced it; other handles are unaffected.
///
/// ## Error Categories
///
/// 1. **Usage errors**: InvalidOperation, InvalidNumberSize, ReadLimitExceeded, ValueOutOfRange
/// 2. **Lookup errors**: LookupFailure, MemoryAccess
/// 3. **Expected outcomes**: InvalidConstant, CastMismatch
/// 4. **Arithmetic errors**: AddressOverflow
/// 5. **Input errors**: Snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError
{
    /// The operation makes no sense for the handle it was called on
    ///
    /// Examples:
    /// - Field lookup on a pointer or an array
    /// - Bulk read from a `void` location
    /// - Count-less bulk read of a non-array type
    ///
    /// This is always a programmer error and is never retried.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The symbol service could not answer a lookup
    ///
    /// Unknown types, unknown fields and unresolved symbols all end up here.
    /// `DbgObject::f_any` swallows this error to try the next fallback path.
    #[error("Lookup failed: {0}")]
    LookupFailure(String),

    /// No enumerator of the given type has the given value
    #[error("Invalid constant: no name for value {value} in {type_name}")]
    InvalidConstant
    {
        /// The enum type that was searched
        type_name: String,
        /// The value that had no name
        value: String,
    },

    /// The dynamic type of an object is unrelated to the requested type
    #[error("Cast mismatch: {from} is not related to {to}")]
    CastMismatch
    {
        /// Type of the object being cast
        from: String,
        /// Requested type
        to: String,
    },

    /// Scalars are only decoded from 1, 2, 4 or 8 bytes (4 or 8 for floats)
    #[error("Unsupported number size: {0} bytes")]
    InvalidNumberSize(u64),

    /// A bulk read asked for more elements than the engine allows at once
    #[error("Cannot retrieve {requested} values at once (limit is {limit})")]
    ReadLimitExceeded
    {
        /// Number of values requested
        requested: u64,
        /// The configured maximum
        limit: u64,
    },

    /// Address arithmetic left the 64-bit address space
    #[error("Address overflow: {0}")]
    AddressOverflow(String),

    /// The debuggee's memory could not be read or written
    #[error("Memory access failed at {address} ({len} bytes): {reason}")]
    MemoryAccess
    {
        /// Formatted start address
        address: String,
        /// Number of bytes requested
        len: u64,
        /// Reason reported by the memory collaborator
        reason: String,
    },

    /// A value cannot be stored in the destination without truncation
    #[error("Value {value} does not fit in {size} bytes")]
    ValueOutOfRange
    {
        /// The offending value
        value: String,
        /// Size of the destination in bytes
        size: u64,
    },

    /// A debuggee snapshot could not be loaded
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl NavError
{
    /// Helper for building a [`NavError::LookupFailure`].
    pub fn lookup(message: impl Into<String>) -> Self
    {
        NavError::LookupFailure(message.into())
    }

    /// Helper for building a [`NavError::InvalidOperation`].
    pub fn invalid(message: impl Into<String>) -> Self
    {
        NavError::InvalidOperation(message.into())
    }

    /// Whether this is a failed symbol service lookup.
    pub fn is_lookup_failure(&self) -> bool
    {
        matches!(self, NavError::LookupFailure(_))
    }

    /// Whether this is a usage error.
    pub fn is_invalid_operation(&self) -> bool
    {
        matches!(self, NavError::InvalidOperation(_))
    }
}

impl From<serde_json::Error> for NavError
{
    fn from(error: serde_json::Error) -> Self
    {
        NavError::Snapshot(error.to_string())
    }
}

impl From<hex::FromHexError> for NavError
{
    fn from(error: hex::FromHexError) -> Self
    {
        NavError::Snapshot(format!("invalid hex memory block: {error}"))
    }
}

/// Convenience type alias for `Result<T, NavError>`
///
/// ```rust
/// use dbgnav_core::error::NavResult;
/// fn foo() -> NavResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type NavResult<T> = std::result::Result<T, NavError>;
