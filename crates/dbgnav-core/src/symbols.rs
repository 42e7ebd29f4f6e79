//! # Symbol Service
//!
//! The interface between the navigation engine and whatever can answer
//! questions about the debuggee: a live debugger, a dump file, or an
//! in-memory [`SnapshotSymbols`](crate::snapshot::SnapshotSymbols).
//!
//! Every method is a round trip and returns a boxed future, so the trait
//! stays object safe and can be shared as `Arc<dyn SymbolService>`.
//!
//! ## Memory
//!
//! Memory is exchanged as raw little-endian bytes. Decoding into numbers is
//! done by the engine itself (see [`NumberKind`](crate::numeric::NumberKind)),
//! so a service only has to move bytes.
//!
//! ## Cache invalidation
//!
//! A service that caches reads must drop its caches whenever the debuggee
//! resumes, so that later reads observe fresh state. The engine never
//! caches memory itself; it only caches type sizes on individual handles.

use futures::future::BoxFuture;

use crate::error::NavResult;
use crate::types::{Address, BaseTypeInfo, BigValue, FieldInfo, GlobalSymbol, LocalSymbol, StackFrame, SymbolInfo};

/// Type, symbol and memory lookups against one debuggee
///
/// Every failure is reported as a [`NavError`](crate::NavError), typically
/// `LookupFailure` for unknown names and `MemoryAccess` for unreadable memory.
pub trait SymbolService: Send + Sync
{
    /// Size in bytes of `type_name` (of the whole array for array types).
    fn lookup_type_size<'a>(&'a self, module: &'a str, type_name: &'a str) -> BoxFuture<'a, NavResult<u64>>;

    /// Layout of one field of `type_name`, searching base types too.
    fn lookup_field_offset<'a>(
        &'a self,
        module: &'a str,
        type_name: &'a str,
        field: &'a str,
    ) -> BoxFuture<'a, NavResult<FieldInfo>>;

    /// All fields of `type_name`, optionally including inherited ones.
    ///
    /// Inherited fields carry offsets relative to the derived type.
    fn lookup_fields<'a>(
        &'a self,
        module: &'a str,
        type_name: &'a str,
        include_base_types: bool,
    ) -> BoxFuture<'a, NavResult<Vec<FieldInfo>>>;

    /// Every base type of `type_name`, transitively, with offsets relative to
    /// `type_name`. Derived bases are listed before their own bases.
    fn lookup_base_types<'a>(&'a self, module: &'a str, type_name: &'a str) -> BoxFuture<'a, NavResult<Vec<BaseTypeInfo>>>;

    /// Whether `type_name` is an enumeration.
    fn is_type_enum<'a>(&'a self, module: &'a str, type_name: &'a str) -> BoxFuture<'a, NavResult<bool>>;

    /// Names of the constants with the given value.
    ///
    /// With `type_name == None` the search covers the module's global constants.
    fn lookup_constant_name<'a>(
        &'a self,
        module: &'a str,
        type_name: Option<&'a str>,
        value: BigValue,
    ) -> BoxFuture<'a, NavResult<Vec<String>>>;

    /// Value of a named constant.
    ///
    /// With `type_name == None` the search covers the module's global constants.
    fn lookup_constant_value<'a>(
        &'a self,
        module: &'a str,
        type_name: Option<&'a str>,
        name: &'a str,
    ) -> BoxFuture<'a, NavResult<BigValue>>;

    /// Nearest symbol at or below `address`.
    fn lookup_symbol_name(&self, address: Address) -> BoxFuture<'_, NavResult<SymbolInfo>>;

    /// A global variable, optionally disambiguated by its type.
    fn lookup_global_symbol<'a>(
        &'a self,
        module: &'a str,
        symbol: &'a str,
        type_name: Option<&'a str>,
    ) -> BoxFuture<'a, NavResult<GlobalSymbol>>;

    /// Up to `max_frames` frames of the current thread's stack, innermost first.
    fn get_call_stack(&self, max_frames: usize) -> BoxFuture<'_, NavResult<Vec<StackFrame>>>;

    /// Locals and parameters visible in one stack frame.
    fn lookup_locals_in_stack_frame(&self, frame: StackFrame) -> BoxFuture<'_, NavResult<Vec<LocalSymbol>>>;

    /// Read `len` bytes starting at `address`.
    fn read_memory(&self, address: Address, len: u64) -> BoxFuture<'_, NavResult<Vec<u8>>>;

    /// Write `bytes` starting at `address`.
    fn write_memory<'a>(&'a self, address: Address, bytes: &'a [u8]) -> BoxFuture<'a, NavResult<()>>;
}
