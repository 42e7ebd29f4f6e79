//! # Snapshot Symbol Service
//!
//! An in-memory debuggee: type layouts, globals, symbols, call frames and
//! sparse memory, loaded from JSON or assembled in code.
//!
//! Snapshots back the command line tool and the test suite. They answer
//! every [`SymbolService`] request from their own tables and count the
//! requests, so callers can check how many round trips an operation took.
//!
//! ## Format
//!
//! ```json
//! {
//!   "pointer_size": 8,
//!   "types": {
//!     "app!Node": {
//!       "size": 16,
//!       "fields": [
//!         { "name": "value", "type": "int", "offset": 0, "size": 4 },
//!         { "name": "next", "type": "Node*", "offset": 8, "size": 8 }
//!       ]
//!     }
//!   },
//!   "globals": [{ "module": "app", "name": "g_head", "type": "Node", "address": "0x1000" }],
//!   "memory": { "0x1000": "2a00000000000000" }
//! }
//! ```
//!
//! Memory blocks are hex strings keyed by their start address. Built-in
//! scalar types and pointers need no entry in `types`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{NavError, NavResult};
use crate::symbols::SymbolService;
use crate::types::{Address, BaseTypeInfo, BigValue, FieldInfo, GlobalSymbol, LocalSymbol, StackFrame, SymbolInfo};

const DEFAULT_POINTER_SIZE: u64 = 8;

/// Sizes of the built-in scalar types.
fn builtin_size(name: &str) -> Option<u64>
{
    let bare = name
        .strip_prefix("unsigned ")
        .or_else(|| name.strip_prefix("signed "))
        .unwrap_or(name);
    match bare {
        "bool" | "char" | "__int8" => Some(1),
        "short" | "wchar_t" | "__wchar_t" | "__int16" => Some(2),
        "int" | "long" | "__int32" | "float" => Some(4),
        "double" | "long double" | "long long" | "__int64" => Some(8),
        _ => None,
    }
}

/// A named constant of an enum or a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantEntry
{
    /// Constant name.
    pub name: String,
    /// Constant value.
    pub value: i128,
}

/// Layout of one user-defined type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeLayout
{
    /// Size in bytes.
    pub size: u64,
    /// Declared fields, in any order.
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    /// Direct base types.
    #[serde(default)]
    pub bases: Vec<BaseTypeInfo>,
    /// Whether the type is an enumeration.
    #[serde(default, rename = "enum")]
    pub is_enum: bool,
    /// Enumerators, in declaration order.
    #[serde(default)]
    pub constants: Vec<ConstantEntry>,
}

impl TypeLayout
{
    /// An empty type of `size` bytes.
    pub fn new(size: u64) -> Self
    {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Add a field. `type_name` may be `module!type`.
    #[must_use]
    pub fn with_field(mut self, name: &str, type_name: &str, offset: u64, size: u64) -> Self
    {
        let (module, type_name) = split_qualified(type_name);
        self.fields.push(FieldInfo {
            name: name.to_string(),
            module,
            type_name,
            offset,
            size,
            bitcount: None,
            bitoffset: None,
        });
        self
    }

    /// Add a bitfield member stored in a `size`-byte unit at `offset`.
    #[must_use]
    pub fn with_bitfield(mut self, name: &str, type_name: &str, offset: u64, size: u64, bitcount: u32, bitoffset: u32) -> Self
    {
        let (module, type_name) = split_qualified(type_name);
        self.fields.push(FieldInfo {
            name: name.to_string(),
            module,
            type_name,
            offset,
            size,
            bitcount: Some(bitcount),
            bitoffset: Some(bitoffset),
        });
        self
    }

    /// Add a direct base type at `offset`.
    #[must_use]
    pub fn with_base(mut self, type_name: &str, offset: u64) -> Self
    {
        let (module, type_name) = split_qualified(type_name);
        self.bases.push(BaseTypeInfo {
            module,
            type_name,
            offset,
        });
        self
    }

    /// Mark the type as an enum with the given enumerators.
    #[must_use]
    pub fn with_enumerators(mut self, constants: &[(&str, i128)]) -> Self
    {
        self.is_enum = true;
        self.constants.extend(constants.iter().map(|(name, value)| ConstantEntry {
            name: (*name).to_string(),
            value: *value,
        }));
        self
    }
}

/// A global variable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEntry
{
    /// Module containing the global.
    pub module: String,
    /// Variable name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Address of the variable.
    pub address: Address,
}

/// A code or data symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry
{
    /// Module containing the symbol.
    pub module: String,
    /// Symbol name.
    pub name: String,
    /// Start address.
    pub address: Address,
    /// Extent in bytes. Without one the symbol covers everything up to the next.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A stack frame and the locals visible in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEntry
{
    /// Frame registers.
    #[serde(flatten)]
    pub frame: StackFrame,
    /// Locals and parameters.
    #[serde(default)]
    pub locals: Vec<LocalSymbol>,
}

/// Serialized form of a snapshot.
#[derive(Debug, Default, Deserialize)]
struct SnapshotFile
{
    #[serde(default)]
    pointer_size: Option<u64>,
    #[serde(default)]
    types: HashMap<String, TypeLayout>,
    #[serde(default)]
    globals: Vec<GlobalEntry>,
    #[serde(default)]
    constants: HashMap<String, Vec<ConstantEntry>>,
    #[serde(default)]
    symbols: Vec<SymbolEntry>,
    #[serde(default)]
    frames: Vec<FrameEntry>,
    #[serde(default)]
    memory: BTreeMap<String, String>,
}

/// In-memory [`SymbolService`]
///
/// ## Example
///
/// ```rust
/// use dbgnav_core::snapshot::{SnapshotSymbols, TypeLayout};
/// use dbgnav_core::types::Address;
///
/// let symbols = SnapshotSymbols::new()
///     .with_type("app", "Point", TypeLayout::new(8).with_field("x", "int", 0, 4).with_field("y", "int", 4, 4))
///     .with_global("app", "g_origin", "Point", Address::from(0x1000))
///     .with_memory(Address::from(0x1000), &[1, 0, 0, 0, 2, 0, 0, 0]);
/// assert_eq!(symbols.round_trips(), 0);
/// ```
#[derive(Debug, Default)]
pub struct SnapshotSymbols
{
    pointer_size: Option<u64>,
    types: HashMap<String, TypeLayout>,
    globals: Vec<GlobalEntry>,
    constants: HashMap<String, Vec<ConstantEntry>>,
    symbols: Vec<SymbolEntry>,
    frames: Vec<FrameEntry>,
    memory: Mutex<BTreeMap<u64, Vec<u8>>>,
    round_trips: AtomicUsize,
}

impl SnapshotSymbols
{
    /// An empty snapshot with 8-byte pointers.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Load a snapshot from its JSON form.
    ///
    /// ## Errors
    ///
    /// `Snapshot` if the JSON is malformed or a memory block is not valid hex.
    pub fn from_json(json: &str) -> NavResult<Self>
    {
        let file: SnapshotFile = serde_json::from_str(json)?;
        let mut memory = BTreeMap::new();
        for (address, block) in file.memory {
            let address: Address = address
                .parse()
                .map_err(|error| NavError::Snapshot(format!("bad memory block address: {error}")))?;
            memory.insert(address.value(), hex::decode(block.trim())?);
        }

        let mut symbols = file.symbols;
        symbols.sort_by_key(|symbol| symbol.address);
        debug!(
            "Loaded snapshot with {} types, {} globals and {} memory blocks",
            file.types.len(),
            file.globals.len(),
            memory.len()
        );

        Ok(Self {
            pointer_size: file.pointer_size,
            types: file.types,
            globals: file.globals,
            constants: file.constants,
            symbols,
            frames: file.frames,
            memory: Mutex::new(memory),
            round_trips: AtomicUsize::new(0),
        })
    }

    /// Use `size`-byte pointers.
    #[must_use]
    pub fn with_pointer_size(mut self, size: u64) -> Self
    {
        self.pointer_size = Some(size);
        self
    }

    /// Add or replace the layout of `module!name`.
    #[must_use]
    pub fn with_type(mut self, module: &str, name: &str, layout: TypeLayout) -> Self
    {
        self.types.insert(format!("{module}!{name}"), layout);
        self
    }

    /// Add a global variable.
    #[must_use]
    pub fn with_global(mut self, module: &str, name: &str, type_name: &str, address: Address) -> Self
    {
        self.globals.push(GlobalEntry {
            module: module.to_string(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            address,
        });
        self
    }

    /// Add a module-level constant.
    #[must_use]
    pub fn with_global_constant(mut self, module: &str, name: &str, value: i128) -> Self
    {
        self.constants.entry(module.to_string()).or_default().push(ConstantEntry {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Add a symbol without an explicit extent.
    #[must_use]
    pub fn with_symbol(mut self, module: &str, name: &str, address: Address) -> Self
    {
        self.symbols.push(SymbolEntry {
            module: module.to_string(),
            name: name.to_string(),
            address,
            size: None,
        });
        self.symbols.sort_by_key(|symbol| symbol.address);
        self
    }

    /// Push a frame below the ones already added.
    #[must_use]
    pub fn with_frame(mut self, frame: StackFrame, locals: Vec<LocalSymbol>) -> Self
    {
        self.frames.push(FrameEntry { frame, locals });
        self
    }

    /// Map a block of memory.
    ///
    /// The map is owned here, so a poisoned lock still holds usable data.
    #[must_use]
    pub fn with_memory(mut self, address: Address, bytes: &[u8]) -> Self
    {
        self.memory
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.value(), bytes.to_vec());
        self
    }

    /// Number of requests answered so far.
    pub fn round_trips(&self) -> usize
    {
        self.round_trips.load(Ordering::Relaxed)
    }

    fn count(&self, request: &str)
    {
        trace!("Snapshot request: {}", request);
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    fn layout(&self, module: &str, type_name: &str) -> NavResult<&TypeLayout>
    {
        self.types
            .get(&format!("{module}!{type_name}"))
            .ok_or_else(|| NavError::lookup(format!("unknown type {module}!{type_name}")))
    }

    fn type_size(&self, module: &str, type_name: &str) -> NavResult<u64>
    {
        if type_name.ends_with('*') {
            return Ok(self.pointer_size.unwrap_or(DEFAULT_POINTER_SIZE));
        }
        if let Some(size) = builtin_size(type_name) {
            return Ok(size);
        }
        self.layout(module, type_name).map(|layout| layout.size)
    }

    /// Every base of `module!type_name`, depth first, offsets relative to it.
    fn all_bases(&self, module: &str, type_name: &str) -> NavResult<Vec<BaseTypeInfo>>
    {
        let mut bases = Vec::new();
        for base in &self.layout(module, type_name)?.bases {
            let base_module = if base.module.is_empty() { module } else { &base.module };
            bases.push(BaseTypeInfo {
                module: base_module.to_string(),
                type_name: base.type_name.clone(),
                offset: base.offset,
            });
            for inherited in self.all_bases(base_module, &base.type_name)? {
                bases.push(BaseTypeInfo {
                    offset: inherited.offset + base.offset,
                    ..inherited
                });
            }
        }
        Ok(bases)
    }

    fn own_fields(&self, module: &str, type_name: &str, offset: u64) -> NavResult<Vec<FieldInfo>>
    {
        Ok(self
            .layout(module, type_name)?
            .fields
            .iter()
            .map(|field| FieldInfo {
                module: if field.module.is_empty() { module.to_string() } else { field.module.clone() },
                offset: field.offset + offset,
                ..field.clone()
            })
            .collect())
    }

    fn fields(&self, module: &str, type_name: &str, include_base_types: bool) -> NavResult<Vec<FieldInfo>>
    {
        let mut fields = self.own_fields(module, type_name, 0)?;
        if include_base_types {
            for base in self.all_bases(module, type_name)? {
                fields.extend(self.own_fields(&base.module, &base.type_name, base.offset)?);
            }
        }
        Ok(fields)
    }

    fn constants_of(&self, module: &str, type_name: Option<&str>) -> NavResult<&[ConstantEntry]>
    {
        match type_name {
            Some(type_name) => Ok(&self.layout(module, type_name)?.constants),
            None => Ok(self.constants.get(module).map_or(&[], Vec::as_slice)),
        }
    }

    fn symbol_at(&self, address: Address) -> NavResult<SymbolInfo>
    {
        let index = self.symbols.partition_point(|symbol| symbol.address <= address);
        let symbol = index
            .checked_sub(1)
            .and_then(|index| self.symbols.get(index))
            .ok_or_else(|| NavError::lookup(format!("no symbol at {address}")))?;

        let displacement = address.value() - symbol.address.value();
        if symbol.size.is_some_and(|size| displacement >= size) {
            return Err(NavError::lookup(format!("no symbol at {address}")));
        }
        Ok(SymbolInfo {
            module: symbol.module.clone(),
            name: symbol.name.clone(),
            displacement,
        })
    }

    fn read(&self, address: Address, len: u64) -> NavResult<Vec<u8>>
    {
        let memory = self.lock_memory(address, len)?;
        let capacity = usize::try_from(len).map_err(|_| memory_error(address, len, "length too large"))?;
        let mut bytes = Vec::with_capacity(capacity);
        for (start, block, range) in mapped_ranges(&memory, address, len)? {
            let from = usize::try_from(range.0 - start).map_err(|_| memory_error(address, len, "offset too large"))?;
            let to = usize::try_from(range.1 - start).map_err(|_| memory_error(address, len, "offset too large"))?;
            bytes.extend_from_slice(&block[from..to]);
        }
        Ok(bytes)
    }

    fn write(&self, address: Address, data: &[u8]) -> NavResult<()>
    {
        let len = data.len() as u64;
        let mut memory = self.lock_memory(address, len)?;
        let spans: Vec<(u64, (u64, u64))> = mapped_ranges(&memory, address, len)?
            .into_iter()
            .map(|(start, _, range)| (start, range))
            .collect();

        let mut written = 0;
        for (start, (from, to)) in spans {
            let Some(block) = memory.get_mut(&start) else {
                return Err(memory_error(address, len, "unmapped"));
            };
            let count = usize::try_from(to - from).map_err(|_| memory_error(address, len, "length too large"))?;
            let offset = usize::try_from(from - start).map_err(|_| memory_error(address, len, "offset too large"))?;
            block[offset..offset + count].copy_from_slice(&data[written..written + count]);
            written += count;
        }
        Ok(())
    }

    fn lock_memory(&self, address: Address, len: u64) -> NavResult<std::sync::MutexGuard<'_, BTreeMap<u64, Vec<u8>>>>
    {
        self.memory
            .lock()
            .map_err(|_| memory_error(address, len, "snapshot memory poisoned"))
    }
}

fn memory_error(address: Address, len: u64, reason: &str) -> NavError
{
    NavError::MemoryAccess {
        address: address.to_string(),
        len,
        reason: reason.to_string(),
    }
}

/// The blocks covering `[address, address + len)`, with the covered range of
/// each. Fails unless every byte is mapped.
fn mapped_ranges(memory: &BTreeMap<u64, Vec<u8>>, address: Address, len: u64) -> NavResult<Vec<(u64, &[u8], (u64, u64))>>
{
    let end = address
        .value()
        .checked_add(len)
        .ok_or_else(|| memory_error(address, len, "range wraps the address space"))?;

    let mut ranges = Vec::new();
    let mut cursor = address.value();
    while cursor < end {
        let (start, block) = memory
            .range(..=cursor)
            .next_back()
            .filter(|(start, block)| cursor < **start + block.len() as u64)
            .ok_or_else(|| memory_error(address, len, &format!("{} is not mapped", Address::from(cursor))))?;
        let stop = end.min(start + block.len() as u64);
        ranges.push((*start, block.as_slice(), (cursor, stop)));
        cursor = stop;
    }
    Ok(ranges)
}

fn split_qualified(type_name: &str) -> (String, String)
{
    match type_name.split_once('!') {
        Some((module, name)) => (module.to_string(), name.to_string()),
        None => (String::new(), type_name.to_string()),
    }
}

impl SymbolService for SnapshotSymbols
{
    fn lookup_type_size<'a>(&'a self, module: &'a str, type_name: &'a str) -> BoxFuture<'a, NavResult<u64>>
    {
        async move {
            self.count("type size");
            self.type_size(module, type_name)
        }
        .boxed()
    }

    fn lookup_field_offset<'a>(
        &'a self,
        module: &'a str,
        type_name: &'a str,
        field: &'a str,
    ) -> BoxFuture<'a, NavResult<FieldInfo>>
    {
        async move {
            self.count("field offset");
            self.fields(module, type_name, true)?
                .into_iter()
                .find(|info| info.name == field)
                .ok_or_else(|| NavError::lookup(format!("no field {field} in {module}!{type_name}")))
        }
        .boxed()
    }

    fn lookup_fields<'a>(
        &'a self,
        module: &'a str,
        type_name: &'a str,
        include_base_types: bool,
    ) -> BoxFuture<'a, NavResult<Vec<FieldInfo>>>
    {
        async move {
            self.count("fields");
            self.fields(module, type_name, include_base_types)
        }
        .boxed()
    }

    fn lookup_base_types<'a>(&'a self, module: &'a str, type_name: &'a str) -> BoxFuture<'a, NavResult<Vec<BaseTypeInfo>>>
    {
        async move {
            self.count("base types");
            self.all_bases(module, type_name)
        }
        .boxed()
    }

    fn is_type_enum<'a>(&'a self, module: &'a str, type_name: &'a str) -> BoxFuture<'a, NavResult<bool>>
    {
        async move {
            self.count("is enum");
            if type_name.ends_with('*') || builtin_size(type_name).is_some() {
                return Ok(false);
            }
            self.layout(module, type_name).map(|layout| layout.is_enum)
        }
        .boxed()
    }

    fn lookup_constant_name<'a>(
        &'a self,
        module: &'a str,
        type_name: Option<&'a str>,
        value: BigValue,
    ) -> BoxFuture<'a, NavResult<Vec<String>>>
    {
        async move {
            self.count("constant name");
            Ok(self
                .constants_of(module, type_name)?
                .iter()
                .filter(|constant| BigValue::new(constant.value) == value)
                .map(|constant| constant.name.clone())
                .collect())
        }
        .boxed()
    }

    fn lookup_constant_value<'a>(
        &'a self,
        module: &'a str,
        type_name: Option<&'a str>,
        name: &'a str,
    ) -> BoxFuture<'a, NavResult<BigValue>>
    {
        async move {
            self.count("constant value");
            self.constants_of(module, type_name)?
                .iter()
                .find(|constant| constant.name == name)
                .map(|constant| BigValue::new(constant.value))
                .ok_or_else(|| NavError::lookup(format!("no constant {name} in {module}")))
        }
        .boxed()
    }

    fn lookup_symbol_name(&self, address: Address) -> BoxFuture<'_, NavResult<SymbolInfo>>
    {
        async move {
            self.count("symbol name");
            self.symbol_at(address)
        }
        .boxed()
    }

    fn lookup_global_symbol<'a>(
        &'a self,
        module: &'a str,
        symbol: &'a str,
        type_name: Option<&'a str>,
    ) -> BoxFuture<'a, NavResult<GlobalSymbol>>
    {
        async move {
            self.count("global symbol");
            self.globals
                .iter()
                .find(|global| {
                    global.module == module && global.name == symbol && type_name.is_none_or(|ty| global.type_name == ty)
                })
                .map(|global| GlobalSymbol {
                    module: global.module.clone(),
                    type_name: global.type_name.clone(),
                    address: global.address,
                })
                .ok_or_else(|| NavError::lookup(format!("unknown global {module}!{symbol}")))
        }
        .boxed()
    }

    fn get_call_stack(&self, max_frames: usize) -> BoxFuture<'_, NavResult<Vec<StackFrame>>>
    {
        async move {
            self.count("call stack");
            Ok(self.frames.iter().take(max_frames).map(|entry| entry.frame).collect())
        }
        .boxed()
    }

    fn lookup_locals_in_stack_frame(&self, frame: StackFrame) -> BoxFuture<'_, NavResult<Vec<LocalSymbol>>>
    {
        async move {
            self.count("locals");
            self.frames
                .iter()
                .find(|entry| entry.frame == frame)
                .map(|entry| entry.locals.clone())
                .ok_or_else(|| NavError::lookup(format!("unknown frame at {}", frame.instruction_address)))
        }
        .boxed()
    }

    fn read_memory(&self, address: Address, len: u64) -> BoxFuture<'_, NavResult<Vec<u8>>>
    {
        async move {
            self.count("read memory");
            self.read(address, len)
        }
        .boxed()
    }

    fn write_memory<'a>(&'a self, address: Address, bytes: &'a [u8]) -> BoxFuture<'a, NavResult<()>>
    {
        async move {
            self.count("write memory");
            self.write(address, bytes)
        }
        .boxed()
    }
}
