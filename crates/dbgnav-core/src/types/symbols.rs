//! Records returned by the symbol service.

use serde::{Deserialize, Serialize};

use crate::types::address::Address;

/// Layout of one field of a struct, class or union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo
{
    /// Field name as declared.
    pub name: String,
    /// Module defining the field's type. Empty means "same as the owner".
    #[serde(default)]
    pub module: String,
    /// Declared type of the field.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Byte offset from the start of the owner.
    pub offset: u64,
    /// Size of the field (of the whole array for array fields).
    pub size: u64,
    /// Width of a bitfield member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitcount: Option<u32>,
    /// Position of a bitfield member inside its storage unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitoffset: Option<u32>,
}

/// A base class and its offset inside the derived class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseTypeInfo
{
    /// Module defining the base type. Empty means "same as the derived type".
    #[serde(default)]
    pub module: String,
    /// Name of the base type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Byte offset of the base sub-object.
    pub offset: u64,
}

/// Result of resolving an address to the nearest symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo
{
    /// Module containing the symbol.
    pub module: String,
    /// Symbol name, e.g. ``Foo::`vftable'``.
    pub name: String,
    /// Distance from the start of the symbol to the queried address.
    pub displacement: u64,
}

/// A global variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSymbol
{
    /// Module containing the global.
    pub module: String,
    /// Declared type of the global.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Address of the global.
    pub address: Address,
}

/// One frame of the current thread's call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame
{
    /// Program counter of the frame.
    pub instruction_address: Address,
    /// Stack pointer of the frame.
    pub stack_address: Address,
    /// Frame pointer of the frame.
    pub frame_address: Address,
}

/// A local variable or parameter in a stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSymbol
{
    /// Variable name.
    pub name: String,
    /// Module defining the variable's type.
    pub module: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Address of the variable's storage.
    pub address: Address,
}
