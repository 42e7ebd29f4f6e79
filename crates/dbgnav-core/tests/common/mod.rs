//! Shared fixture: a small debuggee in module `app`.
//!
//! | Address  | Contents                                              |
//! |----------|-------------------------------------------------------|
//! | 0x1000   | 5-node ring of `Node` (value = 10 * i)                |
//! | 0x1100   | 3-node NULL-terminated list of `Node`                 |
//! | 0x2000   | `Point { x: -5, y: 7 }`                               |
//! | 0x2100   | `Holder { numbers: [1, 2, 3, -4], points: [0x2000, NULL] }` |
//! | 0x2200   | `Flags` word 0x0573                                   |
//! | 0x2300   | `Color` Blue, `Perms` Read\|Exec, `Color` 9 (invalid)  |
//! | 0x2400   | `"hello"` as `char`, then `L"hi"` at 0x2410           |
//! | 0x2500   | `unsigned __int64` max, then `double` 2.5             |
//! | 0x2600   | `Line { start: (1, 2), end: (3, 4) }`                 |
//! | 0x3000   | `Multi` (MSVC vtables)                                |
//! | 0x3100   | `Derived` (Itanium vtable)                            |
//! | 0x3200   | `Base` whose vptr points at no symbol                 |

#![allow(dead_code)]

use std::sync::Arc;

use dbgnav_core::snapshot::{SnapshotSymbols, TypeLayout};
use dbgnav_core::types::{Address, LocalSymbol, StackFrame};
use dbgnav_core::{DbgObject, Navigator, Registry, RegistryBuilder};

pub const RING: u64 = 0x1000;
pub const CHAIN: u64 = 0x1100;
pub const POINT: u64 = 0x2000;
pub const HOLDER: u64 = 0x2100;
pub const FLAGS: u64 = 0x2200;
pub const COLOR: u64 = 0x2300;
pub const PERMS: u64 = 0x2304;
pub const BAD_COLOR: u64 = 0x2308;
pub const TEXT: u64 = 0x2400;
pub const WIDE_TEXT: u64 = 0x2410;
pub const MAX_U64: u64 = 0x2500;
pub const DOUBLE: u64 = 0x2508;
pub const LINE: u64 = 0x2600;
pub const MULTI: u64 = 0x3000;
pub const DERIVED: u64 = 0x3100;
pub const PLAIN_BASE: u64 = 0x3200;

fn node_bytes(value: i32, next: u64) -> Vec<u8>
{
    let mut bytes = value.to_le_bytes().to_vec();
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&next.to_le_bytes());
    bytes
}

fn words(values: &[i32]) -> Vec<u8>
{
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn types(symbols: SnapshotSymbols) -> SnapshotSymbols
{
    symbols
        .with_type(
            "app",
            "Node",
            TypeLayout::new(16).with_field("value", "int", 0, 4).with_field("next", "Node*", 8, 8),
        )
        .with_type(
            "app",
            "Point",
            TypeLayout::new(8).with_field("x", "int", 0, 4).with_field("y", "int", 4, 4),
        )
        .with_type(
            "app",
            "Line",
            TypeLayout::new(16).with_field("start", "Point", 0, 8).with_field("end", "Point", 8, 8),
        )
        .with_type(
            "app",
            "Holder",
            TypeLayout::new(32)
                .with_field("numbers", "int[4]", 0, 16)
                .with_field("points", "Point*[2]", 16, 16),
        )
        .with_type(
            "app",
            "Flags",
            TypeLayout::new(4)
                .with_bitfield("low", "unsigned int", 0, 4, 4, 0)
                .with_bitfield("high", "unsigned int", 0, 4, 3, 4)
                .with_bitfield("enabled", "unsigned int", 0, 4, 1, 7)
                .with_bitfield("mode", "int", 0, 4, 3, 8),
        )
        .with_type(
            "app",
            "Color",
            TypeLayout::new(4).with_enumerators(&[("Red", 0), ("Green", 1), ("Blue", 2)]),
        )
        .with_type(
            "app",
            "Perms",
            TypeLayout::new(4).with_enumerators(&[("Read", 1), ("Write", 2), ("Exec", 4)]),
        )
        .with_type(
            "app",
            "Base",
            TypeLayout::new(16).with_field("vptr", "void*", 0, 8).with_field("id", "int", 8, 4),
        )
        .with_type(
            "app",
            "Mixin",
            TypeLayout::new(16).with_field("vptr", "void*", 0, 8).with_field("m", "int", 8, 4),
        )
        .with_type(
            "app",
            "Multi",
            TypeLayout::new(40)
                .with_base("Base", 0)
                .with_base("Mixin", 16)
                .with_field("z", "int", 32, 4),
        )
        .with_type(
            "app",
            "Derived",
            TypeLayout::new(24).with_base("Base", 0).with_field("extra", "int", 16, 4),
        )
        .with_type("app", "Unrelated", TypeLayout::new(4).with_field("u", "int", 0, 4))
}

fn memory(symbols: SnapshotSymbols) -> SnapshotSymbols
{
    let mut ring = Vec::new();
    for i in 0..5_u64 {
        let value = i32::try_from(i * 10).unwrap();
        ring.extend(node_bytes(value, RING + 0x10 * ((i + 1) % 5)));
    }

    let mut chain = node_bytes(1, CHAIN + 0x10);
    chain.extend(node_bytes(2, CHAIN + 0x20));
    chain.extend(node_bytes(3, 0));

    let mut holder = words(&[1, 2, 3, -4]);
    holder.extend_from_slice(&POINT.to_le_bytes());
    holder.extend_from_slice(&0_u64.to_le_bytes());

    let mut multi = 0x5000_u64.to_le_bytes().to_vec();
    multi.extend(words(&[1, 0]));
    multi.extend_from_slice(&0x5100_u64.to_le_bytes());
    multi.extend(words(&[2, 0, 3, 0]));

    let mut derived = 0x6010_u64.to_le_bytes().to_vec();
    derived.extend(words(&[7, 0, 70, 0]));

    let mut plain = 0x9999_0000_u64.to_le_bytes().to_vec();
    plain.extend(words(&[9, 0]));

    let mut numbers = u64::MAX.to_le_bytes().to_vec();
    numbers.extend_from_slice(&2.5_f64.to_le_bytes());

    symbols
        .with_memory(Address::from(RING), &ring)
        .with_memory(Address::from(CHAIN), &chain)
        .with_memory(Address::from(POINT), &words(&[-5, 7]))
        .with_memory(Address::from(HOLDER), &holder)
        .with_memory(Address::from(FLAGS), &words(&[0x0573]))
        .with_memory(Address::from(COLOR), &words(&[2, 5, 9]))
        .with_memory(Address::from(TEXT), b"hello\0")
        .with_memory(Address::from(WIDE_TEXT), &[b'h', 0, b'i', 0, 0, 0])
        .with_memory(Address::from(MAX_U64), &numbers)
        .with_memory(Address::from(LINE), &words(&[1, 2, 3, 4]))
        .with_memory(Address::from(MULTI), &multi)
        .with_memory(Address::from(DERIVED), &derived)
        .with_memory(Address::from(PLAIN_BASE), &plain)
}

fn frame(instruction: u64, stack: u64) -> StackFrame
{
    StackFrame {
        instruction_address: Address::from(instruction),
        stack_address: Address::from(stack),
        frame_address: Address::from(stack + 0x40),
    }
}

fn local(name: &str, type_name: &str, address: u64) -> LocalSymbol
{
    LocalSymbol {
        name: name.to_string(),
        module: "app".to_string(),
        type_name: type_name.to_string(),
        address: Address::from(address),
    }
}

/// The fixture debuggee.
pub fn snapshot() -> SnapshotSymbols
{
    let symbols = memory(types(SnapshotSymbols::new()))
        .with_global("app", "g_ring", "Node", Address::from(RING))
        .with_global("app", "g_chain", "Node", Address::from(CHAIN))
        .with_global("app", "g_point", "Point", Address::from(POINT))
        .with_global("app", "g_holder", "Holder", Address::from(HOLDER))
        .with_global("app", "g_flags", "Flags", Address::from(FLAGS))
        .with_global("app", "g_color", "Color", Address::from(COLOR))
        .with_global("app", "g_perms", "Perms", Address::from(PERMS))
        .with_global("app", "g_bad_color", "Color", Address::from(BAD_COLOR))
        .with_global("app", "g_text", "char", Address::from(TEXT))
        .with_global("app", "g_wide", "wchar_t", Address::from(WIDE_TEXT))
        .with_global("app", "g_max", "unsigned __int64", Address::from(MAX_U64))
        .with_global("app", "g_double", "double", Address::from(DOUBLE))
        .with_global("app", "g_line", "Line", Address::from(LINE))
        .with_global("app", "g_multi_base", "Base", Address::from(MULTI))
        .with_global("app", "g_multi_mixin", "Mixin", Address::from(MULTI + 0x10))
        .with_global("app", "g_derived", "Base", Address::from(DERIVED))
        .with_global("app", "g_plain", "Base", Address::from(PLAIN_BASE))
        .with_global_constant("app", "MAX_NODES", 5)
        .with_global_constant("app", "RING_SIZE", 5)
        .with_symbol("app", "Multi::`vftable'", Address::from(0x5000))
        .with_symbol("app", "Multi::`vftable'{for `Mixin'}", Address::from(0x5100))
        .with_symbol("app", "vtable for Derived", Address::from(0x6000))
        .with_symbol("app", "main", Address::from(0x7000))
        .with_symbol("app", "helper", Address::from(0x7100));

    symbols
        .with_frame(frame(0x7010, 0x8000), vec![local("count", "int", HOLDER)])
        .with_frame(frame(0x7110, 0x8100), vec![local("count", "int", HOLDER + 4)])
        .with_frame(frame(0x7020, 0x8200), vec![local("count", "int", HOLDER + 8), local("other", "int", HOLDER + 12)])
}

/// A navigator over a fresh fixture, and the fixture itself for round trip counts.
pub fn fixture_with(registry: Registry) -> (Navigator, Arc<SnapshotSymbols>)
{
    let symbols = Arc::new(snapshot());
    (Navigator::new(symbols.clone(), registry), symbols)
}

pub fn fixture() -> (Navigator, Arc<SnapshotSymbols>)
{
    fixture_with(RegistryBuilder::new().build())
}

pub fn navigator() -> Navigator
{
    fixture().0
}

/// `app!ty` at `address`.
pub fn object(nav: &Navigator, ty: &str, address: u64) -> DbgObject
{
    nav.create(&nav.type_descriptor(&format!("app!{ty}")), Address::from(address))
}
