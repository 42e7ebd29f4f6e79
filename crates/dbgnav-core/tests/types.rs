//! Tests for platform-agnostic types

use dbgnav_core::types::{Address, BigValue, FieldInfo, Scalar, StackFrame, TypeDescriptor};

#[test]
fn test_address_from_u64()
{
    let addr = Address::from(0x1000);
    assert_eq!(addr.value(), 0x1000);
    assert_eq!(u64::from(addr), 0x1000);
}

#[test]
fn test_address_parse_and_display()
{
    let addr: Address = "0x7fff0000".parse().unwrap();
    assert_eq!(addr.to_string(), "0x7fff0000");
    assert_eq!(Address::ZERO.to_string(), "NULL");
    assert!("0xnope".parse::<Address>().is_err());
}

#[test]
fn test_address_from_big_value()
{
    assert_eq!(Address::try_from(BigValue::from(u64::MAX)).unwrap().value(), u64::MAX);
    assert!(Address::try_from(BigValue::from(-1_i64)).is_err());
}

#[test]
fn test_address_serde_accepts_numbers_and_hex()
{
    let from_number: Address = serde_json::from_str("4096").unwrap();
    let from_text: Address = serde_json::from_str("\"0x1000\"").unwrap();
    assert_eq!(from_number, from_text);
    assert_eq!(serde_json::to_string(&from_text).unwrap(), "4096");
}

#[test]
fn test_stack_frame_serde()
{
    let frame: StackFrame = serde_json::from_str(
        r#"{ "instruction_address": "0x7010", "stack_address": 32768, "frame_address": "0x8040" }"#,
    )
    .unwrap();
    assert_eq!(frame.instruction_address, Address::from(0x7010));
    assert_eq!(frame.frame_address, Address::from(0x8040));
}

#[test]
fn test_field_info_serde()
{
    let field: FieldInfo =
        serde_json::from_str(r#"{ "name": "flag", "type": "unsigned int", "offset": 4, "size": 4, "bitcount": 1, "bitoffset": 3 }"#)
            .unwrap();
    assert_eq!(field.type_name, "unsigned int");
    assert!(field.module.is_empty());
    assert_eq!((field.bitcount, field.bitoffset), (Some(1), Some(3)));
}

#[test]
fn test_descriptor_normalisation()
{
    let ty = TypeDescriptor::parse("app!const Node * const", "");
    assert_eq!(ty.module(), "app");
    assert_eq!(ty.name(), "Node*");
    assert!(ty.is_pointer());
    assert_eq!(ty.dereferenced().qualified_name(), "app!Node");
}

#[test]
fn test_descriptor_arrays()
{
    let ty = TypeDescriptor::new("app", "int[2][3]");
    assert_eq!(ty.array_length(), 6);
    assert_eq!(ty.full_name(), "int[6]");
    assert!(!ty.non_array_type().is_array());
}

#[test]
fn test_descriptor_template_parameters()
{
    let ty = TypeDescriptor::new("app", "Map<int, Pair<A, B>>");
    assert_eq!(ty.template_parameters(), vec!["int", "Pair<A, B>"]);
    assert!(TypeDescriptor::new("app", "Node").template_parameters().is_empty());
}

#[test]
fn test_scalar_conversions()
{
    assert_eq!(Scalar::from(-3).to_f64(), -3.0);
    assert_eq!(Scalar::from(2.5).as_integer(), None);
    assert_eq!(Scalar::from(u64::MAX).to_string(), "18446744073709551615");
}
