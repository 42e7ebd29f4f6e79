//! Tests for descriptions and extended fields

mod common;

use common::{fixture_with, navigator, object, BAD_COLOR, COLOR, FLAGS, HOLDER, MULTI, POINT, RING, WIDE_TEXT};
use dbgnav_core::extensions::TypeMatcher;
use dbgnav_core::types::{Address, TypeDescriptor};
use dbgnav_core::{NavError, RegistryBuilder};
use futures::FutureExt;

fn exact(ty: &str) -> TypeMatcher
{
    TypeMatcher::exact(TypeDescriptor::parse(ty, ""))
}

#[tokio::test]
async fn test_default_descriptions()
{
    let nav = navigator();

    assert_eq!(object(&nav, "Point", POINT).desc().await.unwrap(), "0x2000");
    assert_eq!(object(&nav, "Point", POINT).f("x").await.unwrap().desc().await.unwrap(), "-5");
    assert_eq!(object(&nav, "Color", COLOR).desc().await.unwrap(), "Blue");
    assert_eq!(nav.null().desc().await.unwrap(), "nullptr");
}

#[tokio::test]
async fn test_default_description_falls_back_to_address()
{
    let nav = navigator();
    assert_eq!(object(&nav, "Color", BAD_COLOR).desc().await.unwrap(), "0x2308");
}

#[tokio::test]
async fn test_describe_pointers_bits_and_arrays()
{
    let nav = navigator();

    let next = object(&nav, "Node", RING).field("next").await.unwrap();
    assert_eq!(next.desc().await.unwrap(), "0x1010");

    let flags = object(&nav, "Flags", FLAGS);
    assert_eq!(flags.f("enabled").await.unwrap().desc().await.unwrap(), "false");
    assert_eq!(flags.f("high").await.unwrap().desc().await.unwrap(), "7");

    let numbers = object(&nav, "Holder", HOLDER).f("numbers").await.unwrap();
    assert_eq!(numbers.desc().await.unwrap(), "[1, 2, 3, -4]");
}

#[tokio::test]
async fn test_describe_wide_char()
{
    let nav = navigator();
    assert_eq!(object(&nav, "wchar_t", WIDE_TEXT).desc().await.unwrap(), "h");
}

#[tokio::test]
async fn test_primary_description()
{
    let registry = RegistryBuilder::new()
        .with_sync_description(exact("app!Point"), "coordinates", |point| format!("point at {}", point.ptr()))
        .build();
    let (nav, _) = fixture_with(registry);

    assert_eq!(object(&nav, "Point", POINT).desc().await.unwrap(), "point at 0x2000");
}

#[tokio::test]
async fn test_non_primary_description_is_ignored()
{
    let registry = RegistryBuilder::new()
        .with_type_description(exact("app!Point"), "secondary", false, |_| async { Ok("unused".to_string()) }.boxed())
        .build();
    let (nav, _) = fixture_with(registry);

    assert_eq!(object(&nav, "Point", POINT).desc().await.unwrap(), "0x2000");
}

#[tokio::test]
async fn test_description_inherited_from_base()
{
    let registry = RegistryBuilder::new()
        .with_type_description(exact("app!Base"), "id", true, |object| {
            async move {
                let id = object.f("id").await?.val().await?.unwrap_or_default();
                Ok::<_, NavError>(format!("#{id}"))
            }
            .boxed()
        })
        .build();
    let (nav, _) = fixture_with(registry);

    assert_eq!(object(&nav, "Multi", MULTI).desc().await.unwrap(), "#1");
}

#[tokio::test]
async fn test_failing_description()
{
    let registry = RegistryBuilder::new()
        .with_type_description(exact("app!Point"), "broken", true, |_| {
            async { Err(NavError::lookup("no such thing")) }.boxed()
        })
        .build();
    let (nav, _) = fixture_with(registry);

    assert_eq!(object(&nav, "Point", POINT).desc().await.unwrap(), "Point???");
}

#[tokio::test]
async fn test_extended_fields()
{
    let registry = RegistryBuilder::new()
        .with_extended_field(exact("app!Holder"), "first_point", "Point", |holder| {
            async move { holder.field("points[0]").await?.deref().await }.boxed()
        })
        .unwrap()
        .with_extended_field(exact("app!Point"), "itself", "Point", |point| async move { Ok(point) }.boxed())
        .unwrap()
        .build();
    let (nav, _) = fixture_with(registry);
    let holder = object(&nav, "Holder", HOLDER);

    let point = holder.extended_field("first_point").await.unwrap();
    assert_eq!(point.pointer_value(), Address::from(POINT));

    let chained = holder.extended_field("first_point.itself").await.unwrap();
    assert!(chained.equals(&point));

    let error = holder.extended_field("missing").await.unwrap_err();
    assert!(error.is_lookup_failure());
}

#[tokio::test]
async fn test_extended_field_on_base_type()
{
    let registry = RegistryBuilder::new()
        .with_extended_field(exact("app!Base"), "self_ref", "Base", |base| async move { Ok(base) }.boxed())
        .unwrap()
        .build();
    let (nav, _) = fixture_with(registry);

    let base = object(&nav, "Multi", MULTI).extended_field("self_ref").await.unwrap();
    assert_eq!(base.type_descriptor().name(), "Base");
    assert_eq!(base.pointer_value(), Address::from(MULTI));
}

#[tokio::test]
async fn test_extended_field_type_mismatch()
{
    let registry = RegistryBuilder::new()
        .with_extended_field(exact("app!Point"), "wrong", "Node", |point| async move { Ok(point) }.boxed())
        .unwrap()
        .build();
    let (nav, _) = fixture_with(registry);

    let error = object(&nav, "Point", POINT).extended_field("wrong").await.unwrap_err();
    assert_eq!(
        error,
        NavError::CastMismatch {
            from: "Point".to_string(),
            to: "Node".to_string(),
        }
    );
}

#[test]
fn test_extended_field_names_cannot_contain_dots()
{
    let error = RegistryBuilder::new()
        .with_extended_field(exact("app!Point"), "a.b", "Point", |point| async move { Ok(point) }.boxed())
        .unwrap_err();
    assert!(error.is_invalid_operation());
}

#[tokio::test]
async fn test_predicate_matcher()
{
    let matcher = TypeMatcher::predicate("templates", |ty: &TypeDescriptor| ty.name().starts_with("Po"));
    let registry = RegistryBuilder::new()
        .with_sync_description(matcher, "prefix", |_| "matched".to_string())
        .build();
    let (nav, _) = fixture_with(registry);

    assert_eq!(object(&nav, "Point", POINT).desc().await.unwrap(), "matched");
    assert_eq!(object(&nav, "Node", RING).desc().await.unwrap(), "0x1000");
}

#[tokio::test]
async fn test_named_array_inherited_from_base()
{
    let registry = RegistryBuilder::new()
        .with_array_field(exact("app!Mixin"), "members", Some("int"), |mixin| {
            async move { mixin.f("m").await.map(|m| vec![m]) }.boxed()
        })
        .build();
    let (nav, _) = fixture_with(registry);

    let members = object(&nav, "Multi", MULTI).named_array("members").await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].pointer_value(), Address::from(MULTI + 0x18));
    assert_eq!(members[0].val().await.unwrap(), Some(2.0));
}

#[tokio::test]
async fn test_named_array_last_registration_wins()
{
    let registry = RegistryBuilder::new()
        .with_array_field(exact("app!Holder"), "values", None, |holder| {
            async move { holder.f("numbers").await?.array(Some(2)).await }.boxed()
        })
        .with_array_field(exact("app!Holder"), "values", None, |holder| {
            async move { holder.f("numbers").await?.array(None).await }.boxed()
        })
        .build();
    let (nav, _) = fixture_with(registry);

    let values = object(&nav, "Holder", HOLDER).named_array("values").await.unwrap();
    assert_eq!(values.len(), 4);
    assert_eq!(values[3].val().await.unwrap(), Some(-4.0));
}

#[tokio::test]
async fn test_named_array_errors()
{
    let registry = RegistryBuilder::new()
        .with_array_field(exact("app!Point"), "coordinates", Some("Node"), |point| {
            async move { point.f("x").await.map(|x| vec![x]) }.boxed()
        })
        .build();
    let (nav, _) = fixture_with(registry);
    let point = object(&nav, "Point", POINT);

    let error = point.named_array("coordinates").await.unwrap_err();
    assert_eq!(
        error,
        NavError::CastMismatch {
            from: "int".to_string(),
            to: "Node".to_string(),
        }
    );
    assert!(point.named_array("missing").await.unwrap_err().is_lookup_failure());
}
