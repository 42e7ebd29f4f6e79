//! Tests for linked-list walking and string reads

mod common;

use common::{navigator, object, CHAIN, RING, TEXT, WIDE_TEXT};
use dbgnav_core::types::Address;
use dbgnav_core::ListStep;
use futures::FutureExt;

async fn values(nodes: &[dbgnav_core::DbgObject]) -> Vec<f64>
{
    let mut values = Vec::new();
    for node in nodes {
        values.push(node.f("value").await.unwrap().val().await.unwrap().unwrap());
    }
    values
}

#[tokio::test]
async fn test_ring_stops_at_start()
{
    let nav = navigator();
    let head = object(&nav, "Node", RING);

    let nodes = head.list("next", None, None).await.unwrap();
    assert_eq!(nodes.len(), 5);
    assert_eq!(values(&nodes).await, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
}

#[tokio::test]
async fn test_stop_node_is_last_collected()
{
    let nav = navigator();
    let head = object(&nav, "Node", RING);
    let stop = object(&nav, "Node", RING + 0x20);

    let nodes = head.list("next", Some(stop), None).await.unwrap();
    let addresses: Vec<Address> = nodes.iter().map(|node| node.pointer_value()).collect();
    assert_eq!(
        addresses,
        vec![Address::from(RING), Address::from(RING + 0x10), Address::from(RING + 0x20)]
    );
}

#[tokio::test]
async fn test_stop_at_start_is_sentinel()
{
    let nav = navigator();
    let head = object(&nav, "Node", RING);

    let nodes = head.list("next", Some(head.clone()), None).await.unwrap();
    assert_eq!(nodes.len(), 5);
}

#[tokio::test]
async fn test_max_count()
{
    let nav = navigator();
    let head = object(&nav, "Node", RING);

    let nodes = head.list("next", None, Some(2)).await.unwrap();
    assert_eq!(values(&nodes).await, vec![0.0, 10.0]);
}

#[tokio::test]
async fn test_null_terminated_list()
{
    let nav = navigator();
    let head = nav.global("app", "g_chain", None).await.unwrap();

    let nodes = head.list("next", None, None).await.unwrap();
    assert_eq!(values(&nodes).await, vec![1.0, 2.0, 3.0]);
    assert!(nav.null().list("next", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fallback_paths_and_functions()
{
    let nav = navigator();
    let head = object(&nav, "Node", CHAIN);

    let by_paths = head.list(ListStep::paths(["flink", "next"]), None, None).await.unwrap();
    assert_eq!(by_paths.len(), 3);

    let step = ListStep::function(|node| async move { node.f("next").await }.boxed());
    let by_function = head.list(step, None, None).await.unwrap();
    assert_eq!(by_function.len(), 3);
    assert!(by_function[2].equals(&by_paths[2]));
}

#[tokio::test]
async fn test_failing_step_fails_the_walk()
{
    let nav = navigator();
    let head = object(&nav, "Node", CHAIN);

    let error = head.list("flink", None, None).await.unwrap_err();
    assert!(error.is_lookup_failure());
}

#[tokio::test]
async fn test_terminated_strings()
{
    let nav = navigator();

    assert_eq!(object(&nav, "char", TEXT).string(None).await.unwrap(), "hello");
    assert_eq!(object(&nav, "wchar_t", WIDE_TEXT).string(None).await.unwrap(), "hi");
}

#[tokio::test]
async fn test_fixed_length_string()
{
    let nav = navigator();
    assert_eq!(object(&nav, "char", TEXT).string(Some(3)).await.unwrap(), "hel");
}

#[tokio::test]
async fn test_null_string()
{
    let nav = navigator();
    assert_eq!(object(&nav, "char", 0).string(None).await.unwrap(), "???");
}

#[tokio::test]
async fn test_unreadable_string()
{
    let nav = navigator();
    let error = object(&nav, "char", 0x10).string(None).await.unwrap_err();
    assert!(matches!(error, dbgnav_core::NavError::MemoryAccess { .. }));
}
