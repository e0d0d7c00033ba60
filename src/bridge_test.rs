use std::time::Duration;

use serde_json::json;

use super::*;
use crate::protocol::RendererMessage;
use crate::surface::Surface;
use crate::transport::{RendererEndpoint, TransportMode, channel};

fn token(x: f64) -> Value {
    json!({"kind": "token", "position": {"x": x, "y": 0.0}, "sortKey": "a"})
}

fn added(id: &str) -> ObjectChange {
    ObjectChange::Added { id: id.into(), value: token(0.0) }
}

fn updated(id: &str) -> ObjectChange {
    ObjectChange::Updated { id: id.into(), value: token(1.0) }
}

fn removed(id: &str) -> ObjectChange {
    ObjectChange::Removed { id: id.into() }
}

fn shape(messages: &[HostMessage]) -> Vec<(&'static str, usize)> {
    messages
        .iter()
        .map(|m| match m {
            HostMessage::ObjectsAdded { objects } | HostMessage::ObjectsUpdated { objects } => {
                (m.type_name(), objects.len())
            }
            HostMessage::ObjectsRemoved { ids } => (m.type_name(), ids.len()),
            other => (other.type_name(), 0),
        })
        .collect()
}

/// Renderer stand-in that acknowledges requests and reports every message
/// type it receives, in order.
fn recording_renderer(mut endpoint: RendererEndpoint) -> mpsc::UnboundedReceiver<HostMessage> {
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(inbound) = endpoint.recv().await {
            let Ok(message) = inbound.message else { continue };
            let reply = match &message {
                HostMessage::Init { .. } => Some(RendererMessage::Initialized),
                HostMessage::SetGameAssets { .. } => Some(RendererMessage::AssetsAcknowledged),
                HostMessage::Flush => Some(RendererMessage::Flushed),
                _ => None,
            };
            seen_tx.send(message).unwrap();
            if let Some(reply) = reply {
                endpoint.post(reply).await.unwrap();
            }
        }
    });
    seen_rx
}

async fn ready_client() -> (RendererClient, mpsc::UnboundedReceiver<HostMessage>) {
    let (tx, rx, endpoint) = channel(TransportMode::Isolated, 64);
    let mut seen = recording_renderer(endpoint);
    let mut client = RendererClient::new(tx, rx, Duration::from_secs(2));
    client.init(Surface::new(100.0, 100.0, 1.0)).await.unwrap();
    assert_eq!(seen.recv().await.unwrap().type_name(), "init");
    (client, seen)
}

// =============================================================================
// COALESCING
// =============================================================================

#[test]
fn consecutive_changes_of_one_type_coalesce() {
    let batch: Vec<ObjectChange> = (0..500).map(|i| added(&format!("o{i}"))).collect();
    assert_eq!(shape(&changes_to_messages(&batch)), vec![("objects-added", 500)]);
}

#[test]
fn coalescing_preserves_document_order() {
    let batch = vec![added("a"), added("b"), removed("a"), updated("b"), updated("c"), added("a")];
    let messages = changes_to_messages(&batch);
    assert_eq!(
        shape(&messages),
        vec![("objects-added", 2), ("objects-removed", 1), ("objects-updated", 2), ("objects-added", 1)]
    );
    let HostMessage::ObjectsAdded { objects } = &messages[0] else { unreachable!() };
    assert_eq!(objects.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn invalid_objects_are_skipped() {
    let batch = vec![
        added("a"),
        ObjectChange::Added { id: "bad".into(), value: json!({"kind": "spaceship"}) },
        added("b"),
    ];
    assert_eq!(shape(&changes_to_messages(&batch)), vec![("objects-added", 2)]);
}

#[test]
fn conversion_reports_invalid_object() {
    let err = to_table_object("x", &json!({"position": {"x": 0, "y": 0}})).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidObject { ref id, .. } if id == "x"));
    assert_eq!(err.error_code(), "E_INVALID_OBJECT");
}

// =============================================================================
// SYNC
// =============================================================================

#[tokio::test]
async fn assets_are_acknowledged_before_any_object() {
    let (mut client, mut seen) = ready_client().await;
    let doc = InMemoryDocument::new("me");
    for i in 0..7 {
        doc.upsert(format!("o{i}"), token(f64::from(i)));
    }

    let sent = initial_sync(&mut client, &doc, Some(GameAssets::default()), 3).await.unwrap();
    assert_eq!(sent, 7);
    client.flush().await.unwrap();

    let mut order = Vec::new();
    while let Ok(message) = seen.try_recv() {
        order.push(message);
    }
    assert_eq!(
        shape(&order),
        vec![("set-game-assets", 0), ("objects-added", 3), ("objects-added", 3), ("objects-added", 1), ("flush", 0)]
    );
}

#[tokio::test]
async fn bridge_forwards_batches_after_sync() {
    let (mut client, mut seen) = ready_client().await;
    let doc = InMemoryDocument::new("me");
    doc.upsert("a", token(0.0));

    let tasks = ReplicatedStateBridge::start(&mut client, &doc, None, 500).await.unwrap();
    doc.upsert("a", token(5.0));
    doc.apply(vec![added("b"), added("c")]);
    doc.remove("b");

    let mut types = Vec::new();
    while types.len() < 5 {
        types.push(seen.recv().await.unwrap().type_name());
    }
    assert_eq!(types, vec!["set-game-assets", "objects-added", "objects-updated", "objects-added", "objects-removed"]);

    drop(doc);
    assert_eq!(tasks.objects.await.unwrap().unwrap(), 3);
    assert_eq!(tasks.awareness.await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn awareness_excludes_local_actor() {
    let (tx, _rx, mut endpoint) = channel(TransportMode::CoLocated, 8);
    let doc = InMemoryDocument::new("me");
    let feed = doc.subscribe_awareness();
    let forward = tokio::spawn(async move { forward_awareness(feed, "me", &tx).await });

    doc.set_awareness("me", Some(AwarenessState::default()));
    doc.set_awareness("them", Some(AwarenessState { cursor: Some(crate::camera::Point::new(1.0, 2.0)), drag: None }));

    let first = endpoint.recv().await.unwrap().message.unwrap();
    assert_eq!(first, HostMessage::AwarenessUpdate { states: vec![] });
    let HostMessage::AwarenessUpdate { states } = endpoint.recv().await.unwrap().message.unwrap() else {
        unreachable!()
    };
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].actor_id, "them");

    drop(doc);
    assert_eq!(forward.await.unwrap().unwrap(), 2);
}

// =============================================================================
// IN-MEMORY DOCUMENT
// =============================================================================

#[tokio::test]
async fn in_memory_document_publishes_batches() {
    let doc = InMemoryDocument::new("me");
    let mut feed = doc.subscribe_objects();
    doc.upsert("a", token(0.0));
    doc.upsert("a", token(1.0));
    doc.remove("a");

    assert!(matches!(feed.recv().await.unwrap()[0], ObjectChange::Added { .. }));
    assert!(matches!(feed.recv().await.unwrap()[0], ObjectChange::Updated { .. }));
    assert!(matches!(feed.recv().await.unwrap()[0], ObjectChange::Removed { .. }));
    assert!(doc.is_empty());
}

#[test]
fn snapshot_keeps_insertion_order() {
    let doc = InMemoryDocument::new("me");
    doc.upsert("z", token(0.0));
    doc.upsert("a", token(0.0));
    doc.upsert("z", token(3.0));
    let ids: Vec<ObjectId> = doc.objects().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["z", "a"]);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.local_actor(), "me");
}
