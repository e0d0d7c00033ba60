//! Replicated-state bridge: document diffs in, protocol messages out.
//!
//! DESIGN
//! ======
//! The replicated document is an external collaborator behind
//! [`ReplicatedDocument`]. Its objects cross into the engine as JSON and are
//! converted to plain [`TableObject`] snapshots right here, at the boundary;
//! nothing downstream ever holds a reference into the document.
//!
//! Consecutive changes of the same type in a batch are coalesced into one
//! message, so a 500-object paste becomes one `objects-added`, while an
//! add/remove/add sequence stays three messages in document order.
//!
//! LIFECYCLE
//! =========
//! [`ReplicatedStateBridge::start`] subscribes first, then runs the two-phase
//! [`initial_sync`] (assets, acknowledgement, snapshot), and only then spawns
//! the forwarding tasks, so no object message can overtake the assets.

#[cfg(test)]
#[path = "bridge_test.rs"]
mod bridge_test;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::assets::GameAssets;
use crate::host::RendererClient;
use crate::object::{ActorId, ObjectId, TableObject};
use crate::protocol::{AwarenessEntry, AwarenessState, ErrorCode, HostMessage, ObjectEntry};
use crate::transport::{HostSender, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("object {id} is not a valid table object: {reason}")]
    InvalidObject { id: ObjectId, reason: String },
}

impl ErrorCode for BridgeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(e) => e.error_code(),
            Self::InvalidObject { .. } => "E_INVALID_OBJECT",
        }
    }
}

/// One structural change as the document reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectChange {
    Added { id: ObjectId, value: Value },
    Updated { id: ObjectId, value: Value },
    Removed { id: ObjectId },
}

/// Changes committed together, in document order.
pub type ChangeBatch = Vec<ObjectChange>;

/// The shared document the bridge observes.
pub trait ReplicatedDocument: Send + Sync {
    /// Current objects, in a stable order.
    fn objects(&self) -> Vec<(ObjectId, Value)>;

    /// Every batch committed after this call.
    fn subscribe_objects(&self) -> mpsc::UnboundedReceiver<ChangeBatch>;

    /// Full awareness state (all actors) on every change.
    fn subscribe_awareness(&self) -> mpsc::UnboundedReceiver<Vec<AwarenessEntry>>;

    fn local_actor(&self) -> ActorId;
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Snapshot a document value as a [`TableObject`].
///
/// # Errors
///
/// Returns [`BridgeError::InvalidObject`] if the value does not describe a
/// table object of a known kind.
pub fn to_table_object(id: &str, value: &Value) -> Result<TableObject, BridgeError> {
    TableObject::deserialize(value).map_err(|e| BridgeError::InvalidObject { id: id.to_owned(), reason: e.to_string() })
}

fn entry(id: &str, value: &Value) -> Option<ObjectEntry> {
    match to_table_object(id, value) {
        Ok(object) => Some(ObjectEntry::new(id, object)),
        Err(e) => {
            warn!(object_id = %id, error = %e, "skipping invalid document object");
            None
        }
    }
}

/// Convert a batch into protocol messages, coalescing consecutive changes of
/// the same type. Invalid objects are logged and skipped.
#[must_use]
pub fn changes_to_messages(batch: &[ObjectChange]) -> Vec<HostMessage> {
    let mut out: Vec<HostMessage> = Vec::new();
    for change in batch {
        match change {
            ObjectChange::Added { id, value } => {
                let Some(entry) = entry(id, value) else { continue };
                if let Some(HostMessage::ObjectsAdded { objects }) = out.last_mut() {
                    objects.push(entry);
                } else {
                    out.push(HostMessage::ObjectsAdded { objects: vec![entry] });
                }
            }
            ObjectChange::Updated { id, value } => {
                let Some(entry) = entry(id, value) else { continue };
                if let Some(HostMessage::ObjectsUpdated { objects }) = out.last_mut() {
                    objects.push(entry);
                } else {
                    out.push(HostMessage::ObjectsUpdated { objects: vec![entry] });
                }
            }
            ObjectChange::Removed { id } => {
                if let Some(HostMessage::ObjectsRemoved { ids }) = out.last_mut() {
                    ids.push(id.clone());
                } else {
                    out.push(HostMessage::ObjectsRemoved { ids: vec![id.clone()] });
                }
            }
        }
    }
    out
}

// =============================================================================
// SYNC
// =============================================================================

/// Push assets, wait for the renderer to acknowledge them, then send the
/// document snapshot as `objects-added` chunks of at most `chunk_size`.
/// Returns the number of objects sent.
///
/// # Errors
///
/// Returns [`BridgeError::Transport`] if any send or the acknowledgement fails.
pub async fn initial_sync(
    client: &mut RendererClient,
    doc: &dyn ReplicatedDocument,
    assets: Option<GameAssets>,
    chunk_size: usize,
) -> Result<usize, BridgeError> {
    client.set_game_assets(assets).await?;
    debug!("assets acknowledged; sending snapshot");

    let mut entries = doc.objects().into_iter().filter_map(|(id, value)| entry(&id, &value)).peekable();
    let chunk_size = chunk_size.max(1);
    let (mut total, mut chunks) = (0, 0);
    while entries.peek().is_some() {
        let chunk: Vec<ObjectEntry> = entries.by_ref().take(chunk_size).collect();
        total += chunk.len();
        chunks += 1;
        client.send(HostMessage::ObjectsAdded { objects: chunk }).await?;
    }
    info!(objects = total, chunks, "initial sync complete");
    Ok(total)
}

/// Running forwarders started by [`ReplicatedStateBridge::start`].
pub struct BridgeTasks {
    pub objects: JoinHandle<Result<u64, BridgeError>>,
    pub awareness: JoinHandle<Result<u64, BridgeError>>,
}

pub struct ReplicatedStateBridge {
    sender: HostSender,
}

impl ReplicatedStateBridge {
    #[must_use]
    pub fn new(sender: HostSender) -> Self {
        Self { sender }
    }

    /// Subscribe to `doc`, run [`initial_sync`], then spawn the object and
    /// awareness forwarders.
    ///
    /// # Errors
    ///
    /// Returns the initial sync's error; nothing is spawned in that case.
    pub async fn start(
        client: &mut RendererClient,
        doc: &dyn ReplicatedDocument,
        assets: Option<GameAssets>,
        chunk_size: usize,
    ) -> Result<BridgeTasks, BridgeError> {
        let object_feed = doc.subscribe_objects();
        let awareness_feed = doc.subscribe_awareness();
        initial_sync(client, doc, assets, chunk_size).await?;

        let bridge = Self::new(client.sender());
        let local_actor = doc.local_actor();
        let awareness_sender = client.sender();
        Ok(BridgeTasks {
            objects: tokio::spawn(async move { bridge.run(object_feed).await }),
            awareness: tokio::spawn(
                async move { forward_awareness(awareness_feed, &local_actor, &awareness_sender).await },
            ),
        })
    }

    /// Forward batches until the feed closes. Returns the number of messages sent.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the renderer goes away.
    pub async fn run(&self, mut feed: mpsc::UnboundedReceiver<ChangeBatch>) -> Result<u64, BridgeError> {
        let mut sent = 0;
        while let Some(batch) = feed.recv().await {
            let messages = changes_to_messages(&batch);
            debug!(changes = batch.len(), messages = messages.len(), "forwarding change batch");
            for message in messages {
                self.sender.send(message).await?;
                sent += 1;
            }
        }
        info!(sent, "document feed closed; bridge stopped");
        Ok(sent)
    }
}

/// Forward awareness snapshots, without the local actor's own entry.
///
/// # Errors
///
/// Returns [`BridgeError::Transport`] if the renderer goes away.
pub async fn forward_awareness(
    mut feed: mpsc::UnboundedReceiver<Vec<AwarenessEntry>>,
    local_actor: &str,
    sender: &HostSender,
) -> Result<u64, BridgeError> {
    let mut sent = 0;
    while let Some(states) = feed.recv().await {
        let states: Vec<AwarenessEntry> = states.into_iter().filter(|s| s.actor_id != local_actor).collect();
        sender.send(HostMessage::AwarenessUpdate { states }).await?;
        sent += 1;
    }
    Ok(sent)
}

// =============================================================================
// IN-MEMORY DOCUMENT
// =============================================================================

#[derive(Default)]
struct DocState {
    objects: Vec<(ObjectId, Value)>,
    awareness: BTreeMap<ActorId, AwarenessState>,
    object_subs: Vec<mpsc::UnboundedSender<ChangeBatch>>,
    awareness_subs: Vec<mpsc::UnboundedSender<Vec<AwarenessEntry>>>,
}

/// A single-process [`ReplicatedDocument`] with no conflict resolution.
#[derive(Clone)]
pub struct InMemoryDocument {
    local_actor: ActorId,
    state: Arc<Mutex<DocState>>,
}

impl InMemoryDocument {
    #[must_use]
    pub fn new(local_actor: impl Into<ActorId>) -> Self {
        Self { local_actor: local_actor.into(), state: Arc::new(Mutex::new(DocState::default())) }
    }

    fn lock(&self) -> MutexGuard<'_, DocState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Commit `batch` and publish it to every subscriber.
    pub fn apply(&self, batch: ChangeBatch) {
        let mut state = self.lock();
        for change in &batch {
            match change {
                ObjectChange::Added { id, value } | ObjectChange::Updated { id, value } => {
                    if let Some(slot) = state.objects.iter_mut().find(|(k, _)| k == id) {
                        slot.1 = value.clone();
                    } else {
                        state.objects.push((id.clone(), value.clone()));
                    }
                }
                ObjectChange::Removed { id } => state.objects.retain(|(k, _)| k != id),
            }
        }
        state.object_subs.retain(|tx| tx.send(batch.clone()).is_ok());
    }

    /// Insert or replace one object.
    pub fn upsert(&self, id: impl Into<ObjectId>, value: Value) {
        let id = id.into();
        let exists = self.lock().objects.iter().any(|(k, _)| *k == id);
        let change = if exists { ObjectChange::Updated { id, value } } else { ObjectChange::Added { id, value } };
        self.apply(vec![change]);
    }

    pub fn remove(&self, id: impl Into<ObjectId>) {
        self.apply(vec![ObjectChange::Removed { id: id.into() }]);
    }

    /// Set (or with `None`, clear) an actor's awareness state and publish.
    pub fn set_awareness(&self, actor_id: impl Into<ActorId>, awareness: Option<AwarenessState>) {
        let mut state = self.lock();
        let actor_id = actor_id.into();
        match awareness {
            Some(a) => state.awareness.insert(actor_id, a),
            None => state.awareness.remove(&actor_id),
        };
        let snapshot: Vec<AwarenessEntry> = state
            .awareness
            .iter()
            .map(|(actor, s)| AwarenessEntry { actor_id: actor.clone(), state: s.clone() })
            .collect();
        state.awareness_subs.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }
}

impl ReplicatedDocument for InMemoryDocument {
    fn objects(&self) -> Vec<(ObjectId, Value)> {
        self.lock().objects.clone()
    }

    fn subscribe_objects(&self) -> mpsc::UnboundedReceiver<ChangeBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().object_subs.push(tx);
        rx
    }

    fn subscribe_awareness(&self) -> mpsc::UnboundedReceiver<Vec<AwarenessEntry>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().awareness_subs.push(tx);
        rx
    }

    fn local_actor(&self) -> ActorId {
        self.local_actor.clone()
    }
}
