//! Protocol: the closed message taxonomy between host and renderer.
//!
//! ARCHITECTURE
//! ============
//! Two tagged unions, one per direction: [`HostMessage`] (host → renderer) and
//! [`RendererMessage`] (renderer → host). On the wire both are JSON objects
//! with a kebab-case `type` tag and camelCase payload fields.
//!
//! DESIGN
//! ======
//! - Decoding is staged: JSON shape, then `type` against the per-direction
//!   table of known names, then payload shape, then semantic checks
//!   (`validate`). Each stage has its own [`ProtocolError`] variant.
//! - Errors that cross the boundary carry a grepable code via [`ErrorCode`].

#[cfg(test)]
#[path = "protocol_test.rs"]
mod protocol_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::animation::AnimationKind;
use crate::assets::GameAssets;
use crate::camera::Point;
use crate::input::{InteractionMode, PointerEvent, WheelEvent};
use crate::object::{ActorId, ObjectId, Position, TableObject};

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured `error` messages.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("message has no type tag")]
    MissingType,
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("invalid payload for {message_type}: {reason}")]
    InvalidPayload { message_type: String, reason: String },
    #[error("invalid {message_type}: {reason}")]
    Invalid { message_type: &'static str, reason: String },
    #[error("encode failed: {0}")]
    Encode(String),
}

impl ErrorCode for ProtocolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "E_MALFORMED_MESSAGE",
            Self::MissingType => "E_MISSING_TYPE",
            Self::UnknownType(_) => "E_UNKNOWN_MESSAGE",
            Self::InvalidPayload { .. } => "E_INVALID_PAYLOAD",
            Self::Invalid { .. } => "E_INVALID_MESSAGE",
            Self::Encode(_) => "E_ENCODE",
        }
    }
}

// =============================================================================
// PAYLOAD TYPES
// =============================================================================

/// One object in an `objects-added` / `objects-updated` batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub id: ObjectId,
    pub object: TableObject,
}

impl ObjectEntry {
    #[must_use]
    pub fn new(id: impl Into<ObjectId>, object: TableObject) -> Self {
        Self { id: id.into(), object }
    }

    /// Checks for one entry of a batch. A failing entry is dropped on its
    /// own; the rest of the batch still applies.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Invalid`] tagged with `message_type`.
    pub fn validate(&self, message_type: &'static str) -> Result<(), ProtocolError> {
        if self.id.is_empty() {
            return Err(ProtocolError::Invalid { message_type, reason: "object id must not be empty".into() });
        }
        if !position_is_finite(&self.object.position) {
            return Err(ProtocolError::Invalid {
                message_type,
                reason: format!("object {} position must be finite", self.id),
            });
        }
        Ok(())
    }
}

/// A remote participant's in-progress drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDrag {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
}

/// Ephemeral presence data for one remote participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwarenessState {
    /// Cursor position in world coordinates.
    pub cursor: Option<Point>,
    /// Object the participant is dragging, and where it currently is.
    pub drag: Option<RemoteDrag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwarenessEntry {
    pub actor_id: ActorId,
    #[serde(default)]
    pub state: AwarenessState,
}

// =============================================================================
// HOST → RENDERER
// =============================================================================

pub const HOST_MESSAGE_TYPES: &[&str] = &[
    "init",
    "resize",
    "objects-added",
    "objects-updated",
    "objects-removed",
    "pointer-down",
    "pointer-move",
    "pointer-up",
    "wheel",
    "set-interaction-mode",
    "set-grid-snap-enabled",
    "set-game-assets",
    "awareness-update",
    "flush",
    "check-animation-state",
    "ping",
    "echo",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// One-time surface handoff. The surface itself travels beside the message.
    #[serde(rename_all = "camelCase")]
    Init { width: f64, height: f64, pixel_ratio: f64 },
    #[serde(rename_all = "camelCase")]
    Resize { width: f64, height: f64, pixel_ratio: f64 },
    ObjectsAdded { objects: Vec<ObjectEntry> },
    ObjectsUpdated { objects: Vec<ObjectEntry> },
    ObjectsRemoved { ids: Vec<ObjectId> },
    PointerDown { event: PointerEvent },
    PointerMove { event: PointerEvent },
    PointerUp { event: PointerEvent },
    Wheel { event: WheelEvent },
    SetInteractionMode { mode: InteractionMode },
    SetGridSnapEnabled { enabled: bool },
    SetGameAssets { assets: Option<GameAssets> },
    AwarenessUpdate { states: Vec<AwarenessEntry> },
    Flush,
    #[serde(rename_all = "camelCase")]
    CheckAnimationState {
        #[serde(default)]
        visual_id: Option<ObjectId>,
        #[serde(default)]
        kind: Option<AnimationKind>,
    },
    Ping {
        #[serde(default)]
        data: Value,
    },
    Echo {
        #[serde(default)]
        data: Value,
    },
}

impl HostMessage {
    /// Wire name of this message's `type` tag.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Resize { .. } => "resize",
            Self::ObjectsAdded { .. } => "objects-added",
            Self::ObjectsUpdated { .. } => "objects-updated",
            Self::ObjectsRemoved { .. } => "objects-removed",
            Self::PointerDown { .. } => "pointer-down",
            Self::PointerMove { .. } => "pointer-move",
            Self::PointerUp { .. } => "pointer-up",
            Self::Wheel { .. } => "wheel",
            Self::SetInteractionMode { .. } => "set-interaction-mode",
            Self::SetGridSnapEnabled { .. } => "set-grid-snap-enabled",
            Self::SetGameAssets { .. } => "set-game-assets",
            Self::AwarenessUpdate { .. } => "awareness-update",
            Self::Flush => "flush",
            Self::CheckAnimationState { .. } => "check-animation-state",
            Self::Ping { .. } => "ping",
            Self::Echo { .. } => "echo",
        }
    }

    /// Semantic checks beyond payload shape. Entries of object batches are
    /// checked one by one at apply time ([`ObjectEntry::validate`]).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Invalid`] naming the first failed check.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let invalid = |reason: &str| ProtocolError::Invalid { message_type: self.type_name(), reason: reason.to_owned() };
        match self {
            Self::Init { width, height, pixel_ratio } | Self::Resize { width, height, pixel_ratio } => {
                if !is_positive(*width) || !is_positive(*height) {
                    return Err(invalid("width and height must be positive and finite"));
                }
                if !is_positive(*pixel_ratio) {
                    return Err(invalid("pixelRatio must be positive and finite"));
                }
            }
            Self::ObjectsRemoved { ids } => {
                if ids.iter().any(String::is_empty) {
                    return Err(invalid("object id must not be empty"));
                }
            }
            Self::PointerDown { event } | Self::PointerMove { event } | Self::PointerUp { event } => {
                if !event.is_finite() {
                    return Err(invalid("pointer coordinates must be finite"));
                }
            }
            Self::Wheel { event } => {
                if !event.is_finite() {
                    return Err(invalid("wheel coordinates must be finite"));
                }
            }
            Self::AwarenessUpdate { states } => {
                if states.iter().any(|s| s.actor_id.is_empty()) {
                    return Err(invalid("actor id must not be empty"));
                }
            }
            Self::ObjectsAdded { .. }
            | Self::ObjectsUpdated { .. }
            | Self::SetInteractionMode { .. }
            | Self::SetGridSnapEnabled { .. }
            | Self::SetGameAssets { .. }
            | Self::Flush
            | Self::CheckAnimationState { .. }
            | Self::Ping { .. }
            | Self::Echo { .. } => {}
        }
        Ok(())
    }
}

// =============================================================================
// RENDERER → HOST
// =============================================================================

pub const RENDERER_MESSAGE_TYPES: &[&str] = &[
    "initialized",
    "assets-acknowledged",
    "flushed",
    "animation-state",
    "pong",
    "echo-response",
    "error",
    "selection-changed",
    "object-moved",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RendererMessage {
    Initialized,
    AssetsAcknowledged,
    Flushed,
    #[serde(rename_all = "camelCase")]
    AnimationState { is_animating: bool },
    Pong {
        #[serde(default)]
        data: Value,
    },
    EchoResponse {
        #[serde(default)]
        data: Value,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default)]
        retryable: bool,
    },
    SelectionChanged { ids: Vec<ObjectId> },
    ObjectMoved { id: ObjectId, position: Position },
}

impl RendererMessage {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::AssetsAcknowledged => "assets-acknowledged",
            Self::Flushed => "flushed",
            Self::AnimationState { .. } => "animation-state",
            Self::Pong { .. } => "pong",
            Self::EchoResponse { .. } => "echo-response",
            Self::Error { .. } => "error",
            Self::SelectionChanged { .. } => "selection-changed",
            Self::ObjectMoved { .. } => "object-moved",
        }
    }

    /// Build an `error` message from any error with a code.
    #[must_use]
    pub fn error_from(err: &impl ErrorCode) -> Self {
        Self::Error { message: err.to_string(), code: Some(err.error_code().to_owned()), retryable: err.retryable() }
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::Invalid`] for an `object-moved` with a
    /// non-finite position or an empty id.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Self::ObjectMoved { id, position } = self {
            if id.is_empty() || !position_is_finite(position) {
                return Err(ProtocolError::Invalid {
                    message_type: self.type_name(),
                    reason: "object-moved needs an id and a finite position".into(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Serialize a message for the isolated transport.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode<M: Serialize>(message: &M) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decode and validate a host → renderer message.
///
/// # Errors
///
/// Returns the [`ProtocolError`] for the first decoding stage that fails.
pub fn decode_host_message(bytes: &[u8]) -> Result<HostMessage, ProtocolError> {
    let message: HostMessage = decode_tagged(bytes, HOST_MESSAGE_TYPES)?;
    message.validate()?;
    Ok(message)
}

/// Decode and validate a renderer → host message.
///
/// # Errors
///
/// Returns the [`ProtocolError`] for the first decoding stage that fails.
pub fn decode_renderer_message(bytes: &[u8]) -> Result<RendererMessage, ProtocolError> {
    let message: RendererMessage = decode_tagged(bytes, RENDERER_MESSAGE_TYPES)?;
    message.validate()?;
    Ok(message)
}

fn decode_tagged<M: serde::de::DeserializeOwned>(bytes: &[u8], known: &[&str]) -> Result<M, ProtocolError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let Some(message_type) = value.get("type").and_then(Value::as_str) else {
        return Err(ProtocolError::MissingType);
    };
    if !known.contains(&message_type) {
        return Err(ProtocolError::UnknownType(message_type.to_owned()));
    }
    let message_type = message_type.to_owned();
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload { message_type, reason: e.to_string() })
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn position_is_finite(p: &Position) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.rotation.is_finite()
}
