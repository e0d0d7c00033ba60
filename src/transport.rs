//! Renderer transport: the message channel between host and renderer.
//!
//! DESIGN
//! ======
//! Two bounded tokio mpsc channels, one per direction. In
//! [`TransportMode::CoLocated`] messages travel as typed values; in
//! [`TransportMode::Isolated`] every message is serialized to bytes on send
//! and decoded on receive, so nothing shared by reference crosses the
//! boundary. Transferables (the [`Surface`]) ride beside the payload in the
//! envelope and are moved, never serialized.
//!
//! Both modes validate inbound host messages on the renderer side, so a
//! renderer sees the same input whichever mode it runs in.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{
    self, ErrorCode, HostMessage, ProtocolError, RendererMessage, decode_host_message, decode_renderer_message,
};
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// Renderer runs as a task on the host runtime; messages are moved as values.
    CoLocated,
    /// Renderer runs on its own thread; messages are serialized.
    #[default]
    Isolated,
}

impl TransportMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoLocated => "co-located",
            Self::Isolated => "isolated",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "co-located" | "colocated" => Ok(Self::CoLocated),
            "isolated" => Ok(Self::Isolated),
            other => Err(format!("unknown transport mode '{other}' (expected 'isolated' or 'co-located')")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("renderer channel closed")]
    Closed,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("renderer is not initialized")]
    NotReady,
    #[error("timed out waiting for reply to {0}")]
    Timeout(&'static str),
    #[error("renderer rejected {awaiting}: {message}")]
    Rejected { awaiting: &'static str, code: Option<String>, message: String },
    #[error("failed to start renderer: {0}")]
    Spawn(String),
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => "E_TRANSPORT_CLOSED",
            Self::Protocol(e) => e.error_code(),
            Self::NotReady => "E_NOT_READY",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::Rejected { .. } => "E_REJECTED",
            Self::Spawn(_) => "E_SPAWN",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::NotReady)
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

#[derive(Debug)]
enum Payload<M> {
    Direct(M),
    Encoded(Vec<u8>),
}

impl<M: Serialize> Payload<M> {
    fn wrap(mode: TransportMode, message: M) -> Result<Self, ProtocolError> {
        match mode {
            TransportMode::CoLocated => Ok(Self::Direct(message)),
            TransportMode::Isolated => protocol::encode(&message).map(Self::Encoded),
        }
    }
}

/// A host message plus anything transferred alongside it.
#[derive(Debug)]
pub struct Envelope {
    payload: Payload<HostMessage>,
    transfer: Option<Surface>,
}

/// What the renderer receives: the decoded message (or why it could not be
/// decoded) and any transferred surface.
#[derive(Debug)]
pub struct Inbound {
    pub message: Result<HostMessage, ProtocolError>,
    pub transfer: Option<Surface>,
}

// =============================================================================
// ENDPOINTS
// =============================================================================

/// Cloneable host → renderer sender.
#[derive(Debug, Clone)]
pub struct HostSender {
    mode: TransportMode,
    tx: mpsc::Sender<Envelope>,
}

impl HostSender {
    #[must_use]
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the renderer is gone, or a
    /// protocol error if the message cannot be encoded.
    pub async fn send(&self, message: HostMessage) -> Result<(), TransportError> {
        self.dispatch(message, None).await
    }

    /// Send `message` with `surface` transferred beside it.
    ///
    /// # Errors
    ///
    /// As [`Self::send`]. The surface is lost if the send fails.
    pub async fn send_with_transfer(&self, message: HostMessage, surface: Surface) -> Result<(), TransportError> {
        self.dispatch(message, Some(surface)).await
    }

    async fn dispatch(&self, message: HostMessage, transfer: Option<Surface>) -> Result<(), TransportError> {
        let message_type = message.type_name();
        let payload = Payload::wrap(self.mode, message)?;
        self.tx.send(Envelope { payload, transfer }).await.map_err(|_| TransportError::Closed)?;
        debug!(message_type, mode = %self.mode, "host message sent");
        Ok(())
    }
}

/// Renderer → host receiving half.
#[derive(Debug)]
pub struct HostReceiver {
    rx: mpsc::Receiver<Payload<RendererMessage>>,
}

impl HostReceiver {
    /// Next renderer message. `None` once the renderer has shut down.
    pub async fn recv(&mut self) -> Option<Result<RendererMessage, ProtocolError>> {
        let payload = self.rx.recv().await?;
        Some(match payload {
            Payload::Direct(message) => message.validate().map(|()| message),
            Payload::Encoded(bytes) => decode_renderer_message(&bytes),
        })
    }
}

/// The renderer's half: inbound host messages, outbound replies.
#[derive(Debug)]
pub struct RendererEndpoint {
    mode: TransportMode,
    rx: mpsc::Receiver<Envelope>,
    tx: mpsc::Sender<Payload<RendererMessage>>,
}

impl RendererEndpoint {
    #[must_use]
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Next host message, decoded and validated. `None` once every
    /// [`HostSender`] has been dropped.
    pub async fn recv(&mut self) -> Option<Inbound> {
        let Envelope { payload, transfer } = self.rx.recv().await?;
        let message = match payload {
            Payload::Direct(message) => message.validate().map(|()| message),
            Payload::Encoded(bytes) => decode_host_message(&bytes),
        };
        Some(Inbound { message, transfer })
    }

    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the host is gone.
    pub async fn post(&self, message: RendererMessage) -> Result<(), TransportError> {
        let message_type = message.type_name();
        let payload = Payload::wrap(self.mode, message)?;
        self.tx.send(payload).await.map_err(|_| TransportError::Closed)?;
        debug!(message_type, mode = %self.mode, "renderer message posted");
        Ok(())
    }
}

/// Create a connected host/renderer pair with `capacity` slots per direction.
#[must_use]
pub fn channel(mode: TransportMode, capacity: usize) -> (HostSender, HostReceiver, RendererEndpoint) {
    let capacity = capacity.max(1);
    let (host_tx, renderer_rx) = mpsc::channel(capacity);
    let (renderer_tx, host_rx) = mpsc::channel(capacity);
    (
        HostSender { mode, tx: host_tx },
        HostReceiver { rx: host_rx },
        RendererEndpoint { mode, rx: renderer_rx, tx: renderer_tx },
    )
}

/// Raw bytes of a host message exactly as the isolated transport would carry
/// them. Lets tests and tools inject malformed input.
///
/// # Errors
///
/// Returns [`TransportError::Closed`] if the renderer is gone.
pub async fn send_raw(sender: &HostSender, bytes: Vec<u8>) -> Result<(), TransportError> {
    sender
        .tx
        .send(Envelope { payload: Payload::Encoded(bytes), transfer: None })
        .await
        .map_err(|_| TransportError::Closed)
}
