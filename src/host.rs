//! Host-side renderer client and the one-time surface handoff.
//!
//! LIFECYCLE
//! =========
//! 1. [`RendererClient::init`] moves the surface into the `init` message's
//!    envelope. The handoff guard flips to `SurfaceTransferred` *before* the
//!    send, so a second `init` can never transfer again, even mid-flight.
//! 2. The renderer answers `initialized`; the handoff becomes `Initialized`
//!    and every other operation is allowed.
//! 3. Dropping the client closes the channel and the renderer shuts down.
//!
//! Request/reply helpers (`ping`, `flush`, `set_game_assets`, ...) wait for
//! their reply with a timeout. Messages that arrive in the meantime and do not
//! match go into a backlog that [`RendererClient::next_message`] drains first,
//! so nothing is dropped; undecodable messages are kept there as errors. An
//! `error` reply ends the wait early with [`TransportError::Rejected`].

#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::animation::AnimationKind;
use crate::assets::GameAssets;
use crate::object::ObjectId;
use crate::protocol::{HostMessage, ProtocolError, RendererMessage};
use crate::surface::Surface;
use crate::transport::{HostReceiver, HostSender, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffState {
    Uninitialized,
    /// The surface has left the host; `initialized` not yet received.
    SurfaceTransferred,
    Initialized,
}

/// Guards the single transfer of the drawing surface.
#[derive(Debug)]
pub struct SurfaceHandoff {
    state: HandoffState,
}

impl Default for SurfaceHandoff {
    fn default() -> Self {
        Self { state: HandoffState::Uninitialized }
    }
}

impl SurfaceHandoff {
    #[must_use]
    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// Claim the transfer. Returns `false` if it has already happened.
    pub fn begin(&mut self) -> bool {
        if self.state != HandoffState::Uninitialized {
            return false;
        }
        self.state = HandoffState::SurfaceTransferred;
        true
    }

    pub fn complete(&mut self) {
        self.state = HandoffState::Initialized;
    }
}

pub struct RendererClient {
    sender: HostSender,
    receiver: HostReceiver,
    handoff: SurfaceHandoff,
    backlog: VecDeque<Result<RendererMessage, ProtocolError>>,
    request_timeout: Duration,
}

impl RendererClient {
    #[must_use]
    pub fn new(sender: HostSender, receiver: HostReceiver, request_timeout: Duration) -> Self {
        Self { sender, receiver, handoff: SurfaceHandoff::default(), backlog: VecDeque::new(), request_timeout }
    }

    #[must_use]
    pub fn handoff_state(&self) -> HandoffState {
        self.handoff.state()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.handoff.state() == HandoffState::Initialized
    }

    /// Hand `surface` to the renderer and wait for `initialized`.
    ///
    /// Calling this again after the first transfer is a no-op that returns
    /// the current state; the extra surface is dropped on the host side.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the send fails or the renderer does not
    /// acknowledge in time. The surface is gone either way.
    pub async fn init(&mut self, surface: Surface) -> Result<HandoffState, TransportError> {
        if self.handoff.state() != HandoffState::Uninitialized {
            warn!(state = ?self.handoff.state(), surface_id = %surface.id(), "init called again; surface not transferred");
            return Ok(self.handoff.state());
        }
        let init = HostMessage::Init {
            width: surface.width(),
            height: surface.height(),
            pixel_ratio: surface.pixel_ratio(),
        };
        init.validate()?;
        self.handoff.begin();
        info!(surface_id = %surface.id(), "transferring surface to renderer");
        self.sender.send_with_transfer(init, surface).await?;
        self.await_reply("init", |m| matches!(m, RendererMessage::Initialized)).await?;
        self.handoff.complete();
        info!("renderer initialized");
        Ok(self.handoff.state())
    }

    /// A cloneable sender for other tasks (the bridge, input forwarding).
    #[must_use]
    pub fn sender(&self) -> HostSender {
        self.sender.clone()
    }

    /// Validate and send a fire-and-forget message.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotReady`] before `init` completes, a protocol error
    /// for an invalid message, or [`TransportError::Closed`].
    pub async fn send(&self, message: HostMessage) -> Result<(), TransportError> {
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        message.validate()?;
        self.sender.send(message).await
    }

    /// # Errors
    ///
    /// As [`Self::send`].
    pub async fn resize(&self, width: f64, height: f64, pixel_ratio: f64) -> Result<(), TransportError> {
        self.send(HostMessage::Resize { width, height, pixel_ratio }).await
    }

    /// Round-trip `data` through the renderer.
    ///
    /// # Errors
    ///
    /// As [`Self::send`], plus [`TransportError::Timeout`].
    pub async fn ping(&mut self, data: Value) -> Result<Value, TransportError> {
        match self.request(HostMessage::Ping { data }, |m| matches!(m, RendererMessage::Pong { .. })).await? {
            RendererMessage::Pong { data } => Ok(data),
            _ => Ok(Value::Null),
        }
    }

    /// # Errors
    ///
    /// As [`Self::ping`].
    pub async fn echo(&mut self, data: Value) -> Result<Value, TransportError> {
        match self.request(HostMessage::Echo { data }, |m| matches!(m, RendererMessage::EchoResponse { .. })).await? {
            RendererMessage::EchoResponse { data } => Ok(data),
            _ => Ok(Value::Null),
        }
    }

    /// Wait until the renderer has processed everything sent before this call
    /// and presented a frame.
    ///
    /// # Errors
    ///
    /// As [`Self::ping`].
    pub async fn flush(&mut self) -> Result<(), TransportError> {
        self.request(HostMessage::Flush, |m| matches!(m, RendererMessage::Flushed)).await?;
        Ok(())
    }

    /// Push asset descriptors and wait for `assets-acknowledged`.
    ///
    /// # Errors
    ///
    /// As [`Self::ping`].
    pub async fn set_game_assets(&mut self, assets: Option<GameAssets>) -> Result<(), TransportError> {
        self.request(HostMessage::SetGameAssets { assets }, |m| matches!(m, RendererMessage::AssetsAcknowledged))
            .await?;
        Ok(())
    }

    /// Whether an animation matching the filters is running. `None` matches any.
    ///
    /// # Errors
    ///
    /// As [`Self::ping`].
    pub async fn check_animation_state(
        &mut self,
        visual_id: Option<ObjectId>,
        kind: Option<AnimationKind>,
    ) -> Result<bool, TransportError> {
        let message = HostMessage::CheckAnimationState { visual_id, kind };
        match self.request(message, |m| matches!(m, RendererMessage::AnimationState { .. })).await? {
            RendererMessage::AnimationState { is_animating } => Ok(is_animating),
            _ => Ok(false),
        }
    }

    /// Next unsolicited message: backlog first, then the channel.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] once the renderer has shut down, or the
    /// protocol error for an undecodable message.
    pub async fn next_message(&mut self) -> Result<RendererMessage, TransportError> {
        if let Some(result) = self.backlog.pop_front() {
            return Ok(result?);
        }
        match self.receiver.recv().await {
            Some(result) => Ok(result?),
            None => Err(TransportError::Closed),
        }
    }

    /// Messages held back while waiting for replies.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    async fn request(
        &mut self,
        message: HostMessage,
        is_reply: impl Fn(&RendererMessage) -> bool,
    ) -> Result<RendererMessage, TransportError> {
        let message_type = message.type_name();
        self.send(message).await?;
        self.await_reply(message_type, is_reply).await
    }

    async fn await_reply(
        &mut self,
        message_type: &'static str,
        is_reply: impl Fn(&RendererMessage) -> bool,
    ) -> Result<RendererMessage, TransportError> {
        let timeout = self.request_timeout;
        let wait = async {
            loop {
                let Some(result) = self.receiver.recv().await else {
                    return Err(TransportError::Closed);
                };
                let message = match result {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, awaiting = message_type, "undecodable renderer message backlogged");
                        self.backlog.push_back(Err(e));
                        continue;
                    }
                };
                if is_reply(&message) {
                    return Ok(message);
                }
                if let RendererMessage::Error { message: reason, code, .. } = message {
                    warn!(awaiting = message_type, code = ?code, error = %reason, "renderer rejected request");
                    return Err(TransportError::Rejected { awaiting: message_type, code, message: reason });
                }
                debug!(message_type = message.type_name(), awaiting = message_type, "message backlogged");
                self.backlog.push_back(Ok(message));
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| TransportError::Timeout(message_type))?
    }
}
