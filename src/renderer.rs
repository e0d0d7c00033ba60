//! Renderer execution context.
//!
//! DESIGN
//! ======
//! [`run_renderer`] is the renderer's whole life: a `select!` loop over host
//! messages, texture completions, the zoom-end debounce and the frame clock.
//! Messages are handled strictly in arrival order and each one runs to
//! completion before the next is read.
//!
//! [`spawn_renderer`] wires the channel pair, texture cache and orchestrator
//! together and starts the loop in the configured context: a task on the
//! caller's runtime (co-located) or a dedicated thread with its own
//! single-threaded runtime (isolated).

#[cfg(test)]
#[path = "renderer_test.rs"]
mod renderer_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::behavior::BehaviorRegistry;
use crate::config::EngineConfig;
use crate::host::RendererClient;
use crate::orchestrator::{RenderOrchestrator, TextureEvent};
use crate::protocol::{ErrorCode, RendererMessage};
use crate::texture::{TextureCache, TexturePipeline};
use crate::transport::{Inbound, RendererEndpoint, TransportError, TransportMode, channel};

const TEXTURE_EVENT_CAPACITY: usize = 256;
const RENDERER_THREAD_NAME: &str = "tablescene-renderer";

/// Counters reported when the renderer loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub messages: u64,
    pub rejected: u64,
    /// Frames presented to the surface, from ticks and flushes alike.
    pub frames: u64,
}

/// Run the renderer until the host side of the channel closes.
pub async fn run_renderer(
    mut endpoint: RendererEndpoint,
    mut orchestrator: RenderOrchestrator,
    mut textures: mpsc::Receiver<TextureEvent>,
    frame_interval: Duration,
) -> RendererStats {
    let mut frames = tokio::time::interval_at(Instant::now() + frame_interval, frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats = RendererStats::default();
    let mut dirty = true;

    info!(mode = %endpoint.mode(), "renderer started");
    'run: loop {
        let zoom_end = orchestrator.zoom_end_deadline();
        tokio::select! {
            inbound = endpoint.recv() => {
                let Some(Inbound { message, transfer }) = inbound else { break };
                let replies = match message {
                    Ok(message) => {
                        stats.messages += 1;
                        debug!(message_type = message.type_name(), "host message");
                        orchestrator.handle(message, transfer)
                    }
                    Err(e) => {
                        stats.rejected += 1;
                        warn!(error = %e, code = e.error_code(), "rejected host message");
                        vec![RendererMessage::error_from(&e)]
                    }
                };
                dirty = true;
                for reply in replies {
                    if endpoint.post(reply).await.is_err() {
                        break 'run;
                    }
                }
            }
            Some(event) = textures.recv() => {
                if orchestrator.on_texture_event(&event) > 0 {
                    dirty = true;
                }
            }
            () = tokio::time::sleep_until(zoom_end.unwrap_or_else(Instant::now)), if zoom_end.is_some() => {
                if orchestrator.on_zoom_end() {
                    dirty = true;
                }
            }
            _ = frames.tick() => {
                if (dirty || orchestrator.is_animating(None, None)) && orchestrator.compose_frame() {
                    dirty = false;
                }
            }
        }
    }
    stats.frames = orchestrator.frames_presented();
    info!(messages = stats.messages, rejected = stats.rejected, frames = stats.frames, "renderer stopped");
    stats
}

/// Where the renderer loop is running.
#[derive(Debug)]
pub enum RendererHandle {
    Task(tokio::task::JoinHandle<RendererStats>),
    Thread(std::thread::JoinHandle<RendererStats>),
}

impl RendererHandle {
    /// Wait for the loop to finish. It finishes once every host sender is dropped.
    ///
    /// # Errors
    ///
    /// [`TransportError::Spawn`] if the renderer panicked.
    pub async fn join(self) -> Result<RendererStats, TransportError> {
        match self {
            Self::Task(task) => task.await.map_err(|e| TransportError::Spawn(e.to_string())),
            Self::Thread(thread) => match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(stats)) => Ok(stats),
                Ok(Err(_)) => Err(TransportError::Spawn("renderer thread panicked".into())),
                Err(e) => Err(TransportError::Spawn(e.to_string())),
            },
        }
    }
}

/// Start a renderer in the context `config.transport` selects and return the
/// host-side client for it. The client still needs [`RendererClient::init`].
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// [`TransportError::Spawn`] if the renderer thread cannot be started.
pub fn spawn_renderer(
    config: &EngineConfig,
    registry: Arc<BehaviorRegistry>,
    pipeline: TexturePipeline,
) -> Result<(RendererClient, RendererHandle), TransportError> {
    let (sender, receiver, endpoint) = channel(config.transport, config.channel_capacity);
    let (texture_tx, texture_rx) = mpsc::channel(TEXTURE_EVENT_CAPACITY);
    let cache = TextureCache::new(pipeline, config.slow_load);
    let orchestrator = RenderOrchestrator::new(config.clone(), registry, cache, texture_tx);
    let frame_interval = config.frame_interval;

    let handle = match config.transport {
        TransportMode::CoLocated => {
            RendererHandle::Task(tokio::spawn(run_renderer(endpoint, orchestrator, texture_rx, frame_interval)))
        }
        TransportMode::Isolated => {
            let thread = std::thread::Builder::new()
                .name(RENDERER_THREAD_NAME.into())
                .spawn(move || {
                    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                        Ok(runtime) => runtime,
                        Err(e) => {
                            error!(error = %e, "renderer runtime failed to start");
                            return RendererStats::default();
                        }
                    };
                    runtime.block_on(run_renderer(endpoint, orchestrator, texture_rx, frame_interval))
                })
                .map_err(|e| TransportError::Spawn(e.to_string()))?;
            RendererHandle::Thread(thread)
        }
    };
    info!(mode = %config.transport, "renderer spawned");
    Ok((RendererClient::new(sender, receiver, config.request_timeout), handle))
}
