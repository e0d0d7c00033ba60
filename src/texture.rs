//! Texture cache: async, deduplicating loader for bitmap resources keyed by URL.
//!
//! DESIGN
//! ======
//! A load runs a three-stage pipeline: fetch bytes ([`TextureFetcher`]),
//! decode pixels ([`TextureDecoder`]), create a device resource
//! ([`TextureDevice`]). Concurrent loads for the same URL share one
//! `futures::future::Shared` future, so N callers cause exactly one fetch and
//! all receive the same `Arc<Texture>`.
//!
//! Render code never awaits: it uses the synchronous lookups (`get`,
//! `has_failed`, `is_slow_loading`) and asks the orchestrator to start or
//! join a load when a texture is missing.
//!
//! ERROR HANDLING
//! ==============
//! A failure at any stage marks the URL failed. The flag is sticky until the
//! next `load` for that URL succeeds (or `clear` is called), so broken
//! resources show a fallback without retry storms. Loads have no timeout;
//! `is_slow_loading` lets callers show a fallback while the fetch continues.
//! `clear` bumps an epoch; a load that finishes under an older epoch releases
//! its resource and reports [`TextureError::Discarded`].

#[cfg(test)]
#[path = "texture_test.rs"]
mod texture_test;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::protocol::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

/// Pipeline stage at which a load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Fetch,
    Decode,
    Upload,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Decode => "decode",
            Self::Upload => "upload",
        })
    }
}

/// A texture load failure. `Clone` so one shared load can fan it out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("decode failed for {url}: {message}")]
    Decode { url: String, message: String },
    #[error("resource creation failed for {url}: {message}")]
    Upload { url: String, message: String },
    /// The cache was cleared while the load ran; its resource was released.
    #[error("load for {url} discarded by cache clear")]
    Discarded { url: String },
}

impl TextureError {
    #[must_use]
    pub fn stage(&self) -> LoadStage {
        match self {
            Self::Fetch { .. } => LoadStage::Fetch,
            Self::Decode { .. } => LoadStage::Decode,
            Self::Upload { .. } | Self::Discarded { .. } => LoadStage::Upload,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch { url, .. }
            | Self::Decode { url, .. }
            | Self::Upload { url, .. }
            | Self::Discarded { url } => url,
        }
    }
}

impl ErrorCode for TextureError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "E_TEXTURE_FETCH",
            Self::Decode { .. } => "E_TEXTURE_DECODE",
            Self::Upload { .. } => "E_TEXTURE_UPLOAD",
            Self::Discarded { .. } => "E_TEXTURE_DISCARDED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Discarded { .. })
    }
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Opaque handle to a device-side texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// A ready, device-uploaded texture.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub handle: TextureHandle,
}

// =============================================================================
// PIPELINE STAGES
// =============================================================================

/// Fetches raw bytes for a URL.
#[async_trait]
pub trait TextureFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TextureError>;
}

/// Decodes fetched bytes into pixels.
pub trait TextureDecoder: Send + Sync {
    fn decode(&self, url: &str, bytes: &[u8]) -> Result<DecodedImage, TextureError>;
}

/// Creates and releases device resources.
pub trait TextureDevice: Send + Sync {
    fn create(&self, url: &str, image: &DecodedImage) -> Result<TextureHandle, TextureError>;
    fn destroy(&self, handle: TextureHandle);
}

/// The three stages bundled together.
#[derive(Clone)]
pub struct TexturePipeline {
    pub fetcher: Arc<dyn TextureFetcher>,
    pub decoder: Arc<dyn TextureDecoder>,
    pub device: Arc<dyn TextureDevice>,
}

impl TexturePipeline {
    /// HTTP(S) and `file://` fetching, `image` crate decoding, software device.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            fetcher: Arc::new(HttpFetcher::new()),
            decoder: Arc::new(ImageDecoder),
            device: Arc::new(SoftwareDevice::default()),
        }
    }

    async fn run(&self, url: &str) -> Result<Texture, TextureError> {
        let bytes = self.fetcher.fetch(url).await?;
        let image = self.decoder.decode(url, &bytes)?;
        let handle = self.device.create(url, &image)?;
        Ok(Texture { url: url.to_owned(), width: image.width, height: image.height, handle })
    }
}

/// Fetches `http(s)://` URLs with `reqwest` and `file://` URLs from disk.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextureFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TextureError> {
        let fail = |message: String| TextureError::Fetch { url: url.to_owned(), message };

        if let Some(path) = url.strip_prefix("file://") {
            return tokio::fs::read(path).await.map_err(|e| fail(e.to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("http status {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Decodes PNG, JPEG and WebP with the `image` crate.
pub struct ImageDecoder;

impl TextureDecoder for ImageDecoder {
    fn decode(&self, url: &str, bytes: &[u8]) -> Result<DecodedImage, TextureError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| TextureError::Decode { url: url.to_owned(), message: e.to_string() })?
            .to_rgba8();
        Ok(DecodedImage { width: image.width(), height: image.height(), rgba: image.into_raw() })
    }
}

/// In-process device that hands out sequential handles and tracks live resources.
#[derive(Default)]
pub struct SoftwareDevice {
    next: AtomicU64,
    live: Mutex<HashSet<TextureHandle>>,
}

impl SoftwareDevice {
    /// Number of resources created and not yet destroyed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.lock().map_or(0, |live| live.len())
    }
}

impl TextureDevice for SoftwareDevice {
    fn create(&self, url: &str, image: &DecodedImage) -> Result<TextureHandle, TextureError> {
        if image.width == 0 || image.height == 0 {
            return Err(TextureError::Upload { url: url.to_owned(), message: "zero-sized image".into() });
        }
        let handle = TextureHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        if let Ok(mut live) = self.live.lock() {
            live.insert(handle);
        }
        Ok(handle)
    }

    fn destroy(&self, handle: TextureHandle) {
        if let Ok(mut live) = self.live.lock() {
            if !live.remove(&handle) {
                warn!(handle = handle.0, "texture destroyed twice or never created");
            }
        }
    }
}

// =============================================================================
// CACHE
// =============================================================================

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Texture>, TextureError>>>;

#[derive(Default)]
struct CacheState {
    /// Bumped by `clear`; a load only records its result under the epoch it started in.
    epoch: u64,
    ready: HashMap<String, Arc<Texture>>,
    in_flight: HashMap<String, SharedLoad>,
    started: HashMap<String, Instant>,
    failed: HashSet<String>,
}

/// Async, deduplicating, failure-tracking texture cache. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct TextureCache {
    state: Arc<Mutex<CacheState>>,
    pipeline: TexturePipeline,
    slow_threshold: Duration,
}

impl TextureCache {
    #[must_use]
    pub fn new(pipeline: TexturePipeline, slow_threshold: Duration) -> Self {
        Self { state: Arc::new(Mutex::new(CacheState::default())), pipeline, slow_threshold }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A poisoned lock only means a panic elsewhere; the maps are still consistent.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Load `url`, returning the cached texture, joining an in-flight load, or
    /// starting a new one.
    ///
    /// # Errors
    ///
    /// Returns the stage-tagged [`TextureError`] if any pipeline stage fails.
    pub async fn load(&self, url: &str) -> Result<Arc<Texture>, TextureError> {
        let shared = {
            let mut state = self.lock();
            if let Some(texture) = state.ready.get(url) {
                return Ok(Arc::clone(texture));
            }
            if let Some(load) = state.in_flight.get(url) {
                debug!(url, "texture load joined in-flight request");
                load.clone()
            } else {
                let load = self.start_load(url, state.epoch);
                state.started.insert(url.to_owned(), Instant::now());
                state.in_flight.insert(url.to_owned(), load.clone());
                load
            }
        };
        shared.await
    }

    fn start_load(&self, url: &str, epoch: u64) -> SharedLoad {
        let pipeline = self.pipeline.clone();
        let state = Arc::clone(&self.state);
        let url = url.to_owned();
        async move {
            let result = pipeline.run(&url).await.map(Arc::new);
            let mut state = state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if state.epoch != epoch {
                drop(state);
                debug!(url, epoch, "texture load finished after clear; result discarded");
                return result.and_then(|texture| {
                    pipeline.device.destroy(texture.handle);
                    Err(TextureError::Discarded { url })
                });
            }
            state.in_flight.remove(&url);
            let elapsed_ms = state
                .started
                .remove(&url)
                .map_or(0, |t| t.elapsed().as_millis());
            match &result {
                Ok(texture) => {
                    state.failed.remove(&url);
                    state.ready.insert(url.clone(), Arc::clone(texture));
                    info!(url, width = texture.width, height = texture.height, elapsed_ms, "texture loaded");
                }
                Err(e) => {
                    state.failed.insert(url.clone());
                    warn!(url, stage = %e.stage(), error = %e, "texture load failed");
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Synchronous lookup for use during render.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Arc<Texture>> {
        self.lock().ready.get(url).cloned()
    }

    #[must_use]
    pub fn has(&self, url: &str) -> bool {
        self.lock().ready.contains_key(url)
    }

    #[must_use]
    pub fn has_failed(&self, url: &str) -> bool {
        self.lock().failed.contains(url)
    }

    /// Whether a load for `url` is currently running.
    #[must_use]
    pub fn is_loading(&self, url: &str) -> bool {
        self.lock().in_flight.contains_key(url)
    }

    /// Whether an in-flight load has been running longer than the slow threshold.
    #[must_use]
    pub fn is_slow_loading(&self, url: &str) -> bool {
        self.lock()
            .started
            .get(url)
            .is_some_and(|t| t.elapsed() > self.slow_threshold)
    }

    /// Whether a placeholder should be drawn instead of waiting.
    #[must_use]
    pub fn should_show_fallback(&self, url: &str) -> bool {
        self.has_failed(url) || self.is_slow_loading(url)
    }

    /// Number of ready textures.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().ready.len()
    }

    /// Release every cached resource and reset all tracking state. Loads
    /// still running release their own resource when they finish.
    pub fn clear(&self) {
        let released: Vec<Arc<Texture>> = {
            let mut state = self.lock();
            state.epoch += 1;
            state.in_flight.clear();
            state.started.clear();
            state.failed.clear();
            state.ready.drain().map(|(_, t)| t).collect()
        };
        let count = released.len();
        for texture in released {
            self.pipeline.device.destroy(texture.handle);
        }
        info!(count, "texture cache cleared");
    }
}
