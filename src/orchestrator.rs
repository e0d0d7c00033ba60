//! Render orchestrator: the renderer-side state machine.
//!
//! ARCHITECTURE
//! ============
//! The orchestrator owns everything on the renderer side of the transport:
//! the scene manager, one [`Visual`] per object, the camera, selection and
//! hover state, the active pointer gesture, running animations, and the
//! surface once it has been handed over. [`RenderOrchestrator::handle`] takes
//! one validated [`HostMessage`] and returns the replies to post; it never
//! awaits, so every message is applied to completion before the next.
//!
//! DESIGN
//! ======
//! - Per-object fault isolation: a render failure is logged with the object
//!   id and skipped. The rest of the batch (or regeneration) carries on.
//! - Zoom regeneration: strokes and labels are sized for the scale they were
//!   rendered at. When a zoom settles (debounced) more than
//!   `regen_zoom_delta` away from the last regeneration, visible objects
//!   re-render immediately and off-screen ones are marked stale. Stale
//!   visuals re-render when a later frame finds them on screen.
//! - Textures: render code only *requests* URLs. After each render the
//!   orchestrator starts the loads on the current runtime and remembers which
//!   objects asked; a [`TextureEvent`] re-renders exactly those objects.
//! - Drags move the visual only. The object's data changes when the host
//!   writes the `object-moved` result back through the document.

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::animation::{AnimationKind, Animator};
use crate::assets::GameAssets;
use crate::behavior::{BehaviorRegistry, RenderContext, RenderError, TextureHooks, ZoomAwareLabels};
use crate::camera::{Camera, Point};
use crate::config::EngineConfig;
use crate::consts::{DRAG_ALPHA, WHEEL_ZOOM_SENSITIVITY};
use crate::input::{Button, Gesture, InteractionMode, PointerEvent, WheelEvent, snap};
use crate::object::{ObjectId, Position, TableObject};
use crate::protocol::{AwarenessEntry, ErrorCode, HostMessage, ObjectEntry, ProtocolError, RendererMessage};
use crate::scene::SceneManager;
use crate::surface::{DrawItem, Frame, Surface};
use crate::texture::{Texture, TextureCache};
use crate::visual::{RenderFlags, Visual};

/// Completion of a texture load started by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureEvent {
    Ready(String),
    Failed(String),
}

impl TextureEvent {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Ready(url) | Self::Failed(url) => url,
        }
    }
}

/// [`TextureHooks`] over the shared cache that records requested URLs
/// instead of loading them inline.
struct CacheHooks<'a> {
    cache: &'a TextureCache,
    requested: RefCell<Vec<String>>,
}

impl<'a> CacheHooks<'a> {
    fn new(cache: &'a TextureCache) -> Self {
        Self { cache, requested: RefCell::new(Vec::new()) }
    }

    fn into_requested(self) -> Vec<String> {
        self.requested.into_inner()
    }
}

impl TextureHooks for CacheHooks<'_> {
    fn get(&self, url: &str) -> Option<Arc<Texture>> {
        self.cache.get(url)
    }

    fn has_failed(&self, url: &str) -> bool {
        self.cache.has_failed(url)
    }

    fn is_slow_loading(&self, url: &str) -> bool {
        self.cache.is_slow_loading(url)
    }

    fn request(&self, url: &str) {
        self.requested.borrow_mut().push(url.to_owned());
    }
}

/// Split off batch entries that fail their checks, with one `error` reply each.
fn admit(message_type: &'static str, objects: Vec<ObjectEntry>) -> (Vec<ObjectEntry>, Vec<RendererMessage>) {
    let mut replies = Vec::new();
    let admitted = objects
        .into_iter()
        .filter(|entry| match entry.validate(message_type) {
            Ok(()) => true,
            Err(e) => {
                warn!(object_id = %entry.id, error = %e, message_type, "object entry dropped");
                replies.push(RendererMessage::error_from(&e));
                false
            }
        })
        .collect();
    (admitted, replies)
}

pub struct RenderOrchestrator {
    config: EngineConfig,
    registry: Arc<BehaviorRegistry>,
    scene: SceneManager,
    textures: TextureCache,
    texture_events: mpsc::Sender<TextureEvent>,
    /// Object ids waiting on each URL.
    pending_textures: HashMap<String, HashSet<ObjectId>>,
    surface: Option<Surface>,
    pixel_ratio: f64,
    camera: Camera,
    last_regenerated_scale: f64,
    zoom_end_at: Option<Instant>,
    regenerations: u64,
    visuals: HashMap<ObjectId, Visual>,
    stale: HashSet<ObjectId>,
    selection: BTreeSet<ObjectId>,
    hovered: Option<ObjectId>,
    gesture: Gesture,
    mode: InteractionMode,
    grid_snap: bool,
    assets: Option<GameAssets>,
    remote: Vec<AwarenessEntry>,
    animator: Animator,
}

impl RenderOrchestrator {
    #[must_use]
    pub fn new(
        config: EngineConfig,
        registry: Arc<BehaviorRegistry>,
        textures: TextureCache,
        texture_events: mpsc::Sender<TextureEvent>,
    ) -> Self {
        let scene = SceneManager::new(Arc::clone(&registry));
        Self {
            config,
            registry,
            scene,
            textures,
            texture_events,
            pending_textures: HashMap::new(),
            surface: None,
            pixel_ratio: 1.0,
            camera: Camera::default(),
            last_regenerated_scale: 1.0,
            zoom_end_at: None,
            regenerations: 0,
            visuals: HashMap::new(),
            stale: HashSet::new(),
            selection: BTreeSet::new(),
            hovered: None,
            gesture: Gesture::Idle,
            mode: InteractionMode::default(),
            grid_snap: false,
            assets: None,
            remote: Vec::new(),
            animator: Animator::default(),
        }
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Apply one validated host message and return the replies to post.
    pub fn handle(&mut self, message: HostMessage, transfer: Option<Surface>) -> Vec<RendererMessage> {
        if transfer.is_some() && !matches!(message, HostMessage::Init { .. }) {
            error!(message_type = message.type_name(), "surface transferred outside init; dropped");
        }
        match message {
            HostMessage::Init { width, height, pixel_ratio } => self.on_init(width, height, pixel_ratio, transfer),
            HostMessage::Resize { width, height, pixel_ratio } => {
                self.on_resize(width, height, pixel_ratio);
                Vec::new()
            }
            HostMessage::ObjectsAdded { objects } => {
                let (objects, replies) = admit("objects-added", objects);
                self.apply_added(objects);
                replies
            }
            HostMessage::ObjectsUpdated { objects } => {
                let (objects, replies) = admit("objects-updated", objects);
                self.apply_updated(objects);
                replies
            }
            HostMessage::ObjectsRemoved { ids } => self.apply_removed(&ids),
            HostMessage::PointerDown { event } => self.on_pointer_down(&event),
            HostMessage::PointerMove { event } => {
                self.on_pointer_move(&event);
                Vec::new()
            }
            HostMessage::PointerUp { event } => self.on_pointer_up(&event),
            HostMessage::Wheel { event } => {
                self.on_wheel(&event);
                Vec::new()
            }
            HostMessage::SetInteractionMode { mode } => {
                debug!(?mode, "interaction mode set");
                self.mode = mode;
                Vec::new()
            }
            HostMessage::SetGridSnapEnabled { enabled } => {
                self.grid_snap = enabled;
                Vec::new()
            }
            HostMessage::SetGameAssets { assets } => {
                info!(assets = assets.as_ref().map_or("none", |a| a.name.as_str()), "game assets set");
                self.assets = assets;
                self.refresh();
                vec![RendererMessage::AssetsAcknowledged]
            }
            HostMessage::AwarenessUpdate { states } => {
                self.remote = states;
                Vec::new()
            }
            HostMessage::Flush => {
                self.compose_frame();
                vec![RendererMessage::Flushed]
            }
            HostMessage::CheckAnimationState { visual_id, kind } => {
                vec![RendererMessage::AnimationState { is_animating: self.is_animating(visual_id.as_deref(), kind) }]
            }
            HostMessage::Ping { data } => vec![RendererMessage::Pong { data }],
            HostMessage::Echo { data } => vec![RendererMessage::EchoResponse { data }],
        }
    }

    fn on_init(
        &mut self,
        width: f64,
        height: f64,
        pixel_ratio: f64,
        transfer: Option<Surface>,
    ) -> Vec<RendererMessage> {
        if let Some(existing) = &self.surface {
            error!(
                surface_id = %existing.id(),
                extra = transfer.is_some(),
                "init received after surface handoff; second surface dropped"
            );
            return Vec::new();
        }
        let Some(mut surface) = transfer else {
            let err = ProtocolError::Invalid { message_type: "init", reason: "no surface transferred".into() };
            warn!(error = %err, "init without surface");
            return vec![RendererMessage::error_from(&err)];
        };
        surface.resize(width, height, pixel_ratio);
        info!(surface_id = %surface.id(), width, height, pixel_ratio, "surface received");
        self.pixel_ratio = pixel_ratio;
        self.surface = Some(surface);
        vec![RendererMessage::Initialized]
    }

    fn on_resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        let Some(surface) = self.surface.as_mut() else {
            warn!("resize before init ignored");
            return;
        };
        surface.resize(width, height, pixel_ratio);
        if (pixel_ratio - self.pixel_ratio).abs() > f64::EPSILON {
            self.pixel_ratio = pixel_ratio;
            self.refresh();
        }
    }

    // =========================================================================
    // DIFFS
    // =========================================================================

    fn apply_added(&mut self, objects: Vec<ObjectEntry>) {
        let count = objects.len();
        for ObjectEntry { id, object } in objects {
            if let Err(e) = self.scene.add_object(&id, object) {
                warn!(object_id = %id, error = %e, code = e.error_code(), "object not added");
                continue;
            }
            self.render_logged(&id);
        }
        debug!(count, total = self.scene.len(), "objects added");
    }

    fn apply_updated(&mut self, objects: Vec<ObjectEntry>) {
        for ObjectEntry { id, object } in objects {
            let transition =
                self.scene.get(&id).and_then(|before| self.registry.transition(before, &object));
            if let Err(e) = self.scene.update_object(&id, object) {
                warn!(object_id = %id, error = %e, code = e.error_code(), "object not updated");
                continue;
            }
            self.render_logged(&id);
            if let Some(kind) = transition {
                self.animator.start(&id, kind, self.visuals.contains_key(&id));
            }
        }
    }

    fn apply_removed(&mut self, ids: &[ObjectId]) -> Vec<RendererMessage> {
        let before = self.selection.clone();
        for id in ids {
            self.scene.remove_object(id);
            self.visuals.remove(id);
            self.stale.remove(id);
            self.animator.cancel(id);
            self.selection.remove(id);
            if self.hovered.as_deref() == Some(id.as_str()) {
                self.hovered = None;
            }
            if self.gesture.dragged_id() == Some(id.as_str()) {
                debug!(object_id = %id, "dragged object removed; drag cancelled");
                self.gesture = Gesture::Idle;
            }
            for waiting in self.pending_textures.values_mut() {
                waiting.remove(id);
            }
        }
        self.selection_changed(&before)
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    fn flags_for(&self, id: &str, object: &TableObject) -> RenderFlags {
        let selected = self.selection.contains(id);
        RenderFlags {
            selected,
            hovered: self.hovered.as_deref() == Some(id),
            dragging: self.gesture.dragged_id() == Some(id),
            remote_selected: !selected && object.selected_by.is_some(),
        }
    }

    /// Render `object` under `id` without touching orchestrator state.
    /// Returns the visual and the URLs it asked for.
    fn draw(&self, id: &str, object: &TableObject, minimal: bool) -> (Result<Visual, RenderError>, Vec<String>) {
        let hooks = CacheHooks::new(&self.textures);
        let labels = ZoomAwareLabels::new(self.camera.zoom, self.pixel_ratio);
        let ctx = RenderContext {
            object_id: id,
            flags: if minimal { RenderFlags::default() } else { self.flags_for(id, object) },
            minimal,
            camera_scale: self.camera.zoom,
            pixel_ratio: self.pixel_ratio,
            assets: self.assets.as_ref(),
            textures: &hooks,
            labels: &labels,
        };
        let result = self.registry.render(object, &ctx);
        (result, hooks.into_requested())
    }

    /// Re-render the visual for `id` from its current object.
    ///
    /// # Errors
    ///
    /// Returns the behavior's [`RenderError`]; the previous visual is kept.
    fn render(&mut self, id: &str) -> Result<(), RenderError> {
        let Some(object) = self.scene.get(id) else {
            return Ok(());
        };
        let (result, requested) = self.draw(id, object, false);
        self.request_textures(id, requested);
        let mut visual = result?;
        if let Gesture::Dragging { id: dragged, current, .. } = &self.gesture {
            if dragged == id {
                visual.x = current.x;
                visual.y = current.y;
            }
        }
        self.visuals.insert(id.to_owned(), visual);
        self.stale.remove(id);
        Ok(())
    }

    fn render_logged(&mut self, id: &str) -> bool {
        match self.render(id) {
            Ok(()) => true,
            Err(e) => {
                warn!(object_id = %id, error = %e, code = e.error_code(), "render failed; object skipped");
                false
            }
        }
    }

    fn request_textures(&mut self, id: &str, urls: Vec<String>) {
        for url in urls {
            let waiting = self.pending_textures.entry(url.clone()).or_default();
            let first = waiting.is_empty();
            waiting.insert(id.to_owned());
            if first {
                self.spawn_load(url);
            }
        }
    }

    fn spawn_load(&self, url: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(url, "no async runtime; texture load not started");
            return;
        };
        let cache = self.textures.clone();
        let events = self.texture_events.clone();
        runtime.spawn(async move {
            let loaded = cache.load(&url).await;
            let event = match loaded {
                Ok(_) => TextureEvent::Ready(url),
                Err(_) => TextureEvent::Failed(url),
            };
            if events.send(event).await.is_err() {
                debug!("renderer stopped; texture event dropped");
            }
        });
    }

    /// Re-render every object that was waiting on the event's URL. Returns
    /// how many re-rendered successfully.
    pub fn on_texture_event(&mut self, event: &TextureEvent) -> usize {
        let Some(waiting) = self.pending_textures.remove(event.url()) else {
            return 0;
        };
        let mut rendered = 0;
        for id in waiting {
            if self.render_logged(&id) {
                rendered += 1;
            }
        }
        debug!(url = event.url(), rendered, ready = matches!(event, TextureEvent::Ready(_)), "texture settled");
        rendered
    }

    /// Objects whose bounds intersect the viewport. Everything when there is
    /// no surface yet.
    fn visible_ids(&self) -> HashSet<ObjectId> {
        match &self.surface {
            Some(surface) => {
                let region = self.camera.visible_bounds(surface.width(), surface.height());
                self.scene.hit_test_region(&region).into_iter().collect()
            }
            None => self.scene.ids_in_draw_order().into_iter().collect(),
        }
    }

    /// Re-render visible objects now and mark the rest stale.
    fn refresh(&mut self) {
        let visible = self.visible_ids();
        let (mut rendered, mut failed) = (0_usize, 0_usize);
        for id in self.scene.ids_in_draw_order() {
            if !visible.contains(&id) {
                self.stale.insert(id);
                continue;
            }
            if self.render_logged(&id) {
                rendered += 1;
            } else {
                failed += 1;
            }
        }
        debug!(rendered, failed, stale = self.stale.len(), "visuals refreshed");
    }

    // =========================================================================
    // CAMERA
    // =========================================================================

    fn on_wheel(&mut self, event: &WheelEvent) {
        let factor = (-event.delta_y * WHEEL_ZOOM_SENSITIVITY).exp();
        self.zoom_to(event.screen(), self.camera.zoom * factor);
    }

    /// Zoom around a screen anchor and (re)arm the zoom-end debounce.
    pub fn zoom_to(&mut self, anchor: Point, zoom: f64) {
        self.camera.zoom_at(anchor, zoom);
        self.zoom_end_at = Some(Instant::now() + self.config.zoom_end_debounce);
    }

    /// When the pending zoom-end fires, if any.
    #[must_use]
    pub fn zoom_end_deadline(&self) -> Option<Instant> {
        self.zoom_end_at
    }

    /// Settle a zoom. Regenerates when the scale has moved more than the
    /// threshold since the last regeneration; returns whether it did.
    pub fn on_zoom_end(&mut self) -> bool {
        self.zoom_end_at = None;
        let scale = self.camera.zoom;
        let delta = (scale - self.last_regenerated_scale).abs();
        if delta <= self.config.regen_zoom_delta {
            debug!(scale, delta, "zoom settled; below regeneration threshold");
            return false;
        }
        self.last_regenerated_scale = scale;
        self.regenerations += 1;
        self.refresh();
        info!(scale, regenerations = self.regenerations, "scene regenerated for zoom");
        true
    }

    // =========================================================================
    // INTERACTION
    // =========================================================================

    fn on_pointer_down(&mut self, event: &PointerEvent) -> Vec<RendererMessage> {
        let screen = event.screen();
        if self.mode == InteractionMode::Pan || event.button == Button::Middle {
            self.gesture = Gesture::Panning { last_screen: screen };
            return Vec::new();
        }
        if event.button != Button::Primary {
            return Vec::new();
        }

        let world = self.camera.screen_to_world(screen);
        let hit = self.scene.hit_test(world.x, world.y);
        let before = self.selection.clone();
        let toggle = event.modifiers.toggles_selection();
        match &hit {
            Some(id) if toggle => {
                if !self.selection.remove(id) {
                    self.selection.insert(id.clone());
                }
            }
            Some(id) => {
                if !self.selection.contains(id) {
                    self.selection.clear();
                    self.selection.insert(id.clone());
                }
            }
            None if toggle => {}
            None => self.selection.clear(),
        }

        if let Some(id) = hit.filter(|id| self.selection.contains(id)) {
            let origin = match self.scene.get(&id) {
                Some(object) if object.locked => {
                    debug!(object_id = %id, "locked object selected; not dragging");
                    None
                }
                Some(object) => Some(object.position.point()),
                None => None,
            };
            if let Some(origin) = origin {
                let grab_offset = Point::new(origin.x - world.x, origin.y - world.y);
                self.gesture = Gesture::Dragging { id: id.clone(), grab_offset, origin, current: origin };
                self.render_logged(&id);
            }
        }
        self.selection_changed(&before)
    }

    fn on_pointer_move(&mut self, event: &PointerEvent) {
        let screen = event.screen();
        let world = self.camera.screen_to_world(screen);
        match self.gesture.clone() {
            Gesture::Panning { last_screen } => {
                self.camera.pan_by(screen.x - last_screen.x, screen.y - last_screen.y);
                self.gesture = Gesture::Panning { last_screen: screen };
            }
            Gesture::Dragging { id, grab_offset, origin, .. } => {
                let current = Point::new(world.x + grab_offset.x, world.y + grab_offset.y);
                if let Some(visual) = self.visuals.get_mut(&id) {
                    visual.x = current.x;
                    visual.y = current.y;
                }
                self.gesture = Gesture::Dragging { id, grab_offset, origin, current };
            }
            Gesture::Idle => {
                let hit = self.scene.hit_test(world.x, world.y);
                if hit != self.hovered {
                    let previous = std::mem::replace(&mut self.hovered, hit.clone());
                    for id in previous.iter().chain(hit.iter()) {
                        self.render_logged(id);
                    }
                }
            }
        }
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent) -> Vec<RendererMessage> {
        let Gesture::Dragging { id, origin, current, .. } = std::mem::take(&mut self.gesture) else {
            return Vec::new();
        };
        let target = if self.grid_snap {
            Point::new(snap(current.x, self.config.grid_size), snap(current.y, self.config.grid_size))
        } else {
            current
        };
        let Some(rotation) = self.scene.get(&id).map(|o| o.position.rotation) else {
            return Vec::new();
        };
        self.render_logged(&id);
        if let Some(visual) = self.visuals.get_mut(&id) {
            visual.x = target.x;
            visual.y = target.y;
        }
        if target == origin {
            return Vec::new();
        }
        debug!(object_id = %id, x = target.x, y = target.y, "drag finished");
        vec![RendererMessage::ObjectMoved { id, position: Position { x: target.x, y: target.y, rotation } }]
    }

    /// Re-render objects whose selection flipped and report the new selection.
    fn selection_changed(&mut self, before: &BTreeSet<ObjectId>) -> Vec<RendererMessage> {
        if *before == self.selection {
            return Vec::new();
        }
        let flipped: Vec<ObjectId> = before.symmetric_difference(&self.selection).cloned().collect();
        for id in &flipped {
            self.render_logged(id);
        }
        vec![RendererMessage::SelectionChanged { ids: self.selection.iter().cloned().collect() }]
    }

    // =========================================================================
    // FRAMES
    // =========================================================================

    /// Tick animations, refresh stale visible visuals, and present a frame.
    /// Returns `false` when there is no surface to present to.
    pub fn compose_frame(&mut self) -> bool {
        for id in self.animator.tick() {
            debug!(object_id = %id, "animation finished");
        }
        if self.surface.is_none() {
            debug!("no surface; frame skipped");
            return false;
        }

        let visible = self.visible_ids();
        let stale: Vec<ObjectId> = self.stale.iter().filter(|id| visible.contains(*id)).cloned().collect();
        for id in stale {
            self.render_logged(&id);
        }

        let dragged = self.gesture.dragged_id().map(str::to_owned);
        let on_screen = |id: &ObjectId| visible.contains(id) || dragged.as_ref() == Some(id);
        let order: Vec<ObjectId> = self.scene.ids_in_draw_order().into_iter().filter(|id| on_screen(id)).collect();
        let mut items = Vec::with_capacity(order.len());

        for id in &order {
            if !self.selection.contains(id) && dragged.as_ref() != Some(id) {
                continue;
            }
            let (Some(object), Some(visual)) = (self.scene.get(id), self.visuals.get(id)) else {
                continue;
            };
            if let Ok(shadow) = self.registry.shadow(object) {
                items.push(DrawItem::Shadow { object_id: id.clone(), x: visual.x, y: visual.y, shadow });
            }
        }

        // The dragged visual is painted last so it stays above whatever it passes over.
        for id in order.iter().filter(|id| dragged.as_ref() != Some(*id)).chain(dragged.iter()) {
            if let Some(visual) = self.visuals.get(id) {
                items.push(DrawItem::Visual { visual: visual.clone(), animation: self.animator.progress(id) });
            }
        }

        let mut requested = Vec::new();
        for entry in &self.remote {
            if let Some(drag) = &entry.state.drag {
                if let Some(object) = self.scene.get(&drag.id) {
                    let mut ghost = object.clone();
                    ghost.position.x = drag.x;
                    ghost.position.y = drag.y;
                    let (result, urls) = self.draw(&drag.id, &ghost, true);
                    requested.extend(urls.into_iter().map(|url| (drag.id.clone(), url)));
                    match result {
                        Ok(mut visual) => {
                            visual.alpha = DRAG_ALPHA;
                            items.push(DrawItem::Ghost { actor_id: entry.actor_id.clone(), visual });
                        }
                        Err(e) => debug!(object_id = %drag.id, error = %e, "ghost render failed"),
                    }
                }
            }
            if let Some(cursor) = entry.state.cursor {
                items.push(DrawItem::Cursor { actor_id: entry.actor_id.clone(), x: cursor.x, y: cursor.y });
            }
        }
        for (id, url) in requested {
            self.request_textures(&id, vec![url]);
        }

        let frame = Frame { camera: self.camera, items };
        match self.surface.as_mut() {
            Some(surface) => {
                surface.present(frame);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Whether any animation matching the filters is running. `None` matches any.
    pub fn is_animating(&mut self, id: Option<&str>, kind: Option<AnimationKind>) -> bool {
        self.animator.tick();
        self.animator.is_animating(id, kind)
    }

    #[must_use]
    pub fn scene(&self) -> &SceneManager {
        &self.scene
    }

    #[must_use]
    pub fn visual(&self, id: &str) -> Option<&Visual> {
        self.visuals.get(id)
    }

    #[must_use]
    pub fn is_stale(&self, id: &str) -> bool {
        self.stale.contains(id)
    }

    #[must_use]
    pub fn selection(&self) -> Vec<ObjectId> {
        self.selection.iter().cloned().collect()
    }

    #[must_use]
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Number of zoom regenerations so far.
    #[must_use]
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    /// Frames presented to the surface; zero before init.
    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.surface.as_ref().map_or(0, Surface::frames_presented)
    }

    /// URLs with at least one object waiting on them.
    #[must_use]
    pub fn pending_texture_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.pending_textures.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }

    #[must_use]
    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }
}
