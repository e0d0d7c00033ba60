//! Object behavior registry: per-kind render, bounds, shadow and capabilities.
//!
//! DESIGN
//! ======
//! Every kind-specific decision lives behind the [`Behavior`] trait, one
//! implementation per submodule. [`BehaviorRegistry::with_defaults`] is the
//! only place that names kinds; the scene manager and orchestrator resolve a
//! behavior through the registry and never branch on `kind` themselves.
//!
//! Rendering is synchronous and pure: a behavior reads the object and the
//! [`RenderContext`] and returns a [`Visual`]. Textures are looked up through
//! [`TextureHooks`]; a missing texture yields a placeholder and a load request,
//! never a wait.
//!
//! Stroke widths are divided by `sqrt(scale)` so outlines grow on screen with
//! the square root of the zoom instead of linearly.


mod counter;
mod dice;
mod mat;
mod stack;
mod token;
mod zone;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::animation::AnimationKind;
use crate::assets::GameAssets;
use crate::camera::Bounds;
use crate::consts::{
    BORDER_COLOR, BORDER_STROKE, DRAG_ALPHA, HOVER_COLOR, HOVER_STROKE, LABEL_COLOR, LABEL_FONT_SIZE,
    MAX_TEXT_RESOLUTION, MIN_STROKE_SCALE, OUTLINE_GAP, PLACEHOLDER_COLOR, REMOTE_SELECTION_COLOR, SELECTION_COLOR,
    SELECTION_STROKE,
};
use crate::object::{ObjectKind, TableObject};
use crate::protocol::ErrorCode;
use crate::texture::Texture;
use crate::visual::{Color, RenderFlags, Stroke, TextLabel, Visual, VisualNode};

pub use counter::CounterBehavior;
pub use dice::DiceBehavior;
pub use mat::MatBehavior;
pub use stack::StackBehavior;
pub use token::TokenBehavior;
pub use zone::ZoneBehavior;

// =============================================================================
// CONTRACT
// =============================================================================

/// Operations an object of this kind supports. Consumed by the host's action
/// layer; the engine only reports them.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub can_flip: bool,
    pub can_rotate: bool,
    pub can_stack: bool,
    pub can_unstack: bool,
    pub can_lock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowShape {
    Rect,
    Circle,
}

/// Geometry for the shadow / selection-glow pass, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConfig {
    pub width: f64,
    pub height: f64,
    pub shape: ShadowShape,
    pub corner_radius: f64,
}

impl ShadowConfig {
    #[must_use]
    pub fn rect(width: f64, height: f64, corner_radius: f64) -> Self {
        Self { width, height, shape: ShadowShape::Rect, corner_radius }
    }

    #[must_use]
    pub fn circle(diameter: f64) -> Self {
        Self { width: diameter, height: diameter, shape: ShadowShape::Circle, corner_radius: diameter * 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("no behavior registered for kind {0}")]
    UnknownKind(ObjectKind),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ErrorCode for RenderError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownKind(_) => "E_UNKNOWN_KIND",
            Self::InvalidField { .. } => "E_INVALID_FIELD",
        }
    }
}

/// Render, bounds, shadow and capabilities for one object kind.
pub trait Behavior: Send + Sync {
    /// Produce the visual for `object`. Must not mutate anything.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidField`] when a kind-specific field is malformed.
    fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError>;

    /// Axis-aligned world bounds. Pure function of kind, position and meta.
    fn bounds(&self, object: &TableObject) -> Bounds;

    fn shadow(&self, object: &TableObject) -> ShadowConfig;

    fn capabilities(&self) -> Capabilities;

    /// Animation an update from `before` to `after` should start, if any.
    fn transition(&self, before: &TableObject, after: &TableObject) -> Option<AnimationKind> {
        moved(before, after).then_some(AnimationKind::Move)
    }
}

/// Whether the position changed between two snapshots.
#[must_use]
pub fn moved(before: &TableObject, after: &TableObject) -> bool {
    before.position != after.position
}

// =============================================================================
// RENDER CONTEXT
// =============================================================================

/// Synchronous texture access for render code.
pub trait TextureHooks {
    fn get(&self, url: &str) -> Option<Arc<Texture>>;
    fn has_failed(&self, url: &str) -> bool;
    fn is_slow_loading(&self, url: &str) -> bool;
    /// Ask for `url` to be loaded, or join a running load. The caller
    /// re-renders when it settles.
    fn request(&self, url: &str);
}

/// Creates text labels sized for the current zoom.
pub trait LabelFactory {
    fn label(&self, text: &str, x: f64, y: f64, font_size: f64, color: u32) -> TextLabel;
}

/// Labels rasterized at `scale * pixel_ratio`, clamped to `[1, MAX_TEXT_RESOLUTION]`.
#[derive(Debug, Clone, Copy)]
pub struct ZoomAwareLabels {
    resolution: f64,
}

impl ZoomAwareLabels {
    #[must_use]
    pub fn new(camera_scale: f64, pixel_ratio: f64) -> Self {
        let resolution = camera_scale * pixel_ratio;
        let resolution = if resolution.is_finite() { resolution.clamp(1.0, MAX_TEXT_RESOLUTION) } else { 1.0 };
        Self { resolution }
    }

    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }
}

impl LabelFactory for ZoomAwareLabels {
    fn label(&self, text: &str, x: f64, y: f64, font_size: f64, color: u32) -> TextLabel {
        TextLabel { text: text.to_owned(), x, y, font_size, color: Color(color), resolution: self.resolution }
    }
}

/// Outcome of a synchronous texture lookup.
#[derive(Debug, Clone)]
pub enum TextureLookup {
    Ready(Arc<Texture>),
    /// A load was requested; draw a placeholder for now.
    Pending,
    /// Failed, or slow to load; draw a placeholder. A slow load is still
    /// waited on, a failed one is not requested again.
    Fallback,
}

/// Everything a behavior may read while rendering one object.
pub struct RenderContext<'a> {
    pub object_id: &'a str,
    pub flags: RenderFlags,
    /// Omit decorations (badges, outlines, grid lines, labels).
    pub minimal: bool,
    pub camera_scale: f64,
    pub pixel_ratio: f64,
    pub assets: Option<&'a GameAssets>,
    pub textures: &'a dyn TextureHooks,
    pub labels: &'a dyn LabelFactory,
}

impl RenderContext<'_> {
    pub fn texture(&self, url: &str) -> TextureLookup {
        if let Some(texture) = self.textures.get(url) {
            return TextureLookup::Ready(texture);
        }
        if self.textures.has_failed(url) {
            return TextureLookup::Fallback;
        }
        self.textures.request(url);
        if self.textures.is_slow_loading(url) {
            TextureLookup::Fallback
        } else {
            TextureLookup::Pending
        }
    }

    /// `base` counter-scaled for the current camera scale.
    #[must_use]
    pub fn stroke(&self, base: f64) -> f64 {
        scaled_stroke_width(base, self.camera_scale)
    }

    #[must_use]
    pub fn label(&self, text: &str, x: f64, y: f64) -> VisualNode {
        VisualNode::Text(self.labels.label(text, x, y, LABEL_FONT_SIZE, LABEL_COLOR))
    }
}

/// World-unit stroke width whose on-screen width grows with `sqrt(scale)`.
#[must_use]
pub fn scaled_stroke_width(base: f64, scale: f64) -> f64 {
    let scale = if scale.is_finite() { scale.max(MIN_STROKE_SCALE) } else { 1.0 };
    base / scale.sqrt()
}

// =============================================================================
// SHARED RENDER HELPERS
// =============================================================================

/// Start a visual for `object` carrying the context's flags.
#[must_use]
pub fn begin(object: &TableObject, ctx: &RenderContext<'_>) -> Visual {
    let mut visual = Visual::new(ctx.object_id, &object.position);
    visual.flags = ctx.flags;
    visual.minimal = ctx.minimal;
    visual.rendered_scale = ctx.camera_scale;
    visual
}

/// Selection / hover / remote-selection outline and drag alpha.
pub fn decorate(visual: &mut Visual, shadow: &ShadowConfig, ctx: &RenderContext<'_>) {
    if ctx.flags.dragging {
        visual.alpha = DRAG_ALPHA;
    }
    if ctx.minimal {
        return;
    }
    let outline = if ctx.flags.selected {
        Some(Stroke::new(SELECTION_COLOR, ctx.stroke(SELECTION_STROKE)))
    } else if ctx.flags.remote_selected {
        Some(Stroke::new(REMOTE_SELECTION_COLOR, ctx.stroke(SELECTION_STROKE)))
    } else if ctx.flags.hovered {
        Some(Stroke::new(HOVER_COLOR, ctx.stroke(HOVER_STROKE)))
    } else {
        None
    };
    let Some(stroke) = outline else {
        return;
    };
    let gap = OUTLINE_GAP * 2.0;
    let node = match shadow.shape {
        ShadowShape::Circle => VisualNode::circle(0.0, 0.0, (shadow.width + gap) * 0.5),
        ShadowShape::Rect => {
            VisualNode::centered_rect(shadow.width + gap, shadow.height + gap, shadow.corner_radius + OUTLINE_GAP)
        }
    };
    visual.push(node.with_stroke(stroke));
}

/// Gray box with the kind name, drawn while an image is missing.
pub fn placeholder(visual: &mut Visual, kind: ObjectKind, shadow: &ShadowConfig, ctx: &RenderContext<'_>) {
    let border = Stroke::new(BORDER_COLOR, ctx.stroke(BORDER_STROKE));
    let node = match shadow.shape {
        ShadowShape::Circle => VisualNode::circle(0.0, 0.0, shadow.width * 0.5),
        ShadowShape::Rect => VisualNode::centered_rect(shadow.width, shadow.height, shadow.corner_radius),
    };
    visual.push(node.with_fill(Color(PLACEHOLDER_COLOR)).with_stroke(border));
    if !ctx.minimal {
        visual.push(ctx.label(kind.as_str(), 0.0, 0.0));
    }
}

/// Draw `url` as an image filling the shadow box, a placeholder while it is
/// unavailable, or a solid fill when there is no image.
pub fn fill_or_image(
    visual: &mut Visual,
    kind: ObjectKind,
    url: Option<&str>,
    fill: Color,
    shadow: &ShadowConfig,
    ctx: &RenderContext<'_>,
) {
    if let Some(url) = url {
        match ctx.texture(url) {
            TextureLookup::Ready(texture) => {
                visual.push(VisualNode::centered_image(shadow.width, shadow.height, texture));
            }
            TextureLookup::Pending | TextureLookup::Fallback => placeholder(visual, kind, shadow, ctx),
        }
        return;
    }
    let border = Stroke::new(BORDER_COLOR, ctx.stroke(BORDER_STROKE));
    let node = match shadow.shape {
        ShadowShape::Circle => VisualNode::circle(0.0, 0.0, shadow.width * 0.5),
        ShadowShape::Rect => VisualNode::centered_rect(shadow.width, shadow.height, shadow.corner_radius),
    };
    visual.push(node.with_fill(fill).with_stroke(border));
}

/// `meta.color`, or `default` when absent or unparseable.
#[must_use]
pub fn meta_color(object: &TableObject, default: u32) -> Color {
    object.meta().get("color").and_then(Color::from_value).unwrap_or(Color(default))
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Lookup from object kind to its behavior.
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: HashMap<ObjectKind, Box<dyn Behavior>>,
}

impl BehaviorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in kind.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ObjectKind::Stack, StackBehavior);
        registry.register(ObjectKind::Token, TokenBehavior);
        registry.register(ObjectKind::Zone, ZoneBehavior);
        registry.register(ObjectKind::Mat, MatBehavior);
        registry.register(ObjectKind::Counter, CounterBehavior);
        registry.register(ObjectKind::Dice, DiceBehavior);
        registry
    }

    /// Register or replace the behavior for `kind`.
    pub fn register(&mut self, kind: ObjectKind, behavior: impl Behavior + 'static) {
        debug!(%kind, "behavior registered");
        self.behaviors.insert(kind, Box::new(behavior));
    }

    /// # Errors
    ///
    /// Returns [`RenderError::UnknownKind`] if nothing is registered for `kind`.
    pub fn get(&self, kind: ObjectKind) -> Result<&dyn Behavior, RenderError> {
        self.behaviors.get(&kind).map(AsRef::as_ref).ok_or(RenderError::UnknownKind(kind))
    }

    #[must_use]
    pub fn contains(&self, kind: ObjectKind) -> bool {
        self.behaviors.contains_key(&kind)
    }

    /// # Errors
    ///
    /// Returns [`RenderError::UnknownKind`] or the behavior's own error.
    pub fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
        let mut visual = self.get(object.kind)?.render(object, ctx)?;
        visual.sort_key = object.sort_key.clone();
        Ok(visual)
    }

    /// # Errors
    ///
    /// Returns [`RenderError::UnknownKind`] if nothing is registered for the kind.
    pub fn bounds(&self, object: &TableObject) -> Result<Bounds, RenderError> {
        Ok(self.get(object.kind)?.bounds(object))
    }

    /// # Errors
    ///
    /// Returns [`RenderError::UnknownKind`] if nothing is registered for the kind.
    pub fn shadow(&self, object: &TableObject) -> Result<ShadowConfig, RenderError> {
        Ok(self.get(object.kind)?.shadow(object))
    }

    /// # Errors
    ///
    /// Returns [`RenderError::UnknownKind`] if nothing is registered for `kind`.
    pub fn capabilities(&self, kind: ObjectKind) -> Result<Capabilities, RenderError> {
        Ok(self.get(kind)?.capabilities())
    }

    /// Animation for an update, or `None` when the kind is unknown or nothing changed visibly.
    #[must_use]
    pub fn transition(&self, before: &TableObject, after: &TableObject) -> Option<AnimationKind> {
        let Ok(behavior) = self.get(after.kind) else {
            return None;
        };
        behavior.transition(before, after)
    }
}
