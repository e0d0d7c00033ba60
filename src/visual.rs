//! Scene-graph visuals produced by behaviors.
//!
//! A [`Visual`] is the drawable for one object: a list of [`VisualNode`]s in
//! object-local coordinates (origin at the object's center), placed in the
//! world by `x`, `y` and `rotation`. Visuals are plain data; the orchestrator
//! owns them and the surface consumes them.

#[cfg(test)]
#[path = "visual_test.rs"]
mod visual_test;

use std::sync::Arc;

use serde_json::Value;

use crate::camera::Point;
use crate::object::{ObjectId, Position, SortKey};
use crate::texture::Texture;

/// 0xRRGGBB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    /// Parse `#rrggbb` or `#rgb`.
    #[must_use]
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        let Ok(v) = u32::from_str_radix(hex, 16) else {
            return None;
        };
        match hex.len() {
            6 => Some(Self(v)),
            3 => {
                let (r, g, b) = ((v >> 8) & 0xF, (v >> 4) & 0xF, v & 0xF);
                Some(Self(((r * 0x11) << 16) | ((g * 0x11) << 8) | (b * 0x11)))
            }
            _ => None,
        }
    }

    /// Read a color from a `meta` value: a hex string or a 24-bit integer.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse_hex(s),
            Value::Number(n) => match n.as_u64() {
                #[allow(clippy::cast_possible_truncation)]
                Some(v) if v <= 0xFF_FFFF => Some(Self(v as u32)),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    /// Width in world units (already counter-scaled for the camera).
    pub width: f64,
}

impl Stroke {
    #[must_use]
    pub fn new(color: u32, width: f64) -> Self {
        Self { color: Color(color), width }
    }
}

/// Text drawn at a fixed world size, rasterized at `resolution`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    /// Anchor (center of the text) in object-local coordinates.
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub color: Color,
    /// Rasterization scale so text stays crisp when zoomed in.
    pub resolution: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualNode {
    Rect {
        /// Top-left corner in object-local coordinates.
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        corner_radius: f64,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        texture: Arc<Texture>,
    },
    Text(TextLabel),
}

impl VisualNode {
    /// Rectangle of `width` × `height` centered at `(cx, cy)`.
    #[must_use]
    pub fn rect_at(cx: f64, cy: f64, width: f64, height: f64, corner_radius: f64) -> Self {
        Self::Rect {
            x: cx - width * 0.5,
            y: cy - height * 0.5,
            width,
            height,
            corner_radius,
            fill: None,
            stroke: None,
        }
    }

    /// Rectangle centered on the object origin.
    #[must_use]
    pub fn centered_rect(width: f64, height: f64, corner_radius: f64) -> Self {
        Self::rect_at(0.0, 0.0, width, height, corner_radius)
    }

    #[must_use]
    pub fn circle(cx: f64, cy: f64, radius: f64) -> Self {
        Self::Circle { cx, cy, radius, fill: None, stroke: None }
    }

    /// Image filling a `width` × `height` box centered on the object origin.
    #[must_use]
    pub fn centered_image(width: f64, height: f64, texture: Arc<Texture>) -> Self {
        Self::Image { x: -width * 0.5, y: -height * 0.5, width, height, texture }
    }

    /// Set the fill on a rect or circle. Other nodes are returned unchanged.
    #[must_use]
    pub fn with_fill(mut self, color: Color) -> Self {
        if let Self::Rect { fill, .. } | Self::Circle { fill, .. } = &mut self {
            *fill = Some(color);
        }
        self
    }

    /// Set the stroke on a rect or circle. Other nodes are returned unchanged.
    #[must_use]
    pub fn with_stroke(mut self, value: Stroke) -> Self {
        if let Self::Rect { stroke, .. } | Self::Circle { stroke, .. } = &mut self {
            *stroke = Some(value);
        }
        self
    }
}

/// Transient UI state for one object. Never stored on the object itself.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderFlags {
    pub selected: bool,
    pub hovered: bool,
    pub dragging: bool,
    /// Selected by another participant.
    pub remote_selected: bool,
}

/// The drawable for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub object_id: ObjectId,
    /// World-space center.
    pub x: f64,
    pub y: f64,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub alpha: f64,
    pub nodes: Vec<VisualNode>,
    /// Flags the visual was rendered with.
    pub flags: RenderFlags,
    /// Camera scale at render time; strokes and labels are sized for it.
    pub rendered_scale: f64,
    pub sort_key: SortKey,
    /// Rendered without decorations (ghost / preview).
    pub minimal: bool,
}

impl Visual {
    #[must_use]
    pub fn new(object_id: impl Into<ObjectId>, position: &Position) -> Self {
        Self {
            object_id: object_id.into(),
            x: position.x,
            y: position.y,
            rotation: position.rotation,
            alpha: 1.0,
            nodes: Vec::new(),
            flags: RenderFlags::default(),
            rendered_scale: 1.0,
            sort_key: SortKey::default(),
            minimal: false,
        }
    }

    pub fn push(&mut self, node: VisualNode) {
        self.nodes.push(node);
    }

    /// Whether any node is a text label.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.nodes.iter().any(|n| matches!(n, VisualNode::Text(_)))
    }

    /// Textures referenced by this visual.
    pub fn textures(&self) -> impl Iterator<Item = &Arc<Texture>> {
        self.nodes.iter().filter_map(|n| match n {
            VisualNode::Image { texture, .. } => Some(texture),
            _ => None,
        })
    }
}
