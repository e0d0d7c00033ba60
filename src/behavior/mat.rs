//! Mats: large background surfaces, optionally gridded.

use super::{Behavior, Capabilities, RenderContext, RenderError, ShadowConfig, begin, decorate, fill_or_image, meta_color};
use crate::camera::{Bounds, Point};
use crate::consts::{BORDER_STROKE, GRID_COLOR, MAT_COLOR, MAT_HEIGHT, MAT_WIDTH, MAX_GRID_LINES};
use crate::object::{ObjectKind, TableObject};
use crate::visual::{Stroke, Visual, VisualNode};

const MAT_CORNER_RADIUS: f64 = 4.0;

pub struct MatBehavior;

fn size(object: &TableObject) -> (f64, f64) {
    let meta = object.meta();
    (meta.size_or("width", MAT_WIDTH), meta.size_or("height", MAT_HEIGHT))
}

/// Offsets of interior grid lines along an axis of `extent`, centered on zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn grid_offsets(extent: f64, spacing: f64) -> Vec<f64> {
    let count = (extent / spacing).floor();
    if !count.is_finite() || count < 1.0 || count as usize > MAX_GRID_LINES {
        return Vec::new();
    }
    let start = -extent * 0.5;
    (1..count as usize)
        .map(|i| start + spacing * i as f64)
        .collect()
}

impl Behavior for MatBehavior {
    fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
        let shadow = self.shadow(object);
        let (width, height) = (shadow.width, shadow.height);
        let meta = object.meta();
        let mut visual = begin(object, ctx);
        fill_or_image(&mut visual, ObjectKind::Mat, meta.image_url(), meta_color(object, MAT_COLOR), &shadow, ctx);

        let spacing = meta.f64_or("gridSize", 0.0);
        if !ctx.minimal && spacing > 0.0 {
            let stroke = Stroke::new(GRID_COLOR, ctx.stroke(BORDER_STROKE * 0.5));
            let (hw, hh) = (width * 0.5, height * 0.5);
            for x in grid_offsets(width, spacing) {
                visual.push(VisualNode::Line { from: Point::new(x, -hh), to: Point::new(x, hh), stroke });
            }
            for y in grid_offsets(height, spacing) {
                visual.push(VisualNode::Line { from: Point::new(-hw, y), to: Point::new(hw, y), stroke });
            }
        }
        decorate(&mut visual, &shadow, ctx);
        Ok(visual)
    }

    fn bounds(&self, object: &TableObject) -> Bounds {
        let (width, height) = size(object);
        Bounds::centered(object.position.point(), width, height)
    }

    fn shadow(&self, object: &TableObject) -> ShadowConfig {
        let (width, height) = size(object);
        ShadowConfig::rect(width, height, MAT_CORNER_RADIUS)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_rotate: true, can_lock: true, ..Capabilities::default() }
    }
}
