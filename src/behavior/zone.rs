//! Zones: labeled regions other objects are placed into.

use super::{Behavior, Capabilities, RenderContext, RenderError, ShadowConfig, begin, decorate, meta_color};
use crate::camera::Bounds;
use crate::consts::{BORDER_COLOR, BORDER_STROKE, LABEL_FONT_SIZE, ZONE_COLOR, ZONE_HEIGHT, ZONE_WIDTH};
use crate::object::TableObject;
use crate::visual::{Stroke, Visual, VisualNode};

const ZONE_CORNER_RADIUS: f64 = 8.0;

pub struct ZoneBehavior;

fn size(object: &TableObject) -> (f64, f64) {
    let meta = object.meta();
    (meta.size_or("width", ZONE_WIDTH), meta.size_or("height", ZONE_HEIGHT))
}

impl Behavior for ZoneBehavior {
    fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
        let shadow = self.shadow(object);
        let mut visual = begin(object, ctx);
        let body = VisualNode::centered_rect(shadow.width, shadow.height, ZONE_CORNER_RADIUS)
            .with_fill(meta_color(object, ZONE_COLOR))
            .with_stroke(Stroke::new(BORDER_COLOR, ctx.stroke(BORDER_STROKE)));
        visual.push(body);

        let label = object.meta().label();
        if !ctx.minimal && !label.is_empty() {
            visual.push(ctx.label(label, 0.0, -shadow.height * 0.5 + LABEL_FONT_SIZE));
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
        ShadowConfig::rect(width, height, ZONE_CORNER_RADIUS)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_lock: true, ..Capabilities::default() }
    }
}
