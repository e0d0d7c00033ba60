//! Counters: a rounded square showing an integer value.

use super::{Behavior, Capabilities, RenderContext, RenderError, ShadowConfig, begin, decorate, meta_color};
use crate::camera::Bounds;
use crate::consts::{BORDER_COLOR, BORDER_STROKE, COUNTER_COLOR, COUNTER_SIZE, LABEL_COLOR, LABEL_FONT_SIZE};
use crate::object::TableObject;
use crate::visual::{Stroke, Visual, VisualNode};

pub struct CounterBehavior;

fn side(object: &TableObject) -> f64 {
    object.meta().size_or("size", COUNTER_SIZE)
}

impl Behavior for CounterBehavior {
    fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
        let shadow = self.shadow(object);
        let meta = object.meta();
        let mut visual = begin(object, ctx);
        let body = VisualNode::centered_rect(shadow.width, shadow.height, shadow.corner_radius)
            .with_fill(meta_color(object, COUNTER_COLOR))
            .with_stroke(Stroke::new(BORDER_COLOR, ctx.stroke(BORDER_STROKE)));
        visual.push(body);

        if !ctx.minimal {
            let value = meta.i64_or("value", 0).to_string();
            let font_size = shadow.height * 0.5;
            visual.push(VisualNode::Text(ctx.labels.label(&value, 0.0, 0.0, font_size, LABEL_COLOR)));
            let label = meta.label();
            if !label.is_empty() {
                visual.push(ctx.label(label, 0.0, shadow.height * 0.5 + LABEL_FONT_SIZE));
            }
        }
        decorate(&mut visual, &shadow, ctx);
        Ok(visual)
    }

    fn bounds(&self, object: &TableObject) -> Bounds {
        let s = side(object);
        Bounds::centered(object.position.point(), s, s)
    }

    fn shadow(&self, object: &TableObject) -> ShadowConfig {
        let s = side(object);
        ShadowConfig::rect(s, s, s * 0.2)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_lock: true, ..Capabilities::default() }
    }
}
