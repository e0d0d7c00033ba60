//! Dice: a rounded square showing the rolled face. Six-sided dice draw pips,
//! anything else draws the number.

use super::{Behavior, Capabilities, RenderContext, RenderError, ShadowConfig, begin, decorate, meta_color};
use crate::camera::Bounds;
use crate::consts::{BORDER_COLOR, BORDER_STROKE, DICE_COLOR, DICE_SIZE, LABEL_COLOR, PIP_COLOR};
use crate::object::TableObject;
use crate::visual::{Color, Stroke, Visual, VisualNode};

pub struct DiceBehavior;

fn side(object: &TableObject) -> f64 {
    object.meta().size_or("size", DICE_SIZE)
}

/// Pip positions for a d6 face on a unit grid of `-1..=1`.
fn pips(value: i64) -> &'static [(f64, f64)] {
    match value {
        1 => &[(0.0, 0.0)],
        2 => &[(-1.0, -1.0), (1.0, 1.0)],
        3 => &[(-1.0, -1.0), (0.0, 0.0), (1.0, 1.0)],
        4 => &[(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)],
        5 => &[(-1.0, -1.0), (1.0, -1.0), (0.0, 0.0), (-1.0, 1.0), (1.0, 1.0)],
        6 => &[(-1.0, -1.0), (1.0, -1.0), (-1.0, 0.0), (1.0, 0.0), (-1.0, 1.0), (1.0, 1.0)],
        _ => &[],
    }
}

impl Behavior for DiceBehavior {
    fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
        let shadow = self.shadow(object);
        let s = shadow.width;
        let meta = object.meta();
        let mut visual = begin(object, ctx);
        let body = VisualNode::centered_rect(s, s, shadow.corner_radius)
            .with_fill(meta_color(object, DICE_COLOR))
            .with_stroke(Stroke::new(BORDER_COLOR, ctx.stroke(BORDER_STROKE)));
        visual.push(body);

        if !ctx.minimal {
            let faces = meta.i64_or("faces", 6);
            let value = meta.i64_or("value", 1);
            let layout = if faces == 6 { pips(value) } else { &[] };
            if layout.is_empty() {
                let text = value.to_string();
                visual.push(VisualNode::Text(ctx.labels.label(&text, 0.0, 0.0, s * 0.5, LABEL_COLOR)));
            } else {
                let step = s * 0.25;
                let radius = s * 0.08;
                for (px, py) in layout {
                    visual.push(VisualNode::circle(px * step, py * step, radius).with_fill(Color(PIP_COLOR)));
                }
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
        ShadowConfig::rect(s, s, s * 0.15)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_rotate: true, can_lock: true, ..Capabilities::default() }
    }
}
