//! Card stacks: one or more cards, drawn as the top card with offset edges
//! beneath and a count badge.

use serde_json::Value;

use super::{Behavior, Capabilities, RenderContext, RenderError, ShadowConfig, begin, decorate, fill_or_image, moved};
use crate::animation::AnimationKind;
use crate::camera::Bounds;
use crate::consts::{
    BADGE_COLOR, BADGE_FONT_SIZE, BADGE_RADIUS, BADGE_TEXT_COLOR, BORDER_COLOR, BORDER_STROKE, CARD_BACK_COLOR,
    CARD_CORNER_RADIUS, CARD_FACE_COLOR, CARD_HEIGHT, CARD_WIDTH, STACK_MAX_EDGES,
};
use crate::object::{ObjectKind, TableObject};
use crate::visual::{Color, Stroke, Visual, VisualNode};

/// Offset between successive edge cards, in world units.
const EDGE_OFFSET: f64 = 2.0;

pub struct StackBehavior;

fn size(object: &TableObject) -> (f64, f64) {
    let meta = object.meta();
    (meta.size_or("width", CARD_WIDTH), meta.size_or("height", CARD_HEIGHT))
}

/// Card ids, bottom first. A missing field is an empty stack.
fn cards(object: &TableObject) -> Result<Vec<&str>, RenderError> {
    let invalid = |reason: &str| RenderError::InvalidField { field: "cards", reason: reason.to_owned() };
    match object.fields.get("cards") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().ok_or_else(|| invalid("card ids must be strings")))
            .collect(),
        Some(_) => Err(invalid("expected an array of card ids")),
    }
}

fn face_up(object: &TableObject) -> Result<bool, RenderError> {
    match object.fields.get("faceUp") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(RenderError::InvalidField { field: "faceUp", reason: "expected a boolean".into() }),
    }
}

impl Behavior for StackBehavior {
    fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
        let cards = cards(object)?;
        let face_up = face_up(object)?;
        let shadow = self.shadow(object);
        let (width, height) = (shadow.width, shadow.height);
        let border = Stroke::new(BORDER_COLOR, ctx.stroke(BORDER_STROKE));
        let mut visual = begin(object, ctx);

        let Some(top) = cards.last() else {
            visual.push(VisualNode::centered_rect(width, height, CARD_CORNER_RADIUS).with_stroke(border));
            decorate(&mut visual, &shadow, ctx);
            return Ok(visual);
        };

        let edges = (cards.len() - 1).min(STACK_MAX_EDGES);
        for i in (1..=edges).rev() {
            #[allow(clippy::cast_precision_loss)]
            let offset = EDGE_OFFSET * i as f64;
            let edge = VisualNode::rect_at(offset, offset, width, height, CARD_CORNER_RADIUS)
                .with_fill(Color(CARD_FACE_COLOR))
                .with_stroke(border);
            visual.push(edge);
        }

        let url = ctx
            .assets
            .and_then(|assets| assets.card_image(top, face_up))
            .or_else(|| object.meta().image_url());
        let fill = Color(if face_up { CARD_FACE_COLOR } else { CARD_BACK_COLOR });
        fill_or_image(&mut visual, ObjectKind::Stack, url, fill, &shadow, ctx);

        if !ctx.minimal {
            if url.is_none() && face_up {
                visual.push(ctx.label(top, 0.0, 0.0));
            }
            if cards.len() > 1 {
                let (bx, by) = (width * 0.5, -height * 0.5);
                visual.push(VisualNode::circle(bx, by, BADGE_RADIUS).with_fill(Color(BADGE_COLOR)));
                let count = cards.len().to_string();
                visual.push(VisualNode::Text(ctx.labels.label(&count, bx, by, BADGE_FONT_SIZE, BADGE_TEXT_COLOR)));
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
        ShadowConfig::rect(width, height, CARD_CORNER_RADIUS)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_flip: true, can_rotate: true, can_stack: true, can_unstack: true, can_lock: true }
    }

    fn transition(&self, before: &TableObject, after: &TableObject) -> Option<AnimationKind> {
        if before.fields.get("faceUp") != after.fields.get("faceUp") {
            return Some(AnimationKind::Flip);
        }
        moved(before, after).then_some(AnimationKind::Move)
    }
}
