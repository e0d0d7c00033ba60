//! Tokens: round pieces, optionally showing an asset image.

use super::{Behavior, Capabilities, RenderContext, RenderError, ShadowConfig, begin, decorate, fill_or_image, meta_color};
use crate::camera::Bounds;
use crate::consts::{LABEL_FONT_SIZE, TOKEN_COLOR, TOKEN_SIZE};
use crate::object::{ObjectKind, TableObject};
use crate::visual::Visual;

pub struct TokenBehavior;

fn diameter(object: &TableObject) -> f64 {
    object.meta().size_or("size", TOKEN_SIZE)
}

impl Behavior for TokenBehavior {
    fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
        let shadow = self.shadow(object);
        let meta = object.meta();
        let url = meta.image_url().or_else(|| {
            let asset_id = meta.str("assetId")?;
            ctx.assets.and_then(|assets| assets.token_image(asset_id))
        });

        let mut visual = begin(object, ctx);
        fill_or_image(&mut visual, ObjectKind::Token, url, meta_color(object, TOKEN_COLOR), &shadow, ctx);

        let label = meta.label();
        if !ctx.minimal && !label.is_empty() {
            visual.push(ctx.label(label, 0.0, shadow.height * 0.5 + LABEL_FONT_SIZE));
        }
        decorate(&mut visual, &shadow, ctx);
        Ok(visual)
    }

    fn bounds(&self, object: &TableObject) -> Bounds {
        let d = diameter(object);
        Bounds::centered(object.position.point(), d, d)
    }

    fn shadow(&self, object: &TableObject) -> ShadowConfig {
        ShadowConfig::circle(diameter(object))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_rotate: true, can_lock: true, ..Capabilities::default() }
    }
}
