//! The exclusive drawing surface and the frames presented to it.
//!
//! A [`Surface`] is deliberately not `Clone`: exactly one owner may draw to
//! it. The host creates it, hands it to the renderer once during `init`, and
//! never sees it again.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use tracing::{debug, info};
use uuid::Uuid;

use crate::animation::AnimationKind;
use crate::behavior::ShadowConfig;
use crate::camera::Camera;
use crate::object::{ActorId, ObjectId};
use crate::visual::Visual;

/// One entry of a composed frame, in paint order.
#[derive(Debug, Clone)]
pub enum DrawItem {
    /// Drop shadow or selection glow, painted beneath every visual.
    Shadow { object_id: ObjectId, x: f64, y: f64, shadow: ShadowConfig },
    Visual { visual: Visual, animation: Option<(AnimationKind, f64)> },
    /// A remote participant's in-progress drag.
    Ghost { actor_id: ActorId, visual: Visual },
    /// A remote participant's pointer, in world coordinates.
    Cursor { actor_id: ActorId, x: f64, y: f64 },
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub camera: Camera,
    pub items: Vec<DrawItem>,
}

impl Frame {
    /// Visuals in paint order, ignoring shadows, ghosts and cursors.
    pub fn visual_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Visual { visual, .. } => Some(visual.object_id.as_str()),
            _ => None,
        })
    }

    pub fn shadow_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Shadow { object_id, .. } => Some(object_id.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub struct Surface {
    id: Uuid,
    width: f64,
    height: f64,
    pixel_ratio: f64,
    frames_presented: u64,
    last_frame: Option<Frame>,
}

impl Surface {
    /// A surface of `width × height` logical pixels.
    #[must_use]
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        let id = Uuid::new_v4();
        debug!(surface_id = %id, width, height, pixel_ratio, "surface created");
        Self { id, width, height, pixel_ratio, frames_presented: 0, last_frame: None }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[must_use]
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Backing-store size in device pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn physical_size(&self) -> (u32, u32) {
        let w = (self.width * self.pixel_ratio).round().max(0.0) as u32;
        let h = (self.height * self.pixel_ratio).round().max(0.0) as u32;
        (w, h)
    }

    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        info!(surface_id = %self.id, width, height, pixel_ratio, "surface resized");
        self.width = width;
        self.height = height;
        self.pixel_ratio = pixel_ratio;
    }

    /// Replace the displayed contents with `frame`.
    pub fn present(&mut self, frame: Frame) {
        self.frames_presented += 1;
        debug!(surface_id = %self.id, frame = self.frames_presented, items = frame.items.len(), "frame presented");
        self.last_frame = Some(frame);
    }

    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }
}
