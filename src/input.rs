//! Input model: pointer and wheel events, modifiers, interaction modes, and
//! the gesture state tracked between pointer-down and pointer-up.
//!
//! Events arrive from the host in screen space (CSS pixels). `Gesture` is
//! owned by the orchestrator and carries the context needed to emit an
//! `object-moved` message on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::object::ObjectId;

/// How a primary-button drag on empty space or an object is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Click selects, drag moves unlocked objects (default).
    #[default]
    Select,
    /// Every drag pans the camera.
    Pan,
}

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Whether the event should toggle membership in the selection.
    #[must_use]
    pub fn toggles_selection(self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button. Always pans.
    Middle,
    /// Right mouse button.
    Secondary,
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub button: Button,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerEvent {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, button: Button::Primary, modifiers: Modifiers::default() }
    }

    #[must_use]
    pub fn screen(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Wheel / trackpad scroll at a screen position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelEvent {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub delta_x: f64,
    /// Vertical scroll amount in pixels (positive = down, zooms out).
    pub delta_y: f64,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl WheelEvent {
    #[must_use]
    pub fn screen(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.delta_x.is_finite() && self.delta_y.is_finite()
    }
}

/// Active gesture between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging the camera.
    Panning {
        /// Screen position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving an object. The object's data is untouched until release.
    Dragging {
        id: ObjectId,
        /// Object center minus the pointer's world position at grab time.
        grab_offset: Point,
        /// Object center at grab time.
        origin: Point,
        /// Live object center.
        current: Point,
    },
}

impl Gesture {
    /// Id of the object being dragged, if any.
    #[must_use]
    pub fn dragged_id(&self) -> Option<&str> {
        match self {
            Self::Dragging { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Snap a world coordinate to the nearest multiple of `grid`.
#[must_use]
pub fn snap(value: f64, grid: f64) -> f64 {
    if grid > 0.0 { (value / grid).round() * grid } else { value }
}
