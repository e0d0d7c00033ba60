//! Short-lived visual transitions started by object updates.
//!
//! Animations never touch object data. They decorate the next frames of an
//! existing visual and expire after a fixed duration.

#[cfg(test)]
#[path = "animation_test.rs"]
mod animation_test;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::consts::{FLIP_ANIMATION_MS, MOVE_ANIMATION_MS};
use crate::object::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    /// Card turned face up or face down.
    Flip,
    /// Position changed.
    Move,
}

impl AnimationKind {
    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::Flip => Duration::from_millis(FLIP_ANIMATION_MS),
            Self::Move => Duration::from_millis(MOVE_ANIMATION_MS),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Active {
    kind: AnimationKind,
    started: Instant,
}

/// Tracks at most one running animation per visual.
#[derive(Debug, Default)]
pub struct Animator {
    active: HashMap<ObjectId, Active>,
}

impl Animator {
    /// Start `kind` on the visual for `id`. Returns `false` (and logs) when
    /// there is no visual to animate.
    pub fn start(&mut self, id: &str, kind: AnimationKind, has_visual: bool) -> bool {
        if !has_visual {
            warn!(object_id = %id, ?kind, "animation requested for missing visual");
            return false;
        }
        debug!(object_id = %id, ?kind, "animation started");
        self.active.insert(id.to_owned(), Active { kind, started: Instant::now() });
        true
    }

    /// Drop finished animations. Returns the ids that finished.
    pub fn tick(&mut self) -> Vec<ObjectId> {
        let now = Instant::now();
        let finished: Vec<ObjectId> = self
            .active
            .iter()
            .filter(|(_, a)| now.duration_since(a.started) >= a.kind.duration())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &finished {
            self.active.remove(id);
        }
        finished
    }

    /// Kind and progress in `[0, 1]` of the animation on `id`, if any.
    #[must_use]
    pub fn progress(&self, id: &str) -> Option<(AnimationKind, f64)> {
        self.active.get(id).map(|a| {
            let elapsed = a.started.elapsed().as_secs_f64();
            (a.kind, (elapsed / a.kind.duration().as_secs_f64()).min(1.0))
        })
    }

    /// Whether anything matching the filters is still running. `None` matches all.
    #[must_use]
    pub fn is_animating(&self, id: Option<&str>, kind: Option<AnimationKind>) -> bool {
        let kind_matches = |a: &Active| kind.is_none_or(|k| a.kind == k);
        match id {
            Some(id) => self.active.get(id).is_some_and(kind_matches),
            None => self.active.values().any(kind_matches),
        }
    }

    pub fn cancel(&mut self, id: &str) {
        self.active.remove(id);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
