//! Scene manager: authoritative object map plus R-tree spatial index.
//!
//! DESIGN
//! ======
//! Bounds come only from the behavior registry. Each insert caches the exact
//! box it put in the index, keyed by id, because the R-tree can only remove an
//! entry that matches the inserted box exactly. Updates are remove-then-add;
//! a box is never patched in place.
//!
//! Topmost-wins resolution orders candidates by `(sort_key, id)` descending,
//! so ties on the sort key still resolve deterministically.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;
use std::sync::Arc;

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};
use tracing::{debug, error};

use crate::behavior::BehaviorRegistry;
use crate::camera::Bounds;
use crate::object::{ObjectId, ObjectKind, TableObject};
use crate::protocol::ErrorCode;

type IndexEntry = GeomWithData<Rectangle<[f64; 2]>, ObjectId>;

fn entry(bounds: &Bounds, id: &str) -> IndexEntry {
    GeomWithData::new(
        Rectangle::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]),
        id.to_owned(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("no behavior registered for {kind} (object {id})")]
    NoBehavior { id: ObjectId, kind: ObjectKind },
}

impl ErrorCode for SceneError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoBehavior { .. } => "E_NO_BEHAVIOR",
        }
    }
}

pub struct SceneManager {
    registry: Arc<BehaviorRegistry>,
    objects: HashMap<ObjectId, TableObject>,
    index: RTree<IndexEntry>,
    /// Box last inserted into `index` for each id.
    boxes: HashMap<ObjectId, Bounds>,
}

impl SceneManager {
    #[must_use]
    pub fn new(registry: Arc<BehaviorRegistry>) -> Self {
        Self { registry, objects: HashMap::new(), index: RTree::new(), boxes: HashMap::new() }
    }

    /// Insert `object`. An existing id is replaced as if by [`Self::update_object`].
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NoBehavior`] if the registry has no behavior for
    /// the object's kind. The scene is unchanged in that case.
    pub fn add_object(&mut self, id: &str, object: TableObject) -> Result<(), SceneError> {
        let bounds = self
            .registry
            .bounds(&object)
            .map_err(|_| SceneError::NoBehavior { id: id.to_owned(), kind: object.kind })?;
        if self.objects.contains_key(id) {
            self.remove_from_index(id);
        }
        self.index.insert(entry(&bounds, id));
        self.boxes.insert(id.to_owned(), bounds);
        self.objects.insert(id.to_owned(), object);
        Ok(())
    }

    /// Replace `id` with `object`: remove the old index entry by its cached
    /// box, then insert fresh.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NoBehavior`] for an unregistered kind.
    pub fn update_object(&mut self, id: &str, object: TableObject) -> Result<(), SceneError> {
        // Resolve bounds first so a failed update leaves the old entry intact.
        self.registry
            .bounds(&object)
            .map_err(|_| SceneError::NoBehavior { id: id.to_owned(), kind: object.kind })?;
        self.remove_object(id);
        self.add_object(id, object)
    }

    /// Remove `id` from the map, the index, and the box cache.
    pub fn remove_object(&mut self, id: &str) -> Option<TableObject> {
        self.remove_from_index(id);
        let removed = self.objects.remove(id);
        if removed.is_none() {
            debug!(object_id = %id, "remove for unknown object");
        }
        removed
    }

    fn remove_from_index(&mut self, id: &str) {
        let Some(bounds) = self.boxes.remove(id) else {
            if self.objects.contains_key(id) {
                error!(object_id = %id, "object has no cached bounding box; index may hold a ghost");
            }
            return;
        };
        if self.index.remove(&entry(&bounds, id)).is_none() {
            error!(object_id = %id, ?bounds, "cached bounding box not found in spatial index");
        }
    }

    /// Topmost object containing the world point, by sort key.
    #[must_use]
    pub fn hit_test(&self, x: f64, y: f64) -> Option<ObjectId> {
        self.topmost_at(x, y, None)
    }

    /// Like [`Self::hit_test`], ignoring `exclude` (e.g. the object being dragged).
    #[must_use]
    pub fn hit_test_excluding(&self, x: f64, y: f64, exclude: &str) -> Option<ObjectId> {
        self.topmost_at(x, y, Some(exclude))
    }

    fn topmost_at(&self, x: f64, y: f64, exclude: Option<&str>) -> Option<ObjectId> {
        self.index
            .locate_all_at_point(&[x, y])
            .filter(|e| exclude != Some(e.data.as_str()))
            .filter_map(|e| self.objects.get(&e.data).map(|o| (&o.sort_key, &e.data)))
            .max()
            .map(|(_, id)| id.clone())
    }

    /// Every object whose box intersects `region`, unordered.
    #[must_use]
    pub fn hit_test_region(&self, region: &Bounds) -> Vec<ObjectId> {
        let envelope = AABB::from_corners([region.min_x, region.min_y], [region.max_x, region.max_y]);
        self.index
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.data.clone())
            .collect()
    }

    /// Empty the map, index, and box cache together.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.index = RTree::new();
        self.boxes.clear();
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TableObject> {
        self.objects.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// The box currently indexed for `id`.
    #[must_use]
    pub fn bounds_of(&self, id: &str) -> Option<Bounds> {
        self.boxes.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of entries in the spatial index. Equals `len()` when consistent.
    #[must_use]
    pub fn index_len(&self) -> usize {
        self.index.size()
    }

    /// Ids bottom-to-top.
    #[must_use]
    pub fn ids_in_draw_order(&self) -> Vec<ObjectId> {
        let mut ordered: Vec<(&TableObject, &ObjectId)> = self.objects.iter().map(|(id, o)| (o, id)).collect();
        ordered.sort_by(|(a, a_id), (b, b_id)| (&a.sort_key, a_id).cmp(&(&b.sort_key, b_id)));
        ordered.into_iter().map(|(_, id)| id.clone()).collect()
    }

    #[must_use]
    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }
}
