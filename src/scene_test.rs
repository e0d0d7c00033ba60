use rand::Rng;
use serde_json::json;

use super::*;
use crate::behavior::{Behavior, Capabilities, RenderContext, RenderError, ShadowConfig};
use crate::object::{Position, SortKey};
use crate::visual::Visual;

fn scene() -> SceneManager {
    SceneManager::new(Arc::new(BehaviorRegistry::with_defaults()))
}

/// A 40×40 token centered at (x, y).
fn token(x: f64, y: f64, key: &str) -> TableObject {
    TableObject::new(ObjectKind::Token, Position::new(x, y), SortKey::new(key))
}

// =============================================================================
// HIT TESTING
// =============================================================================

#[test]
fn point_inside_hits_and_outside_misses() {
    let mut scene = scene();
    scene.add_object("t1", token(100.0, 100.0, "a")).unwrap();

    assert_eq!(scene.hit_test(100.0, 100.0).as_deref(), Some("t1"));
    assert_eq!(scene.hit_test(81.0, 119.0).as_deref(), Some("t1"));
    assert_eq!(scene.hit_test(79.0, 100.0), None);
    assert_eq!(scene.hit_test(100.0, 121.0), None);
}

#[test]
fn random_points_agree_with_bounds() {
    let mut rng = rand::rng();
    let mut scene = scene();
    let mut boxes = Vec::new();
    for i in 0..50 {
        let (x, y) = (rng.random_range(0.0..2000.0), rng.random_range(0.0..2000.0));
        let id = format!("t{i}");
        scene.add_object(&id, token(x, y, "a")).unwrap();
        boxes.push(scene.bounds_of(&id).unwrap());
    }
    for _ in 0..500 {
        let (x, y) = (rng.random_range(-100.0..2100.0), rng.random_range(-100.0..2100.0));
        let inside_any = boxes.iter().any(|b| b.contains(crate::camera::Point::new(x, y)));
        assert_eq!(scene.hit_test(x, y).is_some(), inside_any, "at ({x}, {y})");
    }
}

#[test]
fn overlap_resolves_to_higher_sort_key() {
    let mut scene = scene();
    scene.add_object("nine", token(10.0, 10.0, "9")).unwrap();
    scene.add_object("five", token(15.0, 15.0, "5")).unwrap();
    assert_eq!(scene.hit_test(12.0, 12.0).as_deref(), Some("nine"));
}

#[test]
fn sort_key_compares_lexicographically() {
    let mut scene = scene();
    scene.add_object("ten", token(0.0, 0.0, "10")).unwrap();
    scene.add_object("nine", token(0.0, 0.0, "9")).unwrap();
    assert_eq!(scene.hit_test(0.0, 0.0).as_deref(), Some("nine"));
}

#[test]
fn equal_sort_keys_break_ties_by_id() {
    let mut scene = scene();
    scene.add_object("a", token(0.0, 0.0, "k")).unwrap();
    scene.add_object("b", token(0.0, 0.0, "k")).unwrap();
    assert_eq!(scene.hit_test(0.0, 0.0).as_deref(), Some("b"));
}

#[test]
fn hit_test_excluding_skips_dragged_object() {
    let mut scene = scene();
    scene.add_object("zone", TableObject::new(ObjectKind::Zone, Position::new(0.0, 0.0), SortKey::new("a")))
        .unwrap();
    scene.add_object("dragged", token(0.0, 0.0, "z")).unwrap();
    assert_eq!(scene.hit_test(0.0, 0.0).as_deref(), Some("dragged"));
    assert_eq!(scene.hit_test_excluding(0.0, 0.0, "dragged").as_deref(), Some("zone"));
}

// =============================================================================
// UPDATE / REMOVE
// =============================================================================

#[test]
fn remove_after_move_leaves_no_ghost() {
    let mut scene = scene();
    scene.add_object("t1", token(0.0, 0.0, "a")).unwrap();
    scene.update_object("t1", token(500.0, 500.0, "a")).unwrap();

    assert_eq!(scene.hit_test(0.0, 0.0), None);
    assert_eq!(scene.hit_test(500.0, 500.0).as_deref(), Some("t1"));

    let removed = scene.remove_object("t1").unwrap();
    assert!((removed.position.x - 500.0).abs() < f64::EPSILON);
    assert_eq!(scene.hit_test(0.0, 0.0), None);
    assert_eq!(scene.hit_test(500.0, 500.0), None);
    assert_eq!(scene.index_len(), 0);
    assert!(scene.bounds_of("t1").is_none());
}

#[test]
fn update_with_new_size_reindexes() {
    let mut scene = scene();
    scene.add_object("t1", token(0.0, 0.0, "a")).unwrap();
    let mut bigger = token(0.0, 0.0, "a");
    bigger.meta = json!({"size": 200.0}).as_object().cloned().unwrap();
    scene.update_object("t1", bigger).unwrap();

    assert_eq!(scene.hit_test(90.0, 90.0).as_deref(), Some("t1"));
    assert_eq!(scene.index_len(), 1);
}

#[test]
fn add_existing_id_acts_as_update() {
    let mut scene = scene();
    scene.add_object("t1", token(0.0, 0.0, "a")).unwrap();
    scene.add_object("t1", token(300.0, 0.0, "a")).unwrap();
    assert_eq!(scene.len(), 1);
    assert_eq!(scene.index_len(), 1);
    assert_eq!(scene.hit_test(0.0, 0.0), None);
}

#[test]
fn remove_unknown_is_none() {
    let mut scene = scene();
    assert!(scene.remove_object("missing").is_none());
}

#[test]
fn unregistered_kind_is_rejected_without_side_effects() {
    let mut scene = SceneManager::new(Arc::new(BehaviorRegistry::new()));
    let err = scene.add_object("t1", token(0.0, 0.0, "a")).unwrap_err();
    assert_eq!(err, SceneError::NoBehavior { id: "t1".into(), kind: ObjectKind::Token });
    assert!(scene.is_empty());
    assert_eq!(scene.index_len(), 0);
}

#[test]
fn failed_update_keeps_previous_entry() {
    struct Square;
    impl Behavior for Square {
        fn render(&self, object: &TableObject, ctx: &RenderContext<'_>) -> Result<Visual, RenderError> {
            Ok(Visual::new(ctx.object_id, &object.position))
        }
        fn bounds(&self, object: &TableObject) -> Bounds {
            Bounds::centered(object.position.point(), 10.0, 10.0)
        }
        fn shadow(&self, _object: &TableObject) -> ShadowConfig {
            ShadowConfig::rect(10.0, 10.0, 0.0)
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
    }

    let mut registry = BehaviorRegistry::new();
    registry.register(ObjectKind::Counter, Square);
    let mut scene = SceneManager::new(Arc::new(registry));
    let counter = TableObject::new(ObjectKind::Counter, Position::new(0.0, 0.0), SortKey::new("a"));
    scene.add_object("c1", counter).unwrap();

    assert!(scene.update_object("c1", token(100.0, 100.0, "a")).is_err());
    assert_eq!(scene.hit_test(0.0, 0.0).as_deref(), Some("c1"));
}

// =============================================================================
// BULK / REGION
// =============================================================================

#[test]
fn five_hundred_objects_fill_map_and_index() {
    let mut scene = scene();
    for i in 0..500_i32 {
        let (x, y) = (f64::from(i % 25) * 100.0, f64::from(i / 25) * 100.0);
        scene.add_object(&format!("t{i}"), token(x, y, "a")).unwrap();
    }
    assert_eq!(scene.len(), 500);
    assert_eq!(scene.index_len(), 500);

    // Tokens are 40 wide on a 100 grid: this region touches columns 0..=2, rows 0..=1.
    let region = Bounds { min_x: -10.0, min_y: -10.0, max_x: 210.0, max_y: 110.0 };
    let mut hits = scene.hit_test_region(&region);
    hits.sort();
    let mut expected: Vec<String> = [0, 1, 2, 25, 26, 27].iter().map(|i| format!("t{i}")).collect();
    expected.sort();
    assert_eq!(hits, expected);
    for id in &hits {
        assert!(scene.bounds_of(id).unwrap().intersects(&region));
    }
}

#[test]
fn region_outside_everything_is_empty() {
    let mut scene = scene();
    scene.add_object("t1", token(0.0, 0.0, "a")).unwrap();
    let far = Bounds { min_x: 1000.0, min_y: 1000.0, max_x: 2000.0, max_y: 2000.0 };
    assert!(scene.hit_test_region(&far).is_empty());
}

#[test]
fn clear_empties_everything() {
    let mut scene = scene();
    scene.add_object("t1", token(0.0, 0.0, "a")).unwrap();
    scene.add_object("t2", token(50.0, 0.0, "b")).unwrap();
    scene.clear();
    assert!(scene.is_empty());
    assert_eq!(scene.index_len(), 0);
    assert!(scene.bounds_of("t1").is_none());
    assert_eq!(scene.hit_test(0.0, 0.0), None);
}

#[test]
fn draw_order_is_bottom_to_top() {
    let mut scene = scene();
    scene.add_object("top", token(0.0, 0.0, "z")).unwrap();
    scene.add_object("bottom", token(0.0, 0.0, "1")).unwrap();
    scene.add_object("middle", token(0.0, 0.0, "m")).unwrap();
    assert_eq!(scene.ids_in_draw_order(), vec!["bottom", "middle", "top"]);
}
