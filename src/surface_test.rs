use super::*;
use crate::object::Position;

#[test]
fn physical_size_scales_by_pixel_ratio() {
    let surface = Surface::new(800.0, 600.0, 2.0);
    assert_eq!(surface.physical_size(), (1600, 1200));
}

#[test]
fn resize_updates_dimensions() {
    let mut surface = Surface::new(800.0, 600.0, 1.0);
    let id = surface.id();
    surface.resize(1024.0, 768.0, 1.5);
    assert_eq!(surface.physical_size(), (1536, 1152));
    assert_eq!(surface.id(), id);
}

#[test]
fn present_keeps_last_frame() {
    let mut surface = Surface::new(100.0, 100.0, 1.0);
    assert!(surface.last_frame().is_none());

    let visual = Visual::new("a", &Position::new(0.0, 0.0));
    let frame = Frame {
        camera: Camera::default(),
        items: vec![
            DrawItem::Shadow { object_id: "a".into(), x: 0.0, y: 0.0, shadow: ShadowConfig::circle(10.0) },
            DrawItem::Visual { visual, animation: None },
        ],
    };
    surface.present(frame.clone());
    surface.present(frame);

    assert_eq!(surface.frames_presented(), 2);
    let last = surface.last_frame().unwrap();
    assert_eq!(last.visual_ids().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(last.shadow_ids().collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn surfaces_have_distinct_ids() {
    assert_ne!(Surface::new(1.0, 1.0, 1.0).id(), Surface::new(1.0, 1.0, 1.0).id());
}
