use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::consts::{HOVER_COLOR, SELECTION_COLOR};
use crate::input::Modifiers;
use crate::object::{ObjectKind, SortKey};
use crate::protocol::{AwarenessState, RemoteDrag};
use crate::texture::{DecodedImage, SoftwareDevice, TextureDecoder, TextureError, TextureFetcher, TexturePipeline};
use crate::visual::VisualNode;

// =============================================================================
// HELPERS
// =============================================================================

fn orchestrator_with(config: EngineConfig) -> (RenderOrchestrator, mpsc::Receiver<TextureEvent>) {
    let (tx, rx) = mpsc::channel(16);
    let cache = TextureCache::new(TexturePipeline::standard(), config.slow_load);
    let orch = RenderOrchestrator::new(config, Arc::new(BehaviorRegistry::with_defaults()), cache, tx);
    (orch, rx)
}

/// Orchestrator with an 800×600 surface at identity camera.
fn ready() -> RenderOrchestrator {
    let (mut orch, _rx) = orchestrator_with(EngineConfig::default());
    let replies = orch.handle(
        HostMessage::Init { width: 800.0, height: 600.0, pixel_ratio: 1.0 },
        Some(Surface::new(800.0, 600.0, 1.0)),
    );
    assert_eq!(replies, vec![RendererMessage::Initialized]);
    orch
}

fn token(x: f64, y: f64, key: &str) -> TableObject {
    TableObject::new(ObjectKind::Token, Position::new(x, y), SortKey::new(key))
}

fn add(orch: &mut RenderOrchestrator, entries: Vec<(&str, TableObject)>) {
    let objects = entries.into_iter().map(|(id, object)| ObjectEntry::new(id, object)).collect();
    assert!(orch.handle(HostMessage::ObjectsAdded { objects }, None).is_empty());
}

fn down(orch: &mut RenderOrchestrator, x: f64, y: f64) -> Vec<RendererMessage> {
    orch.handle(HostMessage::PointerDown { event: PointerEvent::at(x, y) }, None)
}

fn shift_down(orch: &mut RenderOrchestrator, x: f64, y: f64) -> Vec<RendererMessage> {
    let event = PointerEvent { modifiers: Modifiers { shift: true, ..Modifiers::default() }, ..PointerEvent::at(x, y) };
    orch.handle(HostMessage::PointerDown { event }, None)
}

fn pointer_move(orch: &mut RenderOrchestrator, x: f64, y: f64) {
    assert!(orch.handle(HostMessage::PointerMove { event: PointerEvent::at(x, y) }, None).is_empty());
}

fn up(orch: &mut RenderOrchestrator, x: f64, y: f64) -> Vec<RendererMessage> {
    orch.handle(HostMessage::PointerUp { event: PointerEvent::at(x, y) }, None)
}

fn selection_changed(ids: &[&str]) -> RendererMessage {
    RendererMessage::SelectionChanged { ids: ids.iter().map(|s| (*s).to_owned()).collect() }
}

// =============================================================================
// HANDOFF
// =============================================================================

#[test]
fn second_surface_is_dropped() {
    let mut orch = ready();
    let first = orch.surface().unwrap().id();

    let replies = orch.handle(
        HostMessage::Init { width: 10.0, height: 10.0, pixel_ratio: 1.0 },
        Some(Surface::new(10.0, 10.0, 1.0)),
    );
    assert!(replies.is_empty());
    assert_eq!(orch.surface().unwrap().id(), first);
    assert!((orch.surface().unwrap().width() - 800.0).abs() < f64::EPSILON);
}

#[test]
fn init_without_surface_is_an_error() {
    let (mut orch, _rx) = orchestrator_with(EngineConfig::default());
    let replies = orch.handle(HostMessage::Init { width: 10.0, height: 10.0, pixel_ratio: 1.0 }, None);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].type_name(), "error");
    assert!(orch.surface().is_none());
}

#[test]
fn requests_are_answered() {
    let mut orch = ready();
    assert_eq!(
        orch.handle(HostMessage::Ping { data: json!({"n": 1}) }, None),
        vec![RendererMessage::Pong { data: json!({"n": 1}) }]
    );
    assert_eq!(
        orch.handle(HostMessage::Echo { data: json!("hi") }, None),
        vec![RendererMessage::EchoResponse { data: json!("hi") }]
    );
    assert_eq!(orch.handle(HostMessage::Flush, None), vec![RendererMessage::Flushed]);
    assert_eq!(orch.frames_presented(), 1);
    assert_eq!(
        orch.handle(HostMessage::SetGameAssets { assets: Some(GameAssets::default()) }, None),
        vec![RendererMessage::AssetsAcknowledged]
    );
}

// =============================================================================
// DIFFS
// =============================================================================

#[test]
fn one_bad_object_does_not_sink_the_batch() {
    let mut orch = ready();
    let mut bad = TableObject::new(ObjectKind::Stack, Position::new(200.0, 200.0), SortKey::new("b"));
    bad.fields.insert("cards".into(), json!(42));

    add(&mut orch, vec![("a", token(100.0, 100.0, "a")), ("bad", bad), ("c", token(300.0, 100.0, "c"))]);

    assert!(orch.visual("a").is_some());
    assert!(orch.visual("bad").is_none());
    assert!(orch.visual("c").is_some());
    assert_eq!(orch.scene().len(), 3);
}

#[test]
fn non_finite_entry_is_dropped_alone() {
    let mut orch = ready();
    let mut lost = token(0.0, 0.0, "b");
    lost.position.y = f64::INFINITY;
    let objects = vec![
        ObjectEntry::new("a", token(100.0, 100.0, "a")),
        ObjectEntry::new("lost", lost),
        ObjectEntry::new("c", token(300.0, 100.0, "c")),
    ];

    let replies = orch.handle(HostMessage::ObjectsAdded { objects }, None);
    assert_eq!(replies.len(), 1);
    let RendererMessage::Error { code, message, .. } = &replies[0] else { panic!("expected error, got {replies:?}") };
    assert_eq!(code.as_deref(), Some("E_INVALID_MESSAGE"));
    assert!(message.contains("lost"));
    assert_eq!(orch.scene().len(), 2);
    assert!(orch.visual("a").is_some() && orch.visual("c").is_some());
    assert!(orch.scene().get("lost").is_none());
}

#[test]
fn large_batch_renders_every_object() {
    let mut orch = ready();
    let objects: Vec<ObjectEntry> = (0..500_i32)
        .map(|i| ObjectEntry::new(format!("o{i}"), token(f64::from(i % 25) * 30.0, f64::from(i / 25) * 30.0, "a")))
        .collect();
    orch.handle(HostMessage::ObjectsAdded { objects }, None);

    assert_eq!(orch.scene().len(), 500);
    assert!((0..500).all(|i| orch.visual(&format!("o{i}")).is_some()));
}

#[test]
fn update_rerenders_and_starts_move_animation() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);

    orch.handle(HostMessage::ObjectsUpdated { objects: vec![ObjectEntry::new("a", token(250.0, 100.0, "a"))] }, None);

    assert!((orch.visual("a").unwrap().x - 250.0).abs() < f64::EPSILON);
    assert_eq!(
        orch.handle(HostMessage::CheckAnimationState { visual_id: Some("a".into()), kind: Some(AnimationKind::Move) }, None),
        vec![RendererMessage::AnimationState { is_animating: true }]
    );
    assert!(!orch.is_animating(Some("a"), Some(AnimationKind::Flip)));
}

#[tokio::test(start_paused = true)]
async fn move_animation_finishes() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    orch.handle(HostMessage::ObjectsUpdated { objects: vec![ObjectEntry::new("a", token(0.0, 0.0, "a"))] }, None);
    assert!(orch.is_animating(None, None));

    tokio::time::advance(AnimationKind::Move.duration() + Duration::from_millis(1)).await;
    assert!(!orch.is_animating(None, None));
}

#[test]
fn removal_drops_visual_and_selection() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    down(&mut orch, 100.0, 100.0);
    up(&mut orch, 100.0, 100.0);
    assert_eq!(orch.selection(), vec!["a"]);

    let replies = orch.handle(HostMessage::ObjectsRemoved { ids: vec!["a".into(), "ghost".into()] }, None);

    assert_eq!(replies, vec![selection_changed(&[])]);
    assert!(orch.visual("a").is_none());
    assert_eq!(orch.scene().hit_test(100.0, 100.0), None);
}

// =============================================================================
// SELECTION / HOVER
// =============================================================================

#[test]
fn click_selects_and_shift_click_toggles() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a")), ("b", token(300.0, 100.0, "b"))]);

    assert_eq!(down(&mut orch, 100.0, 100.0), vec![selection_changed(&["a"])]);
    up(&mut orch, 100.0, 100.0);
    assert!(orch.visual("a").unwrap().flags.selected);

    assert_eq!(shift_down(&mut orch, 300.0, 100.0), vec![selection_changed(&["a", "b"])]);
    up(&mut orch, 300.0, 100.0);
    assert_eq!(shift_down(&mut orch, 100.0, 100.0), vec![selection_changed(&["b"])]);
    up(&mut orch, 100.0, 100.0);
    assert!(!orch.visual("a").unwrap().flags.selected);
}

#[test]
fn clicking_empty_space_clears_unless_shift_held() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    down(&mut orch, 100.0, 100.0);
    up(&mut orch, 100.0, 100.0);

    assert!(shift_down(&mut orch, 500.0, 500.0).is_empty());
    assert_eq!(orch.selection(), vec!["a"]);
    assert_eq!(down(&mut orch, 500.0, 500.0), vec![selection_changed(&[])]);
}

#[test]
fn clicking_the_selection_again_reports_nothing() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    down(&mut orch, 100.0, 100.0);
    up(&mut orch, 100.0, 100.0);
    assert!(down(&mut orch, 105.0, 100.0).is_empty());
}

#[test]
fn hover_follows_the_pointer() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);

    pointer_move(&mut orch, 100.0, 100.0);
    assert_eq!(orch.hovered(), Some("a"));
    assert!(orch.visual("a").unwrap().flags.hovered);

    pointer_move(&mut orch, 400.0, 400.0);
    assert_eq!(orch.hovered(), None);
    assert!(!orch.visual("a").unwrap().flags.hovered);
}

#[test]
fn remote_selection_is_flagged() {
    let mut orch = ready();
    let mut held = token(100.0, 100.0, "a");
    held.selected_by = Some("them".into());
    add(&mut orch, vec![("a", held)]);
    assert!(orch.visual("a").unwrap().flags.remote_selected);
}

// =============================================================================
// DRAG / PAN
// =============================================================================

#[test]
fn drag_moves_visual_then_reports_position() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);

    down(&mut orch, 110.0, 105.0);
    assert_eq!(orch.gesture().dragged_id(), Some("a"));
    assert!(orch.visual("a").unwrap().flags.dragging);

    pointer_move(&mut orch, 173.0, 153.0);
    let visual = orch.visual("a").unwrap();
    assert!((visual.x - 163.0).abs() < 1e-9 && (visual.y - 148.0).abs() < 1e-9);
    assert_eq!(orch.scene().get("a").unwrap().position, Position::new(100.0, 100.0));

    let replies = up(&mut orch, 173.0, 153.0);
    assert_eq!(replies, vec![RendererMessage::ObjectMoved { id: "a".into(), position: Position::new(163.0, 148.0) }]);
    assert_eq!(orch.gesture(), &Gesture::Idle);
    assert!(!orch.visual("a").unwrap().flags.dragging);
}

#[test]
fn drop_snaps_to_grid_when_enabled() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    orch.handle(HostMessage::SetGridSnapEnabled { enabled: true }, None);

    down(&mut orch, 100.0, 100.0);
    pointer_move(&mut orch, 163.0, 148.0);
    let replies = up(&mut orch, 163.0, 148.0);

    assert_eq!(replies, vec![RendererMessage::ObjectMoved { id: "a".into(), position: Position::new(175.0, 150.0) }]);
    let visual = orch.visual("a").unwrap();
    assert!((visual.x - 175.0).abs() < f64::EPSILON);
}

#[test]
fn click_without_movement_reports_no_move() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    down(&mut orch, 100.0, 100.0);
    assert!(up(&mut orch, 100.0, 100.0).is_empty());
}

#[test]
fn locked_objects_select_but_do_not_drag() {
    let mut orch = ready();
    let mut locked = token(100.0, 100.0, "a");
    locked.locked = true;
    add(&mut orch, vec![("a", locked)]);

    assert_eq!(down(&mut orch, 100.0, 100.0), vec![selection_changed(&["a"])]);
    assert_eq!(orch.gesture(), &Gesture::Idle);
    pointer_move(&mut orch, 200.0, 200.0);
    assert!(up(&mut orch, 200.0, 200.0).is_empty());
    assert!((orch.visual("a").unwrap().x - 100.0).abs() < f64::EPSILON);
}

#[test]
fn pan_mode_moves_the_camera() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    orch.handle(HostMessage::SetInteractionMode { mode: InteractionMode::Pan }, None);

    assert!(down(&mut orch, 100.0, 100.0).is_empty());
    pointer_move(&mut orch, 130.0, 80.0);
    up(&mut orch, 130.0, 80.0);

    let camera = orch.camera();
    assert!((camera.pan_x - 30.0).abs() < f64::EPSILON);
    assert!((camera.pan_y + 20.0).abs() < f64::EPSILON);
    assert!(orch.selection().is_empty());
}

#[test]
fn middle_button_pans_in_select_mode() {
    let mut orch = ready();
    let event = PointerEvent { button: Button::Middle, ..PointerEvent::at(0.0, 0.0) };
    orch.handle(HostMessage::PointerDown { event }, None);
    assert!(matches!(orch.gesture(), Gesture::Panning { .. }));
}

// =============================================================================
// ZOOM REGENERATION
// =============================================================================

#[test]
fn regeneration_runs_only_past_the_threshold() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    let origin = Point::new(0.0, 0.0);

    orch.zoom_to(origin, 1.3);
    assert!(orch.zoom_end_deadline().is_some());
    assert!(!orch.on_zoom_end());
    assert!(orch.zoom_end_deadline().is_none());

    orch.zoom_to(origin, 1.6);
    assert!(orch.on_zoom_end());
    assert_eq!(orch.regenerations(), 1);
    assert!((orch.visual("a").unwrap().rendered_scale - 1.6).abs() < f64::EPSILON);

    orch.zoom_to(origin, 1.8);
    assert!(!orch.on_zoom_end());
    assert_eq!(orch.regenerations(), 1);
}

fn stroke_colors(visual: &Visual) -> Vec<u32> {
    visual
        .nodes
        .iter()
        .filter_map(|node| match node {
            VisualNode::Rect { stroke: Some(stroke), .. } | VisualNode::Circle { stroke: Some(stroke), .. } => {
                Some(stroke.color.0)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn regeneration_skips_broken_objects_and_keeps_flags() {
    let mut orch = ready();
    let mut bad = TableObject::new(ObjectKind::Stack, Position::new(200.0, 300.0), SortKey::new("b"));
    bad.fields.insert("cards".into(), json!(42));
    add(&mut orch, vec![("a", token(100.0, 100.0, "a")), ("bad", bad), ("c", token(300.0, 100.0, "c"))]);

    down(&mut orch, 100.0, 100.0);
    up(&mut orch, 100.0, 100.0);
    pointer_move(&mut orch, 300.0, 100.0);
    assert_eq!(orch.hovered(), Some("c"));

    orch.zoom_to(Point::new(0.0, 0.0), 1.6);
    assert!(orch.on_zoom_end());
    assert!(orch.visual("bad").is_none());

    let selected = orch.visual("a").unwrap();
    assert!((selected.rendered_scale - 1.6).abs() < f64::EPSILON);
    assert!(selected.flags.selected);
    assert!(stroke_colors(selected).contains(&SELECTION_COLOR));

    let hovered = orch.visual("c").unwrap();
    assert!((hovered.rendered_scale - 1.6).abs() < f64::EPSILON);
    assert!(hovered.flags.hovered);
    assert!(stroke_colors(hovered).contains(&HOVER_COLOR));
}

#[test]
fn wheel_zooms_around_the_pointer() {
    let mut orch = ready();
    let anchor = Point::new(200.0, 150.0);
    let before = orch.camera().screen_to_world(anchor);

    orch.handle(
        HostMessage::Wheel {
            event: WheelEvent { x: 200.0, y: 150.0, delta_x: 0.0, delta_y: -200.0, modifiers: Modifiers::default() },
        },
        None,
    );

    let camera = orch.camera();
    assert!(camera.zoom > 1.0);
    let after = camera.screen_to_world(anchor);
    assert!((after.x - before.x).abs() < 1e-9 && (after.y - before.y).abs() < 1e-9);
    assert!(orch.zoom_end_deadline().is_some());
}

#[test]
fn offscreen_objects_go_stale_until_visible() {
    let mut orch = ready();
    add(&mut orch, vec![("near", token(100.0, 100.0, "a")), ("far", token(5000.0, 5000.0, "a"))]);

    orch.zoom_to(Point::new(0.0, 0.0), 1.6);
    assert!(orch.on_zoom_end());
    assert!(!orch.is_stale("near"));
    assert!(orch.is_stale("far"));
    assert!((orch.visual("far").unwrap().rendered_scale - 1.0).abs() < f64::EPSILON);

    orch.handle(HostMessage::SetInteractionMode { mode: InteractionMode::Pan }, None);
    down(&mut orch, 0.0, 0.0);
    pointer_move(&mut orch, -7800.0, -7800.0);
    up(&mut orch, -7800.0, -7800.0);
    assert!(orch.compose_frame());

    assert!(!orch.is_stale("far"));
    assert!((orch.visual("far").unwrap().rendered_scale - 1.6).abs() < f64::EPSILON);
}

// =============================================================================
// FRAMES
// =============================================================================

#[test]
fn frame_draws_shadows_before_visuals_in_sort_order() {
    let mut orch = ready();
    add(&mut orch, vec![("top", token(300.0, 100.0, "m")), ("bottom", token(100.0, 100.0, "c"))]);
    down(&mut orch, 300.0, 100.0);
    up(&mut orch, 300.0, 100.0);

    assert!(orch.compose_frame());
    let frame = orch.surface().unwrap().last_frame().unwrap();

    assert!(matches!(&frame.items[0], DrawItem::Shadow { object_id, .. } if object_id == "top"));
    assert_eq!(frame.shadow_ids().collect::<Vec<_>>(), vec!["top"]);
    assert_eq!(frame.visual_ids().collect::<Vec<_>>(), vec!["bottom", "top"]);
}

#[test]
fn dragged_object_is_painted_last() {
    let mut orch = ready();
    add(&mut orch, vec![("low", token(100.0, 100.0, "c")), ("high", token(300.0, 100.0, "m"))]);
    down(&mut orch, 100.0, 100.0);
    pointer_move(&mut orch, 290.0, 100.0);

    assert!(orch.compose_frame());
    let frame = orch.surface().unwrap().last_frame().unwrap();
    assert_eq!(frame.visual_ids().collect::<Vec<_>>(), vec!["high", "low"]);
}

#[test]
fn offscreen_objects_are_not_drawn() {
    let mut orch = ready();
    add(&mut orch, vec![("near", token(100.0, 100.0, "a")), ("far", token(5000.0, 5000.0, "a"))]);
    assert!(orch.compose_frame());
    let frame = orch.surface().unwrap().last_frame().unwrap();
    assert_eq!(frame.visual_ids().collect::<Vec<_>>(), vec!["near"]);
}

#[test]
fn remote_drags_draw_ghosts_and_cursors() {
    let mut orch = ready();
    add(&mut orch, vec![("a", token(100.0, 100.0, "a"))]);
    orch.handle(
        HostMessage::AwarenessUpdate {
            states: vec![AwarenessEntry {
                actor_id: "them".into(),
                state: AwarenessState {
                    cursor: Some(Point::new(40.0, 50.0)),
                    drag: Some(RemoteDrag { id: "a".into(), x: 300.0, y: 200.0 }),
                },
            }],
        },
        None,
    );

    assert!(orch.compose_frame());
    let frame = orch.surface().unwrap().last_frame().unwrap();
    let ghost = frame.items.iter().find_map(|item| match item {
        DrawItem::Ghost { actor_id, visual } if actor_id == "them" => Some(visual),
        _ => None,
    });
    let ghost = ghost.unwrap();
    assert!(ghost.minimal);
    assert!((ghost.x - 300.0).abs() < f64::EPSILON);
    assert!((ghost.alpha - DRAG_ALPHA).abs() < f64::EPSILON);
    assert!(frame.items.iter().any(|item| matches!(item, DrawItem::Cursor { x, .. } if (*x - 40.0).abs() < f64::EPSILON)));
}

#[test]
fn no_surface_means_no_frame() {
    let (mut orch, _rx) = orchestrator_with(EngineConfig::default());
    add(&mut orch, vec![("a", token(0.0, 0.0, "a"))]);
    assert!(orch.visual("a").is_some());
    assert!(!orch.compose_frame());
}

// =============================================================================
// TEXTURES
// =============================================================================

struct MemoryFetcher;

#[async_trait]
impl TextureFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TextureError> {
        if url.contains("missing") {
            return Err(TextureError::Fetch { url: url.to_owned(), message: "not found".into() });
        }
        if url.contains("slow") {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        Ok(b"pixels".to_vec())
    }
}

struct SolidDecoder;

impl TextureDecoder for SolidDecoder {
    fn decode(&self, _url: &str, _bytes: &[u8]) -> Result<DecodedImage, TextureError> {
        Ok(DecodedImage { width: 2, height: 2, rgba: vec![255; 16] })
    }
}

fn with_memory_textures() -> (RenderOrchestrator, mpsc::Receiver<TextureEvent>) {
    let (tx, rx) = mpsc::channel(16);
    let pipeline = TexturePipeline {
        fetcher: Arc::new(MemoryFetcher),
        decoder: Arc::new(SolidDecoder),
        device: Arc::new(SoftwareDevice::default()),
    };
    let cache = TextureCache::new(pipeline, Duration::from_secs(5));
    let mut orch = RenderOrchestrator::new(EngineConfig::default(), Arc::new(BehaviorRegistry::with_defaults()), cache, tx);
    orch.handle(
        HostMessage::Init { width: 800.0, height: 600.0, pixel_ratio: 1.0 },
        Some(Surface::new(800.0, 600.0, 1.0)),
    );
    (orch, rx)
}

fn image_token(url: &str) -> TableObject {
    let mut object = token(100.0, 100.0, "a");
    object.meta.insert("imageUrl".into(), json!(url));
    object
}

#[tokio::test]
async fn ready_texture_rerenders_requesters() {
    let (mut orch, mut events) = with_memory_textures();
    add(&mut orch, vec![("a", image_token("mem://face.png")), ("b", image_token("mem://face.png"))]);
    assert_eq!(orch.visual("a").unwrap().textures().count(), 0);
    assert_eq!(orch.pending_texture_urls(), vec!["mem://face.png"]);

    let event = events.recv().await.unwrap();
    assert_eq!(event, TextureEvent::Ready("mem://face.png".into()));
    assert_eq!(orch.on_texture_event(&event), 2);

    assert_eq!(orch.visual("a").unwrap().textures().count(), 1);
    assert_eq!(orch.visual("b").unwrap().textures().count(), 1);
    assert!(orch.pending_texture_urls().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn object_rendered_during_slow_load_still_gets_the_texture() {
    let (mut orch, mut events) = with_memory_textures();
    add(&mut orch, vec![("a", image_token("mem://slow.png"))]);
    tokio::task::yield_now().await;

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(orch.textures().is_slow_loading("mem://slow.png"));
    add(&mut orch, vec![("b", image_token("mem://slow.png"))]);
    assert_eq!(orch.visual("b").unwrap().textures().count(), 0);

    let event = events.recv().await.unwrap();
    assert_eq!(event, TextureEvent::Ready("mem://slow.png".into()));
    assert_eq!(orch.on_texture_event(&event), 2);
    assert_eq!(orch.visual("a").unwrap().textures().count(), 1);
    assert_eq!(orch.visual("b").unwrap().textures().count(), 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn failed_texture_still_settles() {
    let (mut orch, mut events) = with_memory_textures();
    add(&mut orch, vec![("a", image_token("mem://missing.png"))]);

    let event = events.recv().await.unwrap();
    assert_eq!(event, TextureEvent::Failed("mem://missing.png".into()));
    assert_eq!(orch.on_texture_event(&event), 1);
    assert!(orch.textures().has_failed("mem://missing.png"));
    assert_eq!(orch.visual("a").unwrap().textures().count(), 0);
}

#[test]
fn texture_event_for_unknown_url_is_ignored() {
    let mut orch = ready();
    assert_eq!(orch.on_texture_event(&TextureEvent::Ready("nobody".into())), 0);
}
