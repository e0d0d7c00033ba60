use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_environment_gives_defaults() {
    assert_eq!(EngineConfig::from_lookup(lookup(&[])), EngineConfig::default());
}

#[test]
fn overrides_are_parsed() {
    let cfg = EngineConfig::from_lookup(lookup(&[
        ("TABLESCENE_TRANSPORT", "co-located"),
        ("TABLESCENE_CHANNEL_CAPACITY", "64"),
        ("TABLESCENE_SLOW_LOAD_MS", "250"),
        ("TABLESCENE_REGEN_ZOOM_DELTA", "0.25"),
        ("TABLESCENE_ZOOM_END_DEBOUNCE_MS", "80"),
        ("TABLESCENE_REQUEST_TIMEOUT_MS", "900"),
        ("TABLESCENE_BRIDGE_CHUNK_SIZE", "50"),
        ("TABLESCENE_GRID_SNAP", " 10 "),
    ]));
    assert_eq!(cfg.transport, TransportMode::CoLocated);
    assert_eq!(cfg.channel_capacity, 64);
    assert_eq!(cfg.slow_load, Duration::from_millis(250));
    assert!((cfg.regen_zoom_delta - 0.25).abs() < f64::EPSILON);
    assert_eq!(cfg.zoom_end_debounce, Duration::from_millis(80));
    assert_eq!(cfg.request_timeout, Duration::from_millis(900));
    assert_eq!(cfg.bridge_chunk_size, 50);
    assert!((cfg.grid_size - 10.0).abs() < f64::EPSILON);
}

#[test]
fn garbage_falls_back_to_defaults() {
    let cfg = EngineConfig::from_lookup(lookup(&[
        ("TABLESCENE_TRANSPORT", "carrier-pigeon"),
        ("TABLESCENE_CHANNEL_CAPACITY", "lots"),
        ("TABLESCENE_SLOW_LOAD_MS", "-5"),
    ]));
    assert_eq!(cfg.transport, TransportMode::Isolated);
    assert_eq!(cfg.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    assert_eq!(cfg.slow_load, Duration::from_millis(DEFAULT_SLOW_LOAD_MS));
}

#[test]
fn zero_sizes_are_clamped() {
    let cfg = EngineConfig::from_lookup(lookup(&[
        ("TABLESCENE_CHANNEL_CAPACITY", "0"),
        ("TABLESCENE_BRIDGE_CHUNK_SIZE", "0"),
    ]));
    assert_eq!(cfg.channel_capacity, 1);
    assert_eq!(cfg.bridge_chunk_size, 1);
}
