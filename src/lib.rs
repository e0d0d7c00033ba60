//! Scene synchronization and spatial rendering engine for a shared tabletop.
//!
//! The engine turns a replicated document of table objects (card stacks,
//! tokens, zones, mats, counters, dice) into a live, hit-testable, zoomable
//! scene. Rendering can run on the host runtime or on an isolated renderer
//! thread; either way the host only talks to it through the typed message
//! protocol in [`protocol`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`object`] | Table objects, kinds, typed `meta` access, fractional sort keys |
//! | [`camera`] | Points, axis-aligned bounds, pan/zoom camera |
//! | [`assets`] | Asset descriptors pushed by the host (card faces, token images) |
//! | [`visual`] | Scene-graph nodes produced by behaviors |
//! | [`behavior`] | Per-kind render/bounds/shadow/capability registry |
//! | [`scene`] | Object map plus R-tree spatial index and hit-testing |
//! | [`texture`] | Async, deduplicating, failure-tracking texture cache |
//! | [`protocol`] | Host ⇄ renderer message enums and validation |
//! | [`surface`] | The exclusive drawing surface handed to the renderer |
//! | [`transport`] | Co-located or isolated message channel |
//! | [`host`] | Host-side client, surface handoff state machine |
//! | [`bridge`] | Replicated document → renderer diff forwarding |
//! | [`orchestrator`] | Diff application, zoom regeneration, interaction state |
//! | [`animation`] | Short-lived visual transitions (flip, move) |
//! | [`input`] | Pointer/wheel event types and interaction modes |
//! | [`renderer`] | Renderer execution context (task or thread) |
//! | [`config`] | Environment-driven engine configuration |
//! | [`consts`] | Shared numeric constants |

pub mod animation;
pub mod assets;
pub mod behavior;
pub mod bridge;
pub mod camera;
pub mod config;
pub mod consts;
pub mod host;
pub mod input;
pub mod object;
pub mod orchestrator;
pub mod protocol;
pub mod renderer;
pub mod scene;
pub mod surface;
pub mod texture;
pub mod transport;
pub mod visual;
