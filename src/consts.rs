//! Shared numeric constants for the scene engine.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed camera scale.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed camera scale.
pub const MAX_ZOOM: f64 = 8.0;

/// Wheel delta (pixels) to zoom exponent factor.
pub const WHEEL_ZOOM_SENSITIVITY: f64 = 0.0015;

// ── Strokes and labels ──────────────────────────────────────────

/// Lower clamp on the scale used for stroke counter-scaling.
pub const MIN_STROKE_SCALE: f64 = 0.05;

/// Upper clamp on label render resolution.
pub const MAX_TEXT_RESOLUTION: f64 = 4.0;

/// World-unit stroke width for the selection outline at scale 1.
pub const SELECTION_STROKE: f64 = 3.0;

/// World-unit stroke width for the hover outline at scale 1.
pub const HOVER_STROKE: f64 = 2.0;

/// Base stroke width for object borders at scale 1.
pub const BORDER_STROKE: f64 = 1.5;

/// Gap between an object's edge and its selection outline, in world units.
pub const OUTLINE_GAP: f64 = 4.0;

/// Alpha applied to a visual while it is being dragged.
pub const DRAG_ALPHA: f64 = 0.85;

// ── Colors (0xRRGGBB) ───────────────────────────────────────────

pub const SELECTION_COLOR: u32 = 0x3B82F6;
pub const HOVER_COLOR: u32 = 0x93C5FD;
pub const REMOTE_SELECTION_COLOR: u32 = 0xF59E0B;
pub const BORDER_COLOR: u32 = 0x1F1A17;
pub const PLACEHOLDER_COLOR: u32 = 0x9CA3AF;
pub const LABEL_COLOR: u32 = 0x111827;
pub const BADGE_COLOR: u32 = 0xDC2626;
pub const BADGE_TEXT_COLOR: u32 = 0xFFFFFF;

// ── Object defaults (world units) ───────────────────────────────

pub const CARD_WIDTH: f64 = 100.0;
pub const CARD_HEIGHT: f64 = 140.0;
pub const CARD_CORNER_RADIUS: f64 = 6.0;

/// Maximum number of offset edges drawn under a stack to suggest thickness.
pub const STACK_MAX_EDGES: usize = 3;

pub const TOKEN_SIZE: f64 = 40.0;
pub const ZONE_WIDTH: f64 = 300.0;
pub const ZONE_HEIGHT: f64 = 200.0;
pub const MAT_WIDTH: f64 = 800.0;
pub const MAT_HEIGHT: f64 = 600.0;
pub const COUNTER_SIZE: f64 = 48.0;
pub const DICE_SIZE: f64 = 36.0;

/// Grid lines beyond this count per axis are skipped.
pub const MAX_GRID_LINES: usize = 200;

// ── Animation ───────────────────────────────────────────────────

pub const FLIP_ANIMATION_MS: u64 = 250;
pub const MOVE_ANIMATION_MS: u64 = 150;

// ── Fills ───────────────────────────────────────────────────────

pub const CARD_FACE_COLOR: u32 = 0xFFFFFF;
pub const CARD_BACK_COLOR: u32 = 0x1E3A8A;
pub const TOKEN_COLOR: u32 = 0xEF4444;
pub const ZONE_COLOR: u32 = 0xE5E7EB;
pub const MAT_COLOR: u32 = 0x14532D;
pub const GRID_COLOR: u32 = 0x166534;
pub const COUNTER_COLOR: u32 = 0xFDE68A;
pub const DICE_COLOR: u32 = 0xF9FAFB;
pub const PIP_COLOR: u32 = 0x111827;

// ── Text ────────────────────────────────────────────────────────

pub const LABEL_FONT_SIZE: f64 = 14.0;
pub const BADGE_FONT_SIZE: f64 = 11.0;
pub const BADGE_RADIUS: f64 = 10.0;
