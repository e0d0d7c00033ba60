//! Object model: table objects, their kinds, and fractional sort keys.
//!
//! This module defines the plain snapshot types that cross the boundary from
//! the replicated document into the engine (`TableObject`, `ObjectKind`,
//! `Position`), a typed accessor for the open-ended `meta` bag (`Meta`), and
//! the lexicographic z-order key (`SortKey`).
//!
//! Objects arrive as camelCase JSON. Kind-specific fields (a stack's `cards`
//! and `faceUp`, for example) are kept in the flattened `fields` map and read
//! by the behavior registered for that kind.

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::camera::Point;

/// Unique identifier for a table object, as assigned by the replicated document.
pub type ObjectId = String;

/// Identity of a participant (local or remote) in the shared session.
pub type ActorId = String;

/// The kind of a table object. Never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A pile of one or more cards.
    Stack,
    /// A round game piece.
    Token,
    /// A labeled region that other objects can be placed into.
    Zone,
    /// A large background surface, optionally gridded.
    Mat,
    /// A numeric tracker.
    Counter,
    /// A die showing its current face.
    Dice,
}

impl ObjectKind {
    /// Every kind, in declaration order.
    pub const ALL: [ObjectKind; 6] = [Self::Stack, Self::Token, Self::Zone, Self::Mat, Self::Counter, Self::Dice];

    /// The wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::Token => "token",
            Self::Zone => "zone",
            Self::Mat => "mat",
            Self::Counter => "counter",
            Self::Dice => "dice",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// World-space placement of an object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    /// Clockwise rotation in degrees around the object's center.
    #[serde(default, alias = "r")]
    pub rotation: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, rotation: 0.0 }
    }

    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A table object as it is rendered and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableObject {
    /// Behavior discriminant.
    pub kind: ObjectKind,
    /// Center of the object in world coordinates.
    pub position: Position,
    /// Object this one sits inside (a zone, for example).
    #[serde(default)]
    pub container_id: Option<ObjectId>,
    /// Z-order key; higher keys are drawn above lower keys.
    pub sort_key: SortKey,
    /// Locked objects can be selected but not moved.
    #[serde(default)]
    pub locked: bool,
    /// Actor currently holding a selection on this object.
    #[serde(default)]
    pub selected_by: Option<ActorId>,
    /// Open-ended decoration bag (color, size, label, image URL, ...).
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// Kind-specific fields such as a stack's `cards` and `faceUp`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TableObject {
    /// Create an object with empty `meta` and no kind-specific fields.
    #[must_use]
    pub fn new(kind: ObjectKind, position: Position, sort_key: SortKey) -> Self {
        Self {
            kind,
            position,
            container_id: None,
            sort_key,
            locked: false,
            selected_by: None,
            meta: Map::new(),
            fields: Map::new(),
        }
    }

    /// Typed view over `meta`.
    #[must_use]
    pub fn meta(&self) -> Meta<'_> {
        Meta::new(&self.meta)
    }
}

/// Typed access to common `meta` fields.
pub struct Meta<'a> {
    value: &'a Map<String, Value>,
}

impl<'a> Meta<'a> {
    /// Wrap a reference to a `meta` map for typed access.
    #[must_use]
    pub fn new(value: &'a Map<String, Value>) -> Self {
        Self { value }
    }

    /// Raw value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.value.get(key)
    }

    /// Numeric field, or `default` when absent, non-numeric, or not finite.
    #[must_use]
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.value
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    /// Positive numeric field, or `default` when absent or not positive.
    #[must_use]
    pub fn size_or(&self, key: &str, default: f64) -> f64 {
        let v = self.f64_or(key, default);
        if v > 0.0 { v } else { default }
    }

    /// Integer field, or `default` when absent. Floats are rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.value
            .get(key)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
            .unwrap_or(default)
    }

    /// String field, if present and a string.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.value.get(key).and_then(Value::as_str)
    }

    /// Display label. Empty string when absent.
    #[must_use]
    pub fn label(&self) -> &'a str {
        self.str("label").unwrap_or("")
    }

    /// Image URL to draw in place of a solid fill, if any.
    #[must_use]
    pub fn image_url(&self) -> Option<&'a str> {
        self.str("imageUrl").filter(|s| !s.is_empty())
    }
}

// =============================================================
// Sort keys
// =============================================================

const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Error returned by [`SortKey::between`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortKeyError {
    /// The lower bound is not strictly below the upper bound.
    #[error("sort key bounds out of order: {lower} >= {upper}")]
    OutOfOrder { lower: String, upper: String },
    /// A key contains a character outside `0-9a-z` or ends in `0`.
    #[error("invalid sort key: {0:?}")]
    Invalid(String),
}

/// Opaque z-order key. Ordering is lexicographic on the underlying bytes,
/// so `"10" < "9"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKey(String);

impl SortKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a key strictly between `lower` and `upper` (either may be open).
    ///
    /// # Errors
    ///
    /// Returns [`SortKeyError::OutOfOrder`] if `lower >= upper` and
    /// [`SortKeyError::Invalid`] for keys outside the base-36 alphabet.
    pub fn between(lower: Option<&SortKey>, upper: Option<&SortKey>) -> Result<SortKey, SortKeyError> {
        let a = lower.map_or("", SortKey::as_str);
        let b = upper.map(SortKey::as_str);
        for key in [Some(a), b].into_iter().flatten() {
            if key.bytes().any(|c| !DIGITS.contains(&c)) || key.ends_with('0') {
                return Err(SortKeyError::Invalid(key.to_owned()));
            }
        }
        if let Some(b) = b {
            if a >= b {
                return Err(SortKeyError::OutOfOrder { lower: a.to_owned(), upper: b.to_owned() });
            }
        }
        Ok(SortKey(midpoint(a.as_bytes(), b.map(str::as_bytes))))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SortKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

fn digit_index(c: u8) -> usize {
    DIGITS.iter().position(|d| *d == c).unwrap_or(0)
}

/// Midpoint of two base-36 fractions, `a < b`, neither ending in `0`.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> String {
    if let Some(b) = b {
        // Shared prefix (with `a` padded by zeros) is carried over verbatim.
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(b'0') == b[n] {
            n += 1;
        }
        if n > 0 {
            let prefix = String::from_utf8_lossy(&b[..n]).into_owned();
            let rest_a = a.get(n..).unwrap_or(&[]);
            return prefix + &midpoint(rest_a, Some(&b[n..]));
        }
    }

    let digit_a = a.first().map_or(0, |c| digit_index(*c));
    let digit_b = b.and_then(|b| b.first()).map_or(DIGITS.len(), |c| digit_index(*c));

    if digit_b - digit_a > 1 {
        let mid = (digit_a + digit_b).div_ceil(2);
        return char::from(DIGITS[mid]).to_string();
    }

    match b {
        Some(b) if b.len() > 1 => char::from(b[0]).to_string(),
        _ => {
            let head = char::from(DIGITS[digit_a]);
            let rest = a.get(1..).unwrap_or(&[]);
            format!("{head}{}", midpoint(rest, None))
        }
    }
}
