//! Resolved asset descriptors pushed by the host with `set-game-assets`.
//!
//! Loading and validating asset packs happens outside the engine; this module
//! only describes the shape the renderer consumes and a few lookups used by
//! behaviors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Card image pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardAsset {
    /// Face image URL.
    pub face: String,
    /// Per-card back image URL. Falls back to [`GameAssets::card_back`].
    #[serde(default)]
    pub back: Option<String>,
}

/// Token image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAsset {
    pub image: String,
}

/// The asset set for the loaded scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAssets {
    #[serde(default)]
    pub name: String,
    /// Shared card back image URL.
    #[serde(default)]
    pub card_back: Option<String>,
    #[serde(default)]
    pub cards: HashMap<String, CardAsset>,
    #[serde(default)]
    pub tokens: HashMap<String, TokenAsset>,
}

impl GameAssets {
    /// Image URL for a card, showing its face or its back.
    #[must_use]
    pub fn card_image(&self, card_id: &str, face_up: bool) -> Option<&str> {
        let card = self.cards.get(card_id);
        if face_up {
            return card.map(|c| c.face.as_str());
        }
        card.and_then(|c| c.back.as_deref())
            .or(self.card_back.as_deref())
    }

    /// Image URL for a token asset.
    #[must_use]
    pub fn token_image(&self, asset_id: &str) -> Option<&str> {
        self.tokens.get(asset_id).map(|t| t.image.as_str())
    }
}
