//! Scryfall rulings

use serde::{Deserialize, Serialize};

/// One row of the Scryfall `rulings` bulk file
#[derive(Debug, Deserialize, Clone)]
pub struct RawRuling {
    #[serde(default)]
    pub oracle_id: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A ruling attached to one logical card
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RulingEntry {
    pub published_at: Option<String>,
    pub source: Option<String>,
    pub comment: Option<String>,
}

impl From<RawRuling> for RulingEntry {
    fn from(raw: RawRuling) -> Self {
        Self {
            published_at: raw.published_at,
            source: raw.source,
            comment: raw.comment,
        }
    }
}
