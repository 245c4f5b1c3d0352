//! Scryfall print record (one physical or digital printing of a card)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single print from the Scryfall `default_cards` bulk file.
///
/// Only the fields the cache engine reads are modelled; everything else in the
/// payload is ignored on deserialization.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PrintRecord {
    pub id: String,
    #[serde(default)]
    pub oracle_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Set code, e.g. `"lci"`
    #[serde(rename = "set", default)]
    pub set_code: String,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub set_type: Option<String>,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default, alias = "mana_value")]
    pub cmc: Option<f64>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub released_at: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For multi-faced cards, names and images are in card_faces
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub legalities: HashMap<String, String>,
    #[serde(default)]
    pub digital: bool,
    #[serde(default)]
    pub illustration_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CardFace {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

/// Image URLs for one print plus a short `"SET #cn"` label
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ImageSet {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
    pub label: String,
}

impl PrintRecord {
    fn faces(&self) -> &[CardFace] {
        self.card_faces.as_deref().unwrap_or(&[])
    }

    /// Name of the first face for multi-faced layouts, else the plain name
    pub fn front_face_name(&self) -> &str {
        match self.faces().first() {
            Some(face) => &face.name,
            None => &self.name,
        }
    }

    /// Names of every face after the first (empty for single-faced cards)
    pub fn back_face_names(&self) -> impl Iterator<Item = &str> {
        self.faces()
            .iter()
            .skip(1)
            .map(|face| face.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// The print name followed by every face name
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.faces().iter().map(|f| f.name.as_str()))
    }

    /// Lower-cased set code
    pub fn set_key(&self) -> String {
        self.set_code.trim().to_lowercase()
    }

    pub fn layout_is(&self, layouts: &[&str]) -> bool {
        let layout = self.layout.as_deref().unwrap_or("").to_lowercase();
        layouts.contains(&layout.as_str())
    }

    pub fn set_type_is(&self, set_types: &[&str]) -> bool {
        let set_type = self.set_type.as_deref().unwrap_or("").to_lowercase();
        set_types.contains(&set_type.as_str())
    }

    /// Face names joined with `" // "`, collapsing `X // X` to `X`
    pub fn display_name(&self) -> String {
        let names: Vec<&str> = self
            .faces()
            .iter()
            .map(|f| f.name.trim())
            .filter(|n| !n.is_empty())
            .collect();
        match names.as_slice() {
            [] => self.name.clone(),
            [first, .., last] if first.to_lowercase() == last.to_lowercase() => first.to_string(),
            _ => names.join(" // "),
        }
    }

    /// Face type lines joined with `" // "` (e.g. `Creature — Dragon // Sorcery — Adventure`),
    /// falling back to the top-level type line
    pub fn type_label(&self) -> String {
        let mut seen = Vec::new();
        let mut lines: Vec<&str> = Vec::new();
        for face in self.faces() {
            let line = face.type_line.as_deref().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let key = line.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            lines.push(line);
        }
        if lines.is_empty() {
            return self.type_line.as_deref().unwrap_or("").trim().to_string();
        }
        lines.join(" // ")
    }

    /// Get the print's image URIs
    pub fn image_uris(&self) -> ImageUris {
        // Try direct image_uris first
        if let Some(ref uris) = self.image_uris {
            return uris.clone();
        }
        // For double-faced cards, use the front face images
        self.faces()
            .first()
            .and_then(|face| face.image_uris.clone())
            .unwrap_or_default()
    }

    /// Get the primary image URL (normal size)
    pub fn image_url(&self) -> Option<String> {
        self.image_uris().normal
    }

    pub fn image_set(&self) -> ImageSet {
        let uris = self.image_uris();
        let set = self.set_code.to_uppercase();
        let label = if set.is_empty() && self.collector_number.is_empty() {
            String::new()
        } else {
            format!("{} #{}", set, self.collector_number)
        };
        ImageSet {
            small: uris.small,
            normal: uris.normal,
            large: uris.large,
            label,
        }
    }
}
