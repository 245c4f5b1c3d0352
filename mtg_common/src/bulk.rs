//! Scryfall bulk-data index (`GET /bulk-data`)

use serde::{Deserialize, Serialize};

/// Descriptor for one downloadable bulk dataset
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BulkDataset {
    /// Dataset kind, e.g. `default_cards` or `rulings`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub download_uri: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_encoding: Option<String>,
}

/// Response body of the bulk metadata endpoint
#[derive(Debug, Deserialize, Default)]
pub struct BulkIndex {
    #[serde(default)]
    pub data: Vec<BulkDataset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_index_deserializes() {
        let json = r#"{
            "object": "list",
            "has_more": false,
            "data": [
                {
                    "object": "bulk_data",
                    "type": "default_cards",
                    "name": "Default Cards",
                    "download_uri": "https://data.scryfall.io/default-cards/default-cards.json",
                    "updated_at": "2024-01-01T10:00:00.000+00:00",
                    "size": 123456
                },
                { "type": "rulings" }
            ]
        }"#;
        let index: BulkIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.data.len(), 2);
        assert_eq!(index.data[0].kind, "default_cards");
        assert_eq!(index.data[0].size, Some(123456));
        assert!(index.data[1].download_uri.is_none());
    }
}
