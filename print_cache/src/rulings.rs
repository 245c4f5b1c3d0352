//! Rulings index keyed by oracle id

use crate::error::Result;
use crate::store::read_json_array;
use mtg_common::{RawRuling, RulingEntry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Rulings grouped by lower-cased oracle id, each group oldest first
#[derive(Debug, Default)]
pub struct RulingsIndex {
    by_oracle: HashMap<String, Vec<RulingEntry>>,
    loaded_from: Option<PathBuf>,
}

impl RulingsIndex {
    pub fn from_rulings(rulings: Vec<RawRuling>) -> Self {
        let mut by_oracle: HashMap<String, Vec<RulingEntry>> = HashMap::new();
        for ruling in rulings {
            let Some(oracle_id) = ruling
                .oracle_id
                .as_deref()
                .map(|o| o.trim().to_lowercase())
                .filter(|o| !o.is_empty())
            else {
                continue;
            };
            by_oracle.entry(oracle_id).or_default().push(ruling.into());
        }
        for entries in by_oracle.values_mut() {
            entries.sort_by(|a, b| {
                a.published_at
                    .as_deref()
                    .unwrap_or("")
                    .cmp(b.published_at.as_deref().unwrap_or(""))
            });
        }
        Self {
            by_oracle,
            loaded_from: None,
        }
    }

    /// Load the rulings bulk file
    pub fn load(path: &Path) -> Result<Self> {
        let rulings: Vec<RawRuling> = read_json_array(path)?;
        let mut index = Self::from_rulings(rulings);
        index.loaded_from = Some(path.to_path_buf());
        log::info!(
            "Loaded {} rulings for {} oracle ids from {}",
            index.entry_count(),
            index.oracle_count(),
            path.display()
        );
        Ok(index)
    }

    pub fn rulings_for(&self, oracle_id: &str) -> &[RulingEntry] {
        self.by_oracle
            .get(&oracle_id.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn oracle_count(&self) -> usize {
        self.by_oracle.len()
    }

    pub fn entry_count(&self) -> usize {
        self.by_oracle.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oracle.is_empty()
    }

    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RULINGS: &str = r#"[
        {"oracle_id": "ABC", "source": "wotc", "published_at": "2021-06-01", "comment": "Later."},
        {"oracle_id": "abc", "source": "scryfall", "published_at": "2019-01-01", "comment": "Earlier."},
        {"oracle_id": "def", "source": "wotc", "published_at": "2020-01-01", "comment": "Other card."},
        {"source": "wotc", "published_at": "2020-01-01", "comment": "Orphan."}
    ]"#;

    #[test]
    fn groups_by_lowercased_oracle_and_sorts() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", RULINGS).unwrap();

        let index = RulingsIndex::load(file.path()).unwrap();
        assert_eq!(index.oracle_count(), 2);
        assert_eq!(index.entry_count(), 3);
        assert_eq!(index.loaded_from(), Some(file.path()));

        let rulings = index.rulings_for("Abc");
        assert_eq!(rulings.len(), 2);
        assert_eq!(rulings[0].comment.as_deref(), Some("Earlier."));
        assert_eq!(rulings[1].source.as_deref(), Some("wotc"));
    }

    #[test]
    fn unknown_oracle_has_no_rulings() {
        let index = RulingsIndex::default();
        assert!(index.rulings_for("anything").is_empty());
        assert!(index.is_empty());
    }
}
