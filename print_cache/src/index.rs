//! Secondary indexes over the print store
//!
//! Built in a single pass whenever the store is (re)loaded. Indexes hold
//! positions into `records`; the records themselves are shared `Arc`s so a
//! lookup can hand one out without copying.

use mtg_common::{leading_number, name_key, set_number_key, PrintRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Entry counts per index, reported by cache stats
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSizes {
    pub by_id: usize,
    pub by_set_and_number: usize,
    pub by_oracle: usize,
    pub by_set_and_numeric_number: usize,
    pub by_full_name: usize,
    pub by_front_face_name: usize,
    pub by_back_face_name: usize,
}

/// The print store plus every derived lookup table
#[derive(Debug, Default)]
pub struct PrintIndex {
    pub(crate) records: Vec<Arc<PrintRecord>>,
    pub(crate) by_id: HashMap<String, usize>,
    pub(crate) by_set_and_number: HashMap<String, usize>,
    pub(crate) by_oracle: HashMap<String, Vec<usize>>,
    pub(crate) by_set_and_numeric_number: HashMap<(String, u64), Vec<usize>>,
    pub(crate) by_full_name: HashMap<String, Vec<usize>>,
    pub(crate) by_front_face_name: HashMap<String, Vec<usize>>,
    pub(crate) by_back_face_name: HashMap<String, Vec<usize>>,
}

fn push_keyed(map: &mut HashMap<String, Vec<usize>>, key: String, pos: usize) {
    if !key.is_empty() {
        map.entry(key).or_default().push(pos);
    }
}

impl PrintIndex {
    /// Index a freshly loaded store
    pub fn build(prints: Vec<PrintRecord>) -> Self {
        let mut index = Self {
            records: Vec::with_capacity(prints.len()),
            ..Self::default()
        };

        for (pos, print) in prints.into_iter().enumerate() {
            let set = print.set_key();
            let number = print.collector_number.trim();

            if index.by_id.insert(print.id.clone(), pos).is_some() {
                log::warn!("Duplicate print id {}, keeping the later record", print.id);
            }

            if !set.is_empty() && !number.is_empty() {
                // Last write wins; real duplicates are data errors upstream
                index
                    .by_set_and_number
                    .insert(set_number_key(&set, number), pos);
                if let Some(n) = leading_number(number) {
                    index
                        .by_set_and_numeric_number
                        .entry((set.clone(), n))
                        .or_default()
                        .push(pos);
                }
            }

            if let Some(oracle_id) = print.oracle_id.as_deref().filter(|o| !o.is_empty()) {
                index
                    .by_oracle
                    .entry(oracle_id.to_string())
                    .or_default()
                    .push(pos);
            }

            push_keyed(&mut index.by_full_name, name_key(&print.name), pos);
            push_keyed(
                &mut index.by_front_face_name,
                name_key(print.front_face_name()),
                pos,
            );
            for back in print.back_face_names() {
                push_keyed(&mut index.by_back_face_name, name_key(back), pos);
            }

            index.records.push(Arc::new(print));
        }

        log::info!(
            "Indexed {} prints ({} oracle ids, {} set/number keys)",
            index.records.len(),
            index.by_oracle.len(),
            index.by_set_and_number.len()
        );
        index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all prints in load order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PrintRecord>> {
        self.records.iter()
    }

    pub fn oracle_count(&self) -> usize {
        self.by_oracle.len()
    }

    pub fn sizes(&self) -> IndexSizes {
        IndexSizes {
            by_id: self.by_id.len(),
            by_set_and_number: self.by_set_and_number.len(),
            by_oracle: self.by_oracle.len(),
            by_set_and_numeric_number: self.by_set_and_numeric_number.len(),
            by_full_name: self.by_full_name.len(),
            by_front_face_name: self.by_front_face_name.len(),
            by_back_face_name: self.by_back_face_name.len(),
        }
    }

    pub(crate) fn at(&self, pos: usize) -> &Arc<PrintRecord> {
        &self.records[pos]
    }

    pub(crate) fn positions<'a>(
        map: &'a HashMap<String, Vec<usize>>,
        key: &str,
    ) -> &'a [usize] {
        map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
