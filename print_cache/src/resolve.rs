//! Tolerant print and oracle-id resolution
//!
//! Imported data is frequently stale (renumbered sets, legacy collector
//! numbers, localized exports), so every lookup falls back through
//! progressively looser strategies. The order of those strategies is relied
//! on by CSV import matching and must not be reshuffled.

use crate::index::PrintIndex;
use mtg_common::{collector_number_variants, leading_number, name_key, set_number_key, PrintRecord};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Set types never chosen by the name-only fallback
const NAME_ONLY_EXCLUDED_SET_TYPES: [&str; 3] = ["token", "memorabilia", "art_series"];

/// Layouts that are not "the card a person means" when resolving a name
const BANNED_LAYOUTS: [&str; 7] = [
    "art_series",
    "token",
    "double_faced_token",
    "planar",
    "scheme",
    "emblem",
    "vanguard",
];
const BANNED_SET_TYPES: [&str; 3] = ["token", "memorabilia", "art_series"];

/// One filter pass of oracle-id resolution
#[derive(Debug, Clone, Copy)]
struct CandidateFilter {
    exclude_banned: bool,
    require_physical: bool,
}

impl CandidateFilter {
    /// Strictest first; the last pass admits everything
    const PASSES: [CandidateFilter; 4] = [
        CandidateFilter {
            exclude_banned: true,
            require_physical: true,
        },
        CandidateFilter {
            exclude_banned: true,
            require_physical: false,
        },
        CandidateFilter {
            exclude_banned: false,
            require_physical: true,
        },
        CandidateFilter {
            exclude_banned: false,
            require_physical: false,
        },
    ];

    fn admits(&self, print: &PrintRecord) -> bool {
        if self.exclude_banned
            && (print.layout_is(&BANNED_LAYOUTS) || print.set_type_is(&BANNED_SET_TYPES))
        {
            return false;
        }
        !(self.require_physical && print.digital)
    }
}

fn oracle_of(print: &PrintRecord) -> Option<&str> {
    print.oracle_id.as_deref().filter(|o| !o.is_empty())
}

/// The single oracle id shared by every candidate that has one
fn unique_oracle<'a>(prints: impl Iterator<Item = &'a Arc<PrintRecord>>) -> Option<&'a str> {
    let ids: BTreeSet<&str> = prints.filter_map(|p| oracle_of(p)).collect();
    if ids.len() == 1 {
        ids.into_iter().next()
    } else {
        None
    }
}

/// Spellings of a card name worth probing:
/// the raw name, both halves of `"left // right"` and their re-joins,
/// the text before the first `/`, and the name without commas.
pub fn name_variants(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut add = |value: &str| {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    };

    add(raw);
    if let Some((left, right)) = raw.split_once("//") {
        let (left, right) = (left.trim(), right.trim());
        add(left);
        add(right);
        if !left.is_empty() && !right.is_empty() {
            add(&format!("{} // {}", left, right));
            add(&format!("{}//{}", left, right));
        }
    }
    if let Some((fragment, _)) = raw.split_once('/') {
        add(fragment);
    }
    if raw.contains(',') {
        add(&raw.replace(',', ""));
    }
    out
}

fn normalized_search_text(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl PrintIndex {
    /// Tolerant match for a print:
    /// 1. exact set + collector number
    /// 2. collector-number variants within the set
    /// 3. name within the set, then front-face name within the set
    /// 4. name only across sets, newest non-token printing
    pub fn find_print(
        &self,
        set_code: &str,
        collector_number: &str,
        name_hint: Option<&str>,
    ) -> Option<&Arc<PrintRecord>> {
        let set = set_code.trim().to_lowercase();
        let number = collector_number.trim();
        if set.is_empty() || number.is_empty() {
            return None;
        }

        if let Some(&pos) = self.by_set_and_number.get(&set_number_key(&set, number)) {
            return Some(self.at(pos));
        }

        if let Some(hit) = self.find_print_loose(&set, number, name_hint) {
            return Some(hit);
        }

        let key = name_hint.map(name_key).unwrap_or_default();
        if key.is_empty() {
            return None;
        }

        let wanted = leading_number(number);
        self.pick_in_set(&self.by_full_name, &key, &set, wanted)
            .or_else(|| self.pick_in_set(&self.by_front_face_name, &key, &set, wanted))
            .or_else(|| self.newest_by_name(&key))
    }

    /// Loose match: collector-number variants within the set, then the same
    /// leading number. The name hint only breaks ties.
    pub fn find_print_loose(
        &self,
        set_code: &str,
        collector_number: &str,
        name_hint: Option<&str>,
    ) -> Option<&Arc<PrintRecord>> {
        let set = set_code.trim().to_lowercase();
        let number = collector_number.trim();
        if set.is_empty() || number.is_empty() {
            return None;
        }

        let mut candidates: Vec<usize> = Vec::new();
        for variant in collector_number_variants(number) {
            if let Some(&pos) = self.by_set_and_number.get(&set_number_key(&set, &variant)) {
                if !candidates.contains(&pos) {
                    candidates.push(pos);
                }
            }
        }
        if candidates.is_empty() {
            if let Some(n) = leading_number(number) {
                if let Some(hits) = self.by_set_and_numeric_number.get(&(set, n)) {
                    candidates = hits.clone();
                }
            }
        }
        self.break_tie(&candidates, name_hint)
    }

    /// Prefer an exact name match, then a front-face match, then the first candidate
    fn break_tie(&self, candidates: &[usize], name_hint: Option<&str>) -> Option<&Arc<PrintRecord>> {
        let first = *candidates.first()?;
        let hint = match name_hint {
            Some(hint) if candidates.len() > 1 => hint,
            _ => return Some(self.at(first)),
        };

        let key = name_key(hint);
        if let Some(&pos) = candidates
            .iter()
            .find(|&&pos| name_key(&self.at(pos).name) == key)
        {
            return Some(self.at(pos));
        }

        let front_key = match hint.split_once("//") {
            Some((left, _)) => name_key(left),
            None => key,
        };
        let pos = candidates
            .iter()
            .copied()
            .find(|&pos| name_key(self.at(pos).front_face_name()) == front_key)
            .unwrap_or(first);
        Some(self.at(pos))
    }

    /// Name hits restricted to one set; several hits prefer the requested number
    fn pick_in_set(
        &self,
        name_index: &HashMap<String, Vec<usize>>,
        key: &str,
        set: &str,
        wanted: Option<u64>,
    ) -> Option<&Arc<PrintRecord>> {
        let in_set: Vec<&Arc<PrintRecord>> = Self::positions(name_index, key)
            .iter()
            .map(|&pos| self.at(pos))
            .filter(|print| print.set_key() == set)
            .collect();

        match in_set.as_slice() {
            [] => None,
            [only] => Some(*only),
            [first, ..] => {
                let same_number = wanted.and_then(|n| {
                    in_set
                        .iter()
                        .find(|print| leading_number(&print.collector_number) == Some(n))
                });
                Some(*same_number.unwrap_or(first))
            }
        }
    }

    /// Most recently released print with this name in any set
    fn newest_by_name(&self, key: &str) -> Option<&Arc<PrintRecord>> {
        let full = Self::positions(&self.by_full_name, key);
        let front = Self::positions(&self.by_front_face_name, key);

        let mut newest: Option<&Arc<PrintRecord>> = None;
        for print in full.iter().chain(front).map(|&pos| self.at(pos)) {
            if print.set_type_is(&NAME_ONLY_EXCLUDED_SET_TYPES) {
                continue;
            }
            let released = print.released_at.as_deref().unwrap_or("0000-00-00");
            let is_newer = newest.map_or(true, |best| {
                released > best.released_at.as_deref().unwrap_or("0000-00-00")
            });
            if is_newer {
                newest = Some(print);
            }
        }
        newest
    }

    /// Resolve a card name to the one oracle id it most plausibly means.
    ///
    /// Candidates come from the full, front-face and back-face name indexes
    /// for every spelling variant, ordered by print id. Filter passes relax
    /// from "physical, non-token" to "anything"; the first pass whose
    /// survivors share exactly one oracle id wins.
    pub fn unique_oracle_id_by_name(&self, name: &str) -> Option<String> {
        let key = name_key(name);
        if key.is_empty() {
            return None;
        }

        let variants = name_variants(name);
        let mut keys: BTreeSet<String> = variants
            .iter()
            .map(|v| name_key(v))
            .filter(|k| !k.is_empty())
            .collect();
        keys.insert(key);

        let mut seen: HashSet<&str> = HashSet::new();
        let mut candidates: Vec<&Arc<PrintRecord>> = Vec::new();
        for key in &keys {
            for map in [
                &self.by_full_name,
                &self.by_front_face_name,
                &self.by_back_face_name,
            ] {
                for &pos in Self::positions(map, key) {
                    let print = self.at(pos);
                    if seen.insert(print.id.as_str()) {
                        candidates.push(print);
                    }
                }
            }
        }
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        for pass in CandidateFilter::PASSES {
            let survivors = candidates.iter().copied().filter(|p| pass.admits(p));
            if let Some(oracle_id) = unique_oracle(survivors) {
                return Some(oracle_id.to_string());
            }
        }

        // Still ambiguous: first candidate whose own name or a face name is one of the variants
        candidates
            .iter()
            .filter(|print| {
                print
                    .all_names()
                    .any(|n| !n.is_empty() && keys.contains(&name_key(n)))
            })
            .find_map(|print| oracle_of(print))
            .map(str::to_string)
    }

    /// Every print of one logical card, ordered by (set, collector number)
    pub fn prints_for_oracle(&self, oracle_id: &str) -> Vec<Arc<PrintRecord>> {
        let mut prints: Vec<Arc<PrintRecord>> = Self::positions(&self.by_oracle, oracle_id)
            .iter()
            .map(|&pos| Arc::clone(self.at(pos)))
            .collect();
        prints.sort_by(|a, b| {
            a.set_code
                .cmp(&b.set_code)
                .then_with(|| a.collector_number.cmp(&b.collector_number))
        });
        prints
    }

    /// Look up a print by its Scryfall id
    pub fn print_by_id(&self, id: &str) -> Option<&Arc<PrintRecord>> {
        let id = id.trim();
        self.by_id
            .get(id)
            .or_else(|| self.by_id.get(&id.to_lowercase()))
            .map(|&pos| self.at(pos))
    }

    /// Prints in `set_code` whose full name matches `name`
    pub fn candidates_by_set_and_name(&self, set_code: &str, name: &str) -> Vec<Arc<PrintRecord>> {
        let set = set_code.trim().to_lowercase();
        Self::positions(&self.by_full_name, &name_key(name))
            .iter()
            .map(|&pos| self.at(pos))
            .filter(|print| print.set_key() == set)
            .cloned()
            .collect()
    }

    /// Substring search over print names, optionally within one set.
    ///
    /// Returns one page of matches (in load order) and the total match count.
    pub fn search_prints(
        &self,
        name_query: Option<&str>,
        set_code: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> (Vec<Arc<PrintRecord>>, usize) {
        let query = normalized_search_text(name_query.unwrap_or(""));
        let tokens: Vec<&str> = query.split(' ').filter(|t| !t.is_empty()).collect();
        let set = set_code.map(|s| s.trim().to_lowercase()).unwrap_or_default();

        let mut page = Vec::new();
        let mut total = 0usize;
        for print in &self.records {
            if !set.is_empty() && print.set_key() != set {
                continue;
            }
            if !tokens.is_empty() {
                let name = normalized_search_text(&print.name);
                if !tokens.iter().all(|t| name.contains(t)) {
                    continue;
                }
            }
            if total >= offset && (limit == 0 || page.len() < limit) {
                page.push(Arc::clone(print));
            }
            total += 1;
        }
        (page, total)
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
