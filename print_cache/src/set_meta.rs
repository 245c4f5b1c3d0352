//! Per-set aggregates: display names, release dates, colour/curve profiles
//! and image samples
//!
//! Both aggregates are computed from one full pass over the store, on first
//! access, and live as long as the store generation they were built from.

use mtg_common::{PrintRecord, WUBRG};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Layouts that never count as spells in a set profile
const PROFILE_SKIP_LAYOUTS: [&str; 8] = [
    "token",
    "double_faced_token",
    "art_series",
    "emblem",
    "vanguard",
    "scheme",
    "plane",
    "planar",
];

/// Set code -> display name / earliest release date
#[derive(Debug, Default)]
pub struct SetMetadata {
    names: HashMap<String, String>,
    releases: HashMap<String, String>,
    codes: BTreeSet<String>,
}

impl SetMetadata {
    pub fn build<'a>(prints: impl IntoIterator<Item = &'a Arc<PrintRecord>>) -> Self {
        let mut meta = Self::default();
        for print in prints {
            let code = print.set_key();
            if code.is_empty() {
                continue;
            }
            if let Some(name) = print.set_name.as_deref().filter(|n| !n.is_empty()) {
                meta.names
                    .entry(code.clone())
                    .or_insert_with(|| name.to_string());
            }
            if let Some(released) = print.released_at.as_deref().filter(|r| !r.is_empty()) {
                let earliest = meta
                    .releases
                    .entry(code.clone())
                    .or_insert_with(|| released.to_string());
                if released < earliest.as_str() {
                    *earliest = released.to_string();
                }
            }
            meta.codes.insert(code);
        }
        meta
    }

    pub fn display_name(&self, code: &str) -> Option<&str> {
        self.names.get(&code.trim().to_lowercase()).map(String::as_str)
    }

    pub fn release_date(&self, code: &str) -> Option<&str> {
        self.releases
            .get(&code.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Every set code in the store, sorted
    pub fn codes(&self) -> Vec<String> {
        self.codes.iter().cloned().collect()
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Colorless,
    Mono,
    Multi,
    Mixed,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurveBucket {
    Low,
    Mid,
    High,
}

impl CurveBucket {
    pub fn for_mean(mean: f64) -> Self {
        if mean <= 3.0 {
            CurveBucket::Low
        } else if mean <= 4.5 {
            CurveBucket::Mid
        } else {
            CurveBucket::High
        }
    }
}

/// Statistical profile of the nonland spells in one set
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct SetProfile {
    /// Mean mana value, rounded to two decimals
    pub avg_mv: Option<f64>,
    pub curve_bucket: Option<CurveBucket>,
    /// Up to three colours, most frequent first, ties in WUBRG order
    pub dominant_colors: Vec<char>,
    pub color_presence: Vec<char>,
    pub color_mode: ColorMode,
    pub nonland_spells: u32,
    pub mono_cards: u32,
    pub multicolor_cards: u32,
    pub colorless_cards: u32,
    pub color_counts: BTreeMap<char, u32>,
}

#[derive(Debug, Default)]
struct ProfileTally {
    color_counts: [u32; 5],
    nonland_spells: u32,
    mv_total: f64,
    mv_samples: u32,
    mono_cards: u32,
    multicolor_cards: u32,
    colorless_cards: u32,
}

fn counts_as_spell(print: &PrintRecord) -> bool {
    if print.layout_is(&PROFILE_SKIP_LAYOUTS) {
        return false;
    }
    let type_line = print.type_line.as_deref().unwrap_or("").to_lowercase();
    !(type_line.contains("token") || type_line.contains("emblem") || type_line.contains("land"))
}

impl ProfileTally {
    fn add(&mut self, print: &PrintRecord) {
        self.nonland_spells += 1;
        if let Some(mv) = print.cmc.filter(|mv| mv.is_finite()) {
            self.mv_total += mv;
            self.mv_samples += 1;
        }

        let raw: &[String] = if print.color_identity.is_empty() {
            print.colors.as_deref().unwrap_or(&[])
        } else {
            &print.color_identity
        };
        let identity: BTreeSet<String> = raw
            .iter()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        match identity.len() {
            0 => self.colorless_cards += 1,
            1 => self.mono_cards += 1,
            _ => self.multicolor_cards += 1,
        }
        for symbol in &identity {
            if let Some(i) = WUBRG.iter().position(|c| symbol.len() == 1 && symbol.starts_with(*c)) {
                self.color_counts[i] += 1;
            }
        }
    }

    fn finish(self) -> SetProfile {
        let mut palette: Vec<(usize, u32)> = self.color_counts.iter().copied().enumerate().collect();
        // Stable sort keeps WUBRG order among equal counts
        palette.sort_by(|a, b| b.1.cmp(&a.1));
        let present: Vec<char> = palette
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|&(i, _)| WUBRG[i])
            .collect();
        let dominant_colors = present.iter().copied().take(3).collect();

        let avg_mv = (self.mv_samples > 0)
            .then(|| (self.mv_total / f64::from(self.mv_samples) * 100.0).round() / 100.0);

        let color_mode = if present.is_empty() {
            ColorMode::Colorless
        } else if self.multicolor_cards > 0 {
            ColorMode::Multi
        } else if present.len() == 1 {
            ColorMode::Mono
        } else {
            ColorMode::Mixed
        };

        SetProfile {
            avg_mv,
            curve_bucket: avg_mv.map(CurveBucket::for_mean),
            dominant_colors,
            color_presence: present,
            color_mode,
            nonland_spells: self.nonland_spells,
            mono_cards: self.mono_cards,
            multicolor_cards: self.multicolor_cards,
            colorless_cards: self.colorless_cards,
            color_counts: WUBRG.iter().copied().zip(self.color_counts).collect(),
        }
    }
}

/// Build a profile for every set in one pass over the store
pub fn build_set_profiles<'a>(
    prints: impl IntoIterator<Item = &'a Arc<PrintRecord>>,
) -> HashMap<String, SetProfile> {
    let mut tallies: HashMap<String, ProfileTally> = HashMap::new();
    for print in prints {
        let code = print.set_key();
        if code.is_empty() || !counts_as_spell(print) {
            continue;
        }
        tallies.entry(code).or_default().add(print);
    }
    log::debug!("Built set profiles for {} sets", tallies.len());
    tallies
        .into_iter()
        .map(|(code, tally)| (code, tally.finish()))
        .collect()
}

/// Number of image samples returned per set by default
pub const DEFAULT_IMAGE_SAMPLES: usize = 6;

/// Artwork of one print, for set previews
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageSample {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
    pub name: String,
    pub collector_number: String,
    pub lang: Option<String>,
    pub rarity: Option<String>,
}

/// Up to `per_set` prints of one set that carry artwork.
///
/// Larger sets are sampled at evenly spaced positions in store order, so the
/// same store always yields the same samples.
pub fn image_samples<'a>(
    prints: impl IntoIterator<Item = &'a Arc<PrintRecord>>,
    code: &str,
    per_set: usize,
) -> Vec<ImageSample> {
    let code = code.trim().to_lowercase();
    if code.is_empty() || per_set == 0 {
        return Vec::new();
    }
    let pool: Vec<ImageSample> = prints
        .into_iter()
        .filter(|print| print.set_key() == code)
        .filter_map(|print| {
            let uris = print.image_uris();
            if uris.small.is_none() && uris.normal.is_none() && uris.large.is_none() {
                return None;
            }
            Some(ImageSample {
                small: uris.small,
                normal: uris.normal,
                large: uris.large,
                name: print.name.clone(),
                collector_number: print.collector_number.clone(),
                lang: print.lang.clone(),
                rarity: print.rarity.clone(),
            })
        })
        .collect();

    if pool.len() <= per_set {
        return pool;
    }
    let len = pool.len();
    (0..per_set).map(|i| pool[i * len / per_set].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::make_test_print;

    fn spell(id: &str, set: &str, colors: &[&str], mv: f64) -> Arc<PrintRecord> {
        let mut print = make_test_print(id, id, id, set, id);
        print.type_line = Some("Creature — Test".to_string());
        print.color_identity = colors.iter().map(|c| c.to_string()).collect();
        print.cmc = Some(mv);
        Arc::new(print)
    }

    #[test]
    fn metadata_keeps_first_name_and_earliest_release() {
        let mut a = make_test_print("a", "o", "A", "ABC", "1");
        a.set_name = Some("Alpha Set".into());
        a.released_at = Some("2020-05-01".into());
        let mut b = make_test_print("b", "o", "B", "abc", "2");
        b.set_name = Some("Alpha Set (Promos)".into());
        b.released_at = Some("2020-01-01".into());
        let c = make_test_print("c", "o", "C", "xyz", "1");
        let prints = vec![Arc::new(a), Arc::new(b), Arc::new(c)];

        let meta = SetMetadata::build(&prints);
        assert_eq!(meta.display_name("ABC"), Some("Alpha Set"));
        assert_eq!(meta.release_date("abc"), Some("2020-01-01"));
        assert_eq!(meta.display_name("xyz"), None);
        assert_eq!(meta.codes(), vec!["abc", "xyz"]);
    }

    #[test]
    fn profile_counts_colors_and_curve() {
        let prints = vec![
            spell("1", "abc", &["R"], 1.0),
            spell("2", "abc", &["R"], 2.0),
            spell("3", "abc", &["G"], 3.0),
            spell("4", "abc", &[], 5.0),
        ];
        let profiles = build_set_profiles(&prints);
        let profile = &profiles["abc"];

        assert_eq!(profile.nonland_spells, 4);
        assert_eq!(profile.avg_mv, Some(2.75));
        assert_eq!(profile.curve_bucket, Some(CurveBucket::Low));
        assert_eq!(profile.dominant_colors, vec!['R', 'G']);
        assert_eq!(profile.color_mode, ColorMode::Mixed);
        assert_eq!(profile.mono_cards, 3);
        assert_eq!(profile.colorless_cards, 1);
        assert_eq!(profile.color_counts[&'R'], 2);
        assert_eq!(profile.color_counts[&'W'], 0);
    }

    #[test]
    fn ties_follow_wubrg_order_and_cap_at_three() {
        let prints = vec![
            spell("1", "abc", &["G"], 2.0),
            spell("2", "abc", &["B"], 2.0),
            spell("3", "abc", &["W"], 2.0),
            spell("4", "abc", &["U"], 2.0),
        ];
        let profile = &build_set_profiles(&prints)["abc"];
        assert_eq!(profile.dominant_colors, vec!['W', 'U', 'B']);
    }

    #[test]
    fn multicolor_cards_make_a_multi_set() {
        let prints = vec![spell("1", "abc", &["W", "U"], 4.0), spell("2", "abc", &["W"], 5.0)];
        let profile = &build_set_profiles(&prints)["abc"];
        assert_eq!(profile.color_mode, ColorMode::Multi);
        assert_eq!(profile.curve_bucket, Some(CurveBucket::Mid));
        assert_eq!(profile.multicolor_cards, 1);
    }

    #[test]
    fn lands_and_tokens_are_skipped() {
        let mut land = make_test_print("l", "l", "Forest", "abc", "1");
        land.type_line = Some("Basic Land — Forest".into());
        let mut token = make_test_print("t", "t", "Goblin", "abc", "2");
        token.layout = Some("token".into());
        token.type_line = Some("Token Creature — Goblin".into());
        let prints = vec![Arc::new(land), Arc::new(token), spell("s", "abc", &["R"], 7.0)];

        let profile = &build_set_profiles(&prints)["abc"];
        assert_eq!(profile.nonland_spells, 1);
        assert_eq!(profile.curve_bucket, Some(CurveBucket::High));
        assert_eq!(profile.color_mode, ColorMode::Mono);
    }

    #[test]
    fn default_profile_is_zero_valued() {
        let profile = SetProfile::default();
        assert_eq!(profile.nonland_spells, 0);
        assert_eq!(profile.avg_mv, None);
        assert_eq!(profile.color_mode, ColorMode::Colorless);
        assert!(profile.dominant_colors.is_empty());
    }

    // ── image samples ──

    fn with_art(id: &str, set: &str, number: &str) -> Arc<PrintRecord> {
        let mut print = make_test_print(id, id, &format!("Card {id}"), set, number);
        print.rarity = Some("common".into());
        print.image_uris = Some(mtg_common::ImageUris {
            small: Some(format!("https://img.example/{id}/small.jpg")),
            normal: Some(format!("https://img.example/{id}/normal.jpg")),
            large: None,
        });
        Arc::new(print)
    }

    #[test]
    fn image_samples_skip_prints_without_art() {
        let bare = Arc::new(make_test_print("x", "x", "No Art", "abc", "9"));
        let prints = vec![with_art("1", "ABC", "1"), bare, with_art("2", "xyz", "1")];

        let samples = image_samples(&prints, " abc ", DEFAULT_IMAGE_SAMPLES);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "Card 1");
        assert_eq!(samples[0].collector_number, "1");
        assert_eq!(samples[0].rarity.as_deref(), Some("common"));
        assert_eq!(
            samples[0].normal.as_deref(),
            Some("https://img.example/1/normal.jpg")
        );
        assert!(image_samples(&prints, "nope", 6).is_empty());
        assert!(image_samples(&prints, "abc", 0).is_empty());
    }

    #[test]
    fn large_sets_are_sampled_evenly_and_repeatably() {
        let prints: Vec<_> = (0..10)
            .map(|i| with_art(&i.to_string(), "abc", &i.to_string()))
            .collect();

        let samples = image_samples(&prints, "abc", 3);
        let numbers: Vec<&str> = samples.iter().map(|s| s.collector_number.as_str()).collect();
        assert_eq!(numbers, vec!["0", "3", "6"]);
        assert_eq!(image_samples(&prints, "abc", 3), samples);
    }
}
