//! Colour identity helpers

use crate::print::PrintRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical colour order
pub const WUBRG: [char; 5] = ['W', 'U', 'B', 'R', 'G'];

fn color_bit(letter: char) -> u8 {
    match letter {
        'W' => 1,
        'U' => 2,
        'B' => 4,
        'R' => 8,
        'G' => 16,
        _ => 0,
    }
}

/// Return (sorted letters, bitmask) from a list of colour symbols
pub fn normalize_color_identity<S: AsRef<str>>(colors: &[S]) -> (String, u8) {
    let letters: BTreeSet<String> = colors
        .iter()
        .map(|c| c.as_ref().trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect();
    let mask = letters
        .iter()
        .filter_map(|l| l.chars().next())
        .fold(0, |mask, letter| mask | color_bit(letter));
    (letters.into_iter().collect(), mask)
}

/// Card metadata derived from a print
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CardMetadata {
    pub type_line: Option<String>,
    pub rarity: Option<String>,
    pub color_identity: Option<String>,
    pub color_identity_mask: Option<u8>,
}

/// Extract the metadata a collection entry stores from a print
pub fn metadata_from_print(print: &PrintRecord) -> CardMetadata {
    let type_line = print
        .type_line
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let rarity = print
        .rarity
        .as_deref()
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty());

    let colors: &[String] = if print.color_identity.is_empty() {
        print.colors.as_deref().unwrap_or(&[])
    } else {
        &print.color_identity
    };
    let (letters, mask) = normalize_color_identity(colors);

    CardMetadata {
        type_line,
        rarity,
        color_identity: Some(letters).filter(|l| !l.is_empty()),
        color_identity_mask: Some(mask).filter(|m| *m != 0),
    }
}
