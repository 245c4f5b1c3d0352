//! Name keys and collector-number parsing
//!
//! Collector numbers are free-form strings (`"007"`, `"256a"`, `"★12"`), and
//! card names arrive with inconsistent case and punctuation, so lookups work
//! on normalized keys rather than raw strings.

/// Case- and punctuation-insensitive key for name comparisons.
///
/// `"Ajani's Pridemate"` and `"ajanis pridemate"` produce the same key.
pub fn name_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The maximal leading run of ASCII digits, parsed as an integer
pub fn leading_number(collector_number: &str) -> Option<u64> {
    let digits = leading_digits(collector_number.trim());
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    &s[..end]
}

/// Plausible spellings of a collector number, most specific first:
/// the raw value, leading zeros stripped (`"007"` -> `"7"`), and the leading
/// digit run, which also covers letter suffixes (`"256a"` -> `"256"`).
pub fn collector_number_variants(collector_number: &str) -> Vec<String> {
    let raw = collector_number.trim().to_lowercase();
    let mut out = vec![raw.clone()];
    let mut push = |value: &str| {
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    };

    let stripped = raw.trim_start_matches('0');
    push(if stripped.is_empty() { "0" } else { stripped });

    let digits = leading_digits(&raw);
    if !digits.is_empty() {
        push(digits);
    }
    out
}

/// Key used by the exact set + collector number index
pub fn set_number_key(set_code: &str, collector_number: &str) -> String {
    format!(
        "{}::{}",
        set_code.trim().to_lowercase(),
        collector_number.trim().to_lowercase()
    )
}
