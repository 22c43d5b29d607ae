//! ISO 3166-1 alpha-2 helpers for region and geo-zone countries.

/// Display names for the countries the storefront ships to or seeds.
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("ae", "United Arab Emirates"),
    ("de", "Germany"),
    ("dk", "Denmark"),
    ("es", "Spain"),
    ("fr", "France"),
    ("gb", "United Kingdom"),
    ("in", "India"),
    ("it", "Italy"),
    ("pk", "Pakistan"),
    ("sa", "Saudi Arabia"),
    ("se", "Sweden"),
    ("us", "United States"),
];

/// Normalise a country code to lower case, rejecting anything that is not
/// two ASCII letters.
pub fn normalize_iso2(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_lowercase())
    } else {
        None
    }
}

/// Human-readable country name, falling back to the upper-cased code.
pub fn display_name(iso2: &str) -> String {
    COUNTRY_NAMES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(iso2))
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| iso2.to_ascii_uppercase())
}
