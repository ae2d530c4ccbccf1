//! Language utilities for ISO language code handling
//!
//! Validates ISO 639-1 (2-letter) and ISO 639-3 (3-letter) codes, resolves
//! display names, maps codes to the forms external services expect and knows
//! which languages are written right-to-left.

use anyhow::{Result, anyhow};
use isolang::Language;

/// Languages whose script runs right-to-left, as ISO 639-1 codes
const RTL_LANGUAGES: &[&str] = &["ar", "dv", "fa", "he", "ps", "ur", "yi", "ug", "ku", "sd"];

/// Resolve a 2- or 3-letter code to an isolang language
fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        // "iw" and "ji" are the withdrawn codes some services still use
        2 => match normalized.as_str() {
            "iw" => Language::from_639_1("he"),
            "ji" => Language::from_639_1("yi"),
            other => Language::from_639_1(other),
        },
        3 => Language::from_639_3(&normalized),
        _ => None,
    }
}

/// Validate if a language code is a known ISO 639-1 or ISO 639-3 code
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Get the English name of a language
pub fn get_language_name(code: &str) -> Result<String> {
    lookup(code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 where one exists
pub fn normalize_to_part1(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes name the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => code1.trim().eq_ignore_ascii_case(code2.trim()),
    }
}

/// Whether text in this language is laid out right-to-left
pub fn is_rtl_language(code: &str) -> bool {
    normalize_to_part1(code)
        .map(|part1| RTL_LANGUAGES.contains(&part1.as_str()))
        .unwrap_or(false)
}

/// Code expected by the Google translation endpoint
///
/// Google still keys Hebrew and Yiddish by their withdrawn codes.
pub fn google_language_code(code: &str) -> String {
    let part1 = normalize_to_part1(code).unwrap_or_else(|_| code.trim().to_lowercase());
    match part1.as_str() {
        "he" => "iw".to_string(),
        "yi" => "ji".to_string(),
        _ => part1,
    }
}
