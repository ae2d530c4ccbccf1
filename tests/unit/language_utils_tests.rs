/*!
 * Tests for language utility functions
 */

use subburn::language_utils::{
    get_language_name, google_language_code, is_rtl_language, language_codes_match,
    normalize_to_part1, validate_language_code,
};

#[test]
fn test_validate_language_code_withValidCodes_shouldSucceed() {
    assert!(validate_language_code("en").is_ok());
    assert!(validate_language_code("he").is_ok());
    assert!(validate_language_code("eng").is_ok());
    assert!(validate_language_code("HEB").is_ok());
}

#[test]
fn test_validate_language_code_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("x").is_err());
    assert!(validate_language_code("xyz").is_err());
    assert!(validate_language_code("english").is_err());
}

#[test]
fn test_get_language_name_withKnownCodes_shouldReturnEnglishName() {
    assert_eq!(get_language_name("he").unwrap(), "Hebrew");
    assert_eq!(get_language_name("fra").unwrap(), "French");
    assert!(get_language_name("zz").is_err());
}

#[test]
fn test_normalize_to_part1_withThreeLetterCode_shouldShorten() {
    assert_eq!(normalize_to_part1("heb").unwrap(), "he");
    assert_eq!(normalize_to_part1("en").unwrap(), "en");
}

#[test]
fn test_language_codes_match_withMixedForms_shouldCompareLanguages() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("iw", "heb"));
    assert!(!language_codes_match("en", "fr"));
}

#[test]
fn test_is_rtl_language_withScripts_shouldDetectDirection() {
    assert!(is_rtl_language("he"));
    assert!(is_rtl_language("ara"));
    assert!(is_rtl_language("fa"));
    assert!(!is_rtl_language("en"));
    assert!(!is_rtl_language("ru"));
    assert!(!is_rtl_language("not-a-code"));
}

#[test]
fn test_google_language_code_withYiddish_shouldUseLegacyCode() {
    assert_eq!(google_language_code("yi"), "ji");
    assert_eq!(google_language_code("fra"), "fr");
}
