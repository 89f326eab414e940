//! The passcode rule: first standalone run of exactly six digits.

use regex::Regex;
use std::sync::LazyLock;

/// Number of digits in a passcode.
pub const CODE_LENGTH: usize = 6;

// ASCII word boundaries: letters outside ASCII (CJK, accented) delimit a code.
#[allow(clippy::expect_used)]
static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)[0-9]{6}(?-u:\b)").expect("passcode pattern is valid")
});

/// Returns the first word-delimited six-digit run in `text`, scanning left to right.
///
/// Runs that are part of a longer digit sequence never match. Only ASCII
/// letters, digits and `_` count as word characters.
#[must_use]
pub fn find_code(text: &str) -> Option<&str> {
    CODE_PATTERN.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_code() {
        assert_eq!(find_code("Your code is 123456"), Some("123456"));
    }

    #[test]
    fn test_longer_runs_are_skipped() {
        assert_eq!(find_code("order #12345678 code 654321"), Some("654321"));
    }

    #[test]
    fn test_shorter_runs_do_not_match() {
        assert_eq!(find_code("pin 12345 or 1234567"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        assert_eq!(find_code("111111 then 222222"), Some("111111"));
    }

    #[test]
    fn test_word_characters_block_match() {
        assert_eq!(find_code("ref A123456 and x_654321"), None);
        assert_eq!(find_code("code:(987654)."), Some("987654"));
    }

    #[test]
    fn test_non_ascii_letters_delimit_code() {
        assert_eq!(find_code("您的验证码是123456。"), Some("123456"));
        assert_eq!(find_code("código:123456é"), Some("123456"));
        assert_eq!(find_code("認証コード987654を入力"), Some("987654"));
    }

    #[test]
    fn test_no_code() {
        assert_eq!(find_code(""), None);
        assert_eq!(find_code("Welcome aboard!"), None);
    }

    proptest! {
        #[test]
        fn prop_result_is_exactly_six_ascii_digits(text in ".*") {
            if let Some(code) = find_code(&text) {
                prop_assert_eq!(code.len(), CODE_LENGTH);
                prop_assert!(code.bytes().all(|b| b.is_ascii_digit()));
            }
        }

        #[test]
        fn prop_embedded_code_is_found(
            prefix in "[a-z ]{0,20}",
            code in "[0-9]{6}",
            suffix in "[a-z ]{0,20}",
        ) {
            let text = format!("{prefix} {code} {suffix}");
            prop_assert_eq!(find_code(&text), Some(code.as_str()));
        }
    }
}
