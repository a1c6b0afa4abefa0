//! Identifier grammars and the container check digit.
//!
//! Vision model output is treated as untrusted text: it is only ever a source
//! of substrings matched against these patterns.

use flexscan_core::ExtractionResult;
use once_cell::sync::Lazy;
use regex::Regex;

/// Accepted flex serial suffixes. A literal closed set, not derived from the date.
pub const FLEX_SUFFIXES: [&str; 2] = ["25Q", "26Q"];

/// Flex serial prefix.
pub const FLEX_PREFIX: &str = "B3G";

// Owner code, serial, check digit. One optional space or hyphen after the
// owner code and before the check digit.
static CONTAINER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z]{4})[ \-]?([0-9]{6})[ \-]?([0-9])\b").unwrap()
});

static FLEX_RE: Lazy<Regex> = Lazy::new(|| {
    let suffixes = FLEX_SUFFIXES.join("|");
    Regex::new(&format!(r"{FLEX_PREFIX}[0-9]{{8,10}}[A-Z]-(?:{suffixes})")).unwrap()
});

/// Numeric value of a character in the check digit table. Letters skip the
/// multiples of 11, so A=10, B=12, ..., K=21, L=23, ..., U=32, V=34, ..., Z=38.
fn char_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        'A'..='Z' => {
            let mut value = 10;
            for _ in 'A'..c {
                value += 1;
                if value % 11 == 0 {
                    value += 1;
                }
            }
            Some(value)
        }
        _ => None,
    }
}

/// Compute the check digit for the first 10 characters of a container code.
///
/// Returns `None` unless `code10` is exactly 4 uppercase letters followed by
/// 6 digits.
pub fn check_digit(code10: &str) -> Option<char> {
    let chars: Vec<char> = code10.chars().collect();
    if chars.len() != 10
        || !chars[..4].iter().all(|c| c.is_ascii_uppercase())
        || !chars[4..].iter().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let mut sum = 0u32;
    for (i, c) in chars.iter().enumerate() {
        sum += char_value(*c)? << i;
    }
    let remainder = sum % 11;
    // A remainder of 10 is written as 0.
    char::from_digit(remainder % 10, 10)
}

/// `true` when an 11-character container code carries the correct check digit.
pub fn is_valid_container(code: &str) -> bool {
    code.len() == 11
        && code.is_char_boundary(10)
        && check_digit(&code[..10]).is_some_and(|d| code.ends_with(d))
}

/// Scan free text for a container code.
///
/// The first candidate with a correct check digit wins. If no candidate
/// validates, the first one is returned flagged for review.
pub fn extract_container(text: &str) -> ExtractionResult {
    let upper = text.to_uppercase();
    let mut first_mismatch = None;

    for caps in CONTAINER_RE.captures_iter(&upper) {
        let token = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);
        let Some(expected) = check_digit(&token[..10]) else {
            continue;
        };
        if token.ends_with(expected) {
            return ExtractionResult::Validated(token);
        }
        if first_mismatch.is_none() {
            first_mismatch = Some(ExtractionResult::NeedsReview { token, expected });
        }
    }

    first_mismatch.unwrap_or(ExtractionResult::NotFound)
}

/// Scan free text for a flex serial. No checksum exists for this family.
pub fn extract_flex(text: &str) -> ExtractionResult {
    let upper = text.to_uppercase();
    match FLEX_RE.find(&upper) {
        Some(m) => ExtractionResult::Validated(m.as_str().to_string()),
        None => ExtractionResult::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_table_skips_multiples_of_eleven() {
        assert_eq!(char_value('A'), Some(10));
        assert_eq!(char_value('B'), Some(12));
        assert_eq!(char_value('K'), Some(21));
        assert_eq!(char_value('L'), Some(23));
        assert_eq!(char_value('U'), Some(32));
        assert_eq!(char_value('V'), Some(34));
        assert_eq!(char_value('Z'), Some(38));
        assert_eq!(char_value('7'), Some(7));
    }

    #[test]
    fn check_digit_fixtures() {
        assert_eq!(check_digit("MSKU123456"), Some('5'));
        assert_eq!(check_digit("CSQU305438"), Some('3'));
    }

    #[test]
    fn remainder_ten_maps_to_zero() {
        // A(10) + A(20) + A(40) + A(80) + 1*16 = 166, 166 mod 11 = 1
        assert_eq!(check_digit("AAAA100000"), Some('1'));
        // 166 + 7 * 512 = 3750, 3750 mod 11 = 10
        assert_eq!(check_digit("AAAA100007"), Some('0'));
    }

    #[test]
    fn check_digit_rejects_malformed_input() {
        assert_eq!(check_digit("MSK1234567"), None);
        assert_eq!(check_digit("msku123456"), None);
        assert_eq!(check_digit("MSKU12345"), None);
    }

    #[test]
    fn extracts_valid_container_from_noise() {
        let result = extract_container("Номер: msku 123456 5, seal 998877");
        assert_eq!(result, ExtractionResult::Validated("MSKU1234565".into()));
    }

    #[test]
    fn hyphen_separated_container_is_normalized() {
        let result = extract_container("CSQU-3054383");
        assert_eq!(result, ExtractionResult::Validated("CSQU3054383".into()));
    }

    #[test]
    fn mismatched_check_digit_is_flagged() {
        let result = extract_container("MSKU1234560");
        assert_eq!(
            result,
            ExtractionResult::NeedsReview { token: "MSKU1234560".into(), expected: '5' }
        );
    }

    #[test]
    fn later_valid_candidate_beats_earlier_mismatch() {
        let result = extract_container("MSKU1234560 or CSQU3054383");
        assert_eq!(result, ExtractionResult::Validated("CSQU3054383".into()));
    }

    #[test]
    fn longer_digit_runs_are_not_containers() {
        assert_eq!(extract_container("MSKU12345651"), ExtractionResult::NotFound);
        assert_eq!(extract_container("НЕ УДАЛОСЬ"), ExtractionResult::NotFound);
    }

    #[test]
    fn flex_extracted_from_noise_and_uppercased() {
        let result = extract_flex("label says: b3g24071283b-26q (printed)");
        assert_eq!(result, ExtractionResult::Validated("B3G24071283B-26Q".into()));
    }

    #[test]
    fn flex_accepts_eight_to_ten_digits() {
        assert!(extract_flex("B3G12345678A-25Q").found());
        assert!(extract_flex("B3G1234567890A-25Q").found());
        assert!(!extract_flex("B3G1234567A-25Q").found());
    }

    #[test]
    fn flex_suffix_outside_closed_set_is_rejected() {
        assert_eq!(extract_flex("B3G24071283B-27Q"), ExtractionResult::NotFound);
        assert_eq!(extract_flex("B3G24071283B26Q"), ExtractionResult::NotFound);
    }

    #[test]
    fn valid_container_helper() {
        assert!(is_valid_container("MSKU1234565"));
        assert!(!is_valid_container("MSKU1234566"));
    }
}
