use anyhow::{bail, Result};

use flexscan_understanding::{check_digit, is_valid_container};

/// Describe the check digit of a ten-character code, or verify an
/// eleven-character one.
pub fn describe(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if !code.is_ascii() {
        bail!("container codes are ASCII");
    }
    let (base, given) = match code.len() {
        10 => (code.as_str(), None),
        11 => {
            let (base, digit) = code.split_at(10);
            (base, Some(digit))
        }
        _ => bail!("expected 4 letters and 6 digits, optionally followed by the check digit"),
    };
    let Some(expected) = check_digit(base) else {
        bail!("{base} is not a container code (4 letters, then 6 digits)");
    };
    Ok(match given {
        None => format!("{base}{expected}"),
        Some(_) if is_valid_container(&code) => format!("{code}: valid"),
        Some(g) => format!("{code}: check digit {g} does not match, expected {expected}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_ten_character_code() {
        assert_eq!(describe("msku123456").unwrap(), "MSKU1234565");
    }

    #[test]
    fn verifies_full_code() {
        assert_eq!(describe("CSQU3054383").unwrap(), "CSQU3054383: valid");
        assert!(describe("CSQU3054384").unwrap().contains("expected 3"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(describe("MSKU12").is_err());
        assert!(describe("1234567890").is_err());
    }
}
