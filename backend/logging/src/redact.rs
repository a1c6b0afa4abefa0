//! Log Redaction
//!
//! Scrubs bot tokens, API keys, and bearer tokens from strings prior to logging.

use std::sync::LazyLock;

use regex::Regex;

static BOT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{6,}:[A-Za-z0-9_-]{30,}").unwrap());
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[A-Za-z0-9_-]{20,})|(Bearer\s+[A-Za-z0-9\-\._~+/]+=*)").unwrap()
});

/// Redacts secret-shaped substrings.
pub fn redact_secrets(input: &str) -> String {
    let redacted = BOT_TOKEN_RE.replace_all(input, "[REDACTED_BOT_TOKEN]");
    API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_bot_token_in_url() {
        let raw = "error sending request for url (https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw/getMe)";
        let clean = redact_secrets(raw);
        assert!(!clean.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(clean.contains("[REDACTED_BOT_TOKEN]"));
    }

    #[test]
    fn scrubs_api_key_and_bearer() {
        let raw = "key sk-proj-abcdefghijklmnopqrstuv header Bearer ya29.a0AfH6SMB";
        let clean = redact_secrets(raw);
        assert!(!clean.contains("sk-proj-abcdefghijklmnopqrstuv"));
        assert!(!clean.contains("ya29.a0AfH6SMB"));
    }

    #[test]
    fn leaves_identifiers_alone() {
        let raw = "row 7 container MSKU1234565 flex B3G12345678A-25Q";
        assert_eq!(redact_secrets(raw), raw);
    }
}
