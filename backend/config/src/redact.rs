use crate::schema::FlexscanConfig;

/// Mask a secret, keeping a short prefix for recognisability.
pub fn redact_string(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if value.chars().count() <= 8 {
        return "***".to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}***")
}

impl FlexscanConfig {
    /// Copy safe to print or log.
    pub fn redacted(&self) -> FlexscanConfig {
        let mut copy = self.clone();
        copy.telegram.bot_token = redact_string(&copy.telegram.bot_token);
        copy.vision.api_key = redact_string(&copy.vision.api_key);
        copy.sheets.access_token = redact_string(&copy.sheets.access_token);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_prefix_of_long_secrets() {
        assert_eq!(redact_string("sk-abcdefghijkl"), "sk-a***");
        assert_eq!(redact_string("short"), "***");
        assert_eq!(redact_string(""), "");
    }

    #[test]
    fn redacted_masks_every_secret() {
        let mut config = FlexscanConfig::default();
        config.telegram.bot_token = "123456789:AAF-secret-token".into();
        config.vision.api_key = "sk-proj-secretsecret".into();
        config.sheets.access_token = "ya29.a0secretsecret".into();
        config.sheets.spreadsheet_id = "1AbCdEf".into();

        let redacted = config.redacted();
        assert_eq!(redacted.telegram.bot_token, "1234***");
        assert_eq!(redacted.vision.api_key, "sk-p***");
        assert_eq!(redacted.sheets.access_token, "ya29***");
        assert_eq!(redacted.sheets.spreadsheet_id, "1AbCdEf");
    }
}
