//! Startup validation. Errors are fatal, warnings are logged.

use crate::schema::FlexscanConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue { path: path.to_string(), message: message.into() });
    }

    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue { path: path.to_string(), message: message.into() });
    }
}

/// What the caller intends to run; dry runs need no spreadsheet credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    DryRun,
    ExtractOnly,
}

pub fn validate(config: &FlexscanConfig, mode: Mode) -> ValidationReport {
    let mut report = ValidationReport::default();
    if mode != Mode::ExtractOnly {
        validate_telegram(config, &mut report);
        validate_access(config, &mut report);
    }
    validate_vision(config, &mut report);
    if mode == Mode::Serve {
        validate_sheets(config, &mut report);
    }
    report
}

fn validate_telegram(config: &FlexscanConfig, report: &mut ValidationReport) {
    let token = config.telegram.bot_token.trim();
    if token.is_empty() {
        report.error("telegram.bot_token", "bot token is required (set BOT_TOKEN)");
    } else if !token.contains(':') {
        report.warn("telegram.bot_token", "does not look like a Telegram bot token");
    }
}

fn validate_vision(config: &FlexscanConfig, report: &mut ValidationReport) {
    let vision = &config.vision;
    if vision.api_key.trim().is_empty() {
        report.error("vision.api_key", "API key is required (set OPENAI_API_KEY)");
    }
    if vision.models.iter().all(|m| m.trim().is_empty()) {
        report.error("vision.models", "at least one model is required");
    }
    if vision.timeout_ms == 0 {
        report.error("vision.timeout_ms", "must be greater than zero");
    }
    if vision.max_tokens == 0 {
        report.error("vision.max_tokens", "must be greater than zero");
    }
    if !vision.base_url.starts_with("http://") && !vision.base_url.starts_with("https://") {
        report.error("vision.base_url", "must be an http(s) URL");
    }
}

fn validate_sheets(config: &FlexscanConfig, report: &mut ValidationReport) {
    let sheets = &config.sheets;
    if sheets.spreadsheet_id.trim().is_empty() {
        report.error("sheets.spreadsheet_id", "spreadsheet id is required (set GOOGLE_SHEET_ID)");
    }
    if sheets.access_token.trim().is_empty() {
        report.error(
            "sheets.access_token",
            "access token is required (set GOOGLE_SHEETS_ACCESS_TOKEN)",
        );
    }
    if sheets.tab.trim().is_empty() {
        report.error("sheets.tab", "tab name must not be empty");
    }
    if sheets.timeout_ms == 0 {
        report.error("sheets.timeout_ms", "must be greater than zero");
    }
}

fn validate_access(config: &FlexscanConfig, report: &mut ValidationReport) {
    if config.access.allowed_user_ids.is_empty() {
        report.warn("access.allowed_user_ids", "empty allow-list: any Telegram user can submit");
    }
}
