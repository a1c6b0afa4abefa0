//! Typed configuration schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexscanConfig {
    pub telegram: TelegramConfig,
    pub vision: VisionConfig,
    pub sheets: SheetsConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub api_key: String,
    pub base_url: String,
    /// Models in fallback order.
    pub models: Vec<String>,
    pub max_tokens: u32,
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    /// Also try a contrast-enhanced grayscale copy of each photo.
    pub enhance: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            max_tokens: 50,
            timeout_ms: 30_000,
            enhance: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub tab: String,
    pub access_token: String,
    pub api_base: String,
    /// Bound on each write.
    pub timeout_ms: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            tab: "Sheet1".to_string(),
            access_token: String::new(),
            api_base: "https://sheets.googleapis.com/v4".to_string(),
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Telegram user ids allowed to use the bot. Empty allows everyone.
    pub allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: String,
    /// JSON console output instead of the human format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), dir: "logs".to_string(), json: false }
    }
}
