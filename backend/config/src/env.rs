//! Environment handling: `${VAR}` substitution inside the config file and
//! variable overrides applied after it is parsed.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are substituted; `$${VAR}` is kept
//! as a literal `${VAR}`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::schema::FlexscanConfig;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced on config line {line}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub line: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {var_name}: {message}")]
pub struct InvalidEnvVarError {
    pub var_name: String,
    pub message: String,
}

/// Substitute `${VAR}` references in raw config text.
pub fn substitute(text: &str, env: &HashMap<String, String>) -> Result<String, MissingEnvVarError> {
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.split_inclusive('\n').enumerate() {
        let mut missing = None;
        let replaced = ENV_VAR_PATTERN.replace_all(line, |caps: &Captures| {
            let whole = &caps[0];
            if let Some(escaped) = whole.strip_prefix("$$") {
                return format!("${escaped}");
            }
            match env.get(&caps[1]) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });
        if let Some(var_name) = missing {
            // Comment lines may mention variables without defining them.
            if !line.trim_start().starts_with('#') {
                return Err(MissingEnvVarError { var_name, line: index + 1 });
            }
        }
        out.push_str(&replaced);
    }
    Ok(out)
}

fn parse_number<T: std::str::FromStr>(var_name: &str, raw: &str) -> Result<T, InvalidEnvVarError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| InvalidEnvVarError {
        var_name: var_name.to_string(),
        message: e.to_string(),
    })
}

fn parse_bool(var_name: &str, raw: &str) -> Result<bool, InvalidEnvVarError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(InvalidEnvVarError {
            var_name: var_name.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Apply environment overrides on top of a parsed config. Empty variables are ignored.
pub fn apply_overrides(
    config: &mut FlexscanConfig,
    env: &HashMap<String, String>,
) -> Result<(), InvalidEnvVarError> {
    let get = |name: &str| env.get(name).map(String::as_str).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("BOT_TOKEN") {
        config.telegram.bot_token = v.to_string();
    }
    if let Some(v) = get("OPENAI_API_KEY") {
        config.vision.api_key = v.to_string();
    }
    if let Some(v) = get("OPENAI_BASE_URL") {
        config.vision.base_url = v.to_string();
    }
    if let Some(v) = get("VISION_MODELS") {
        config.vision.models = split_list(v).map(str::to_string).collect();
    }
    if let Some(v) = get("VISION_MAX_TOKENS") {
        config.vision.max_tokens = parse_number("VISION_MAX_TOKENS", v)?;
    }
    if let Some(v) = get("VISION_TIMEOUT_MS") {
        config.vision.timeout_ms = parse_number("VISION_TIMEOUT_MS", v)?;
    }
    if let Some(v) = get("VISION_ENHANCE") {
        config.vision.enhance = parse_bool("VISION_ENHANCE", v)?;
    }
    if let Some(v) = get("GOOGLE_SHEET_ID") {
        config.sheets.spreadsheet_id = v.to_string();
    }
    if let Some(v) = get("GOOGLE_SHEET_TAB") {
        config.sheets.tab = v.to_string();
    }
    if let Some(v) = get("GOOGLE_SHEETS_ACCESS_TOKEN") {
        config.sheets.access_token = v.to_string();
    }
    if let Some(v) = get("SHEETS_TIMEOUT_MS") {
        config.sheets.timeout_ms = parse_number("SHEETS_TIMEOUT_MS", v)?;
    }
    if let Some(v) = get("ALLOWED_USER_IDS") {
        config.access.allowed_user_ids = split_list(v)
            .map(|id| parse_number("ALLOWED_USER_IDS", id))
            .collect::<Result<_, _>>()?;
    }
    if let Some(v) = get("RUST_LOG") {
        config.logging.level = v.to_string();
    }
    if let Some(v) = get("FLEXSCAN_LOG_DIR") {
        config.logging.dir = v.to_string();
    }
    if let Some(v) = get("FLEXSCAN_LOG_JSON") {
        config.logging.json = parse_bool("FLEXSCAN_LOG_JSON", v)?;
    }
    Ok(())
}
