use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::env::{apply_overrides, substitute};
use crate::schema::FlexscanConfig;

/// Parse config text after `${VAR}` substitution.
pub fn parse_config(text: &str, env: &HashMap<String, String>) -> Result<FlexscanConfig> {
    let substituted = substitute(text, env)?;
    let config = toml::from_str(&substituted).context("invalid config TOML")?;
    Ok(config)
}

/// Defaults, then the optional file, then environment overrides.
pub async fn load_config_with(
    path: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<FlexscanConfig> {
    let mut config = match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?;
            info!(path = %path.display(), "Loaded config file");
            parse_config(&text, env)?
        }
        None => FlexscanConfig::default(),
    };
    apply_overrides(&mut config, env)?;
    Ok(config)
}

/// Load using the process environment.
pub async fn load_config(path: Option<&Path>) -> Result<FlexscanConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_config_with(path, &env).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config("[sheets]\nspreadsheet_id = \"abc\"\n", &HashMap::new()).unwrap();
        assert_eq!(config.sheets.spreadsheet_id, "abc");
        assert_eq!(config.sheets.tab, "Sheet1");
        assert_eq!(config.vision.models, vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(config.vision.timeout_ms, 30_000);
    }

    #[test]
    fn missing_reference_fails_parse() {
        let err = parse_config("[telegram]\nbot_token = \"${BOT_TOKEN}\"\n", &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[tokio::test]
    async fn env_overrides_file_values() {
        let dir = std::env::temp_dir().join(format!("flexscan-config-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("flexscan.toml");
        tokio::fs::write(
            &path,
            "[vision]\napi_key = \"${KEY}\"\nmodels = [\"a\"]\n[access]\nallowed_user_ids = [7]\n",
        )
        .await
        .unwrap();

        let config = load_config_with(
            Some(&path),
            &env(&[("KEY", "sk-file"), ("VISION_MODELS", "b,c")]),
        )
        .await
        .unwrap();
        assert_eq!(config.vision.api_key, "sk-file");
        assert_eq!(config.vision.models, vec!["b", "c"]);
        assert_eq!(config.access.allowed_user_ids, vec![7]);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = load_config_with(Some(Path::new("/nonexistent/flexscan.toml")), &HashMap::new()).await;
        assert!(result.is_err());
    }
}
