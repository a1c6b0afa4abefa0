//! Shared startup: config loading, validation, logging and pipeline wiring.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::warn;

use flexscan_config::{load_config, validate, FlexscanConfig, Mode, ValidationReport, VisionConfig};
use flexscan_logging::{init_logger, LogGuard};
use flexscan_understanding::{ExtractionPipeline, OpenAiVision, PipelineConfig};

/// Load the config and refuse to continue on validation errors.
pub async fn load_checked(path: Option<&Path>, mode: Mode) -> Result<FlexscanConfig> {
    let config = load_config(path).await?;
    let report = validate(&config, mode);
    ensure_valid(&report)?;
    Ok(config)
}

pub fn ensure_valid(report: &ValidationReport) -> Result<()> {
    for warning in &report.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !report.is_valid() {
        let errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}

pub fn start_logging(config: &FlexscanConfig) -> Result<LogGuard> {
    init_logger(&config.logging.dir, &config.logging.level, config.logging.json)
}

pub fn pipeline_config(vision: &VisionConfig) -> PipelineConfig {
    PipelineConfig {
        models: vision
            .models
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect(),
        max_tokens: vision.max_tokens,
        attempt_timeout: Duration::from_millis(vision.timeout_ms),
        enhance: vision.enhance,
    }
}

pub fn pipeline(vision: &VisionConfig) -> Arc<ExtractionPipeline> {
    let client = OpenAiVision::new(vision.api_key.clone()).with_base_url(vision.base_url.clone());
    Arc::new(ExtractionPipeline::new(Arc::new(client), pipeline_config(vision)))
}
