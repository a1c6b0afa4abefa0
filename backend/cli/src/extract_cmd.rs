//! `flexscan extract`: run the extraction ladder on a local photo.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;

use flexscan_config::Mode;
use flexscan_core::{ExtractionResult, IdentifierKind};

use crate::runtime;

pub async fn run(config_path: Option<&Path>, image: &Path, kinds: &[IdentifierKind]) -> Result<()> {
    let config = runtime::load_checked(config_path, Mode::ExtractOnly).await?;
    let _log_guard = runtime::start_logging(&config)?;

    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("failed to read {}", image.display()))?;
    let bytes = Bytes::from(bytes);
    let pipeline = runtime::pipeline(&config.vision);

    for &kind in kinds {
        let result = pipeline.extract(&bytes, kind).await;
        println!("{}", format_result(kind, &result));
    }
    Ok(())
}

fn format_result(kind: IdentifierKind, result: &ExtractionResult) -> String {
    match result {
        ExtractionResult::Validated(token) => format!("{kind}: {token}"),
        ExtractionResult::NeedsReview { token, expected } => {
            format!("{kind}: {token} (check digit mismatch, expected {expected})")
        }
        ExtractionResult::NotFound => format!("{kind}: not found"),
    }
}
