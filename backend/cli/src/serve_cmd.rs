//! `flexscan serve`: wire the controller to Telegram and poll.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use teloxide::Bot;
use tracing::info;

use flexscan_channels::{TelegramAdapter, TelegramMedia};
use flexscan_config::{FlexscanConfig, Mode};
use flexscan_core::RecordStore;
use flexscan_intake::{AccessPolicy, Controller, ControllerConfig, SessionStore};
use flexscan_sheets::{GoogleSheetsConfig, GoogleSheetsStore, InMemoryRecordStore};

use crate::runtime;

pub async fn run(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let mode = if dry_run { Mode::DryRun } else { Mode::Serve };
    let config = runtime::load_checked(config_path, mode).await?;
    let _log_guard = runtime::start_logging(&config)?;

    info!(
        models = ?config.vision.models,
        tab = %config.sheets.tab,
        dry_run,
        allowed_users = config.access.allowed_user_ids.len(),
        "Starting flexscan"
    );

    let bot = Bot::new(config.telegram.bot_token.clone());
    let controller = Controller::new(
        Arc::new(SessionStore::new()),
        record_store(&config, dry_run),
        runtime::pipeline(&config.vision),
        Arc::new(TelegramMedia::new(bot.clone())),
    )
    .with_policy(access_policy(&config))
    .with_config(ControllerConfig {
        persistence_timeout: Duration::from_millis(config.sheets.timeout_ms),
        ..ControllerConfig::default()
    });

    TelegramAdapter::new(bot, Arc::new(controller)).start().await
}

fn record_store(config: &FlexscanConfig, dry_run: bool) -> Arc<dyn RecordStore> {
    if dry_run {
        info!("Dry run: records are kept in memory");
        return Arc::new(InMemoryRecordStore::new());
    }
    let sheets = &config.sheets;
    let mut store_config = GoogleSheetsConfig::new(
        sheets.spreadsheet_id.clone(),
        sheets.tab.clone(),
        sheets.access_token.clone(),
    );
    store_config.api_base = sheets.api_base.clone();
    Arc::new(GoogleSheetsStore::new(store_config))
}

fn access_policy(config: &FlexscanConfig) -> AccessPolicy {
    let ids = &config.access.allowed_user_ids;
    if ids.is_empty() {
        AccessPolicy::open()
    } else {
        AccessPolicy::only(ids.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_opens_the_bot() {
        let mut config = FlexscanConfig::default();
        assert!(access_policy(&config).is_open());

        config.access.allowed_user_ids = vec![42];
        let policy = access_policy(&config);
        assert!(policy.permits(42));
        assert!(!policy.permits(7));
    }

    #[test]
    fn dry_run_uses_memory_store() {
        let store = record_store(&FlexscanConfig::default(), true);
        assert_eq!(store.name(), "memory");
    }
}
