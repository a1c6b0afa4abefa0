//! Telegram Media Handler
//!
//! Downloads photo bytes by file id.

use async_trait::async_trait;
use bytes::Bytes;
use flexscan_core::{FlexscanError, MediaSource};
use flexscan_logging::redact_secrets;
use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::debug;

pub struct TelegramMedia {
    bot: Bot,
}

impl TelegramMedia {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn media_error(e: impl std::fmt::Display) -> FlexscanError {
    FlexscanError::Media(redact_secrets(&e.to_string()))
}

#[async_trait]
impl MediaSource for TelegramMedia {
    async fn fetch(&self, image_ref: &str) -> Result<Bytes, FlexscanError> {
        let file = self.bot.get_file(image_ref.to_string()).await.map_err(media_error)?;

        let mut buf: Vec<u8> = Vec::new();
        self.bot.download_file(&file.path, &mut buf).await.map_err(media_error)?;

        debug!(file_id = image_ref, bytes = buf.len(), "Downloaded Telegram photo");
        Ok(Bytes::from(buf))
    }
}
