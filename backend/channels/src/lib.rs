//! Transport bindings. Telegram is the only channel.

pub mod queue;
pub mod telegram;
pub mod telegram_media;

pub use queue::UserQueues;
pub use telegram::{TelegramAdapter, classify_text, largest_photo, start_keyboard};
pub use telegram_media::TelegramMedia;
