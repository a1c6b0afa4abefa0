//! Telegram long-polling adapter.
//!
//! Updates are mapped to [`Inbound`] events and queued per user, so each
//! user's events reach the controller in arrival order while different users
//! proceed concurrently. Idle workers exit on their own.

use std::sync::Arc;
use std::time::Duration;

use flexscan_core::{Inbound, InboundEvent, START_ENTRY_BUTTON, Submitter};
use flexscan_intake::{Controller, Reply};
use flexscan_logging::redact_secrets;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, User};
use tracing::{debug, error, info, warn};

use crate::queue::{Job, UserQueues};

const START_BUTTON_LABEL: &str = "Start data entry";
/// Idle time after which a user's worker task exits.
const WORKER_IDLE: Duration = Duration::from_secs(600);

pub struct TelegramAdapter {
    bot: Bot,
    controller: Arc<Controller>,
}

impl TelegramAdapter {
    pub fn new(bot: Bot, controller: Arc<Controller>) -> Self {
        Self { bot, controller }
    }

    pub fn name(&self) -> &str {
        "telegram"
    }

    /// Poll until Ctrl-C.
    pub async fn start(&self) -> anyhow::Result<()> {
        info!("Starting Telegram adapter");
        let router = Arc::new(Router::new(self.bot.clone(), Arc::clone(&self.controller)));

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(on_message))
            .branch(Update::filter_callback_query().endpoint(on_callback));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![router])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram adapter stopped");
        Ok(())
    }
}

/// Routes mapped updates into per-user queues.
struct Router {
    controller: Arc<Controller>,
    queues: Arc<UserQueues<(ChatId, Inbound)>>,
}

impl Router {
    fn new(bot: Bot, controller: Arc<Controller>) -> Self {
        let worker_controller = Arc::clone(&controller);
        let queues = UserQueues::new(WORKER_IDLE, move |(chat, inbound): (ChatId, Inbound)| -> Job {
            let bot = bot.clone();
            let controller = Arc::clone(&worker_controller);
            Box::pin(async move {
                let replies = controller.handle(inbound).await;
                send_replies(&bot, chat, replies).await;
            })
        });
        Self { controller, queues }
    }

    fn submit(&self, chat: ChatId, inbound: Inbound) {
        if self.controller.interrupt(&inbound) {
            debug!(user = inbound.submitter.id, "Superseded in-flight work");
        }
        self.queues.push(inbound.submitter.id, (chat, inbound));
    }
}

async fn send_replies(bot: &Bot, chat: ChatId, replies: Vec<Reply>) {
    for reply in replies {
        let mut request = bot.send_message(chat, reply.text);
        if reply.offer_start_button {
            request = request.reply_markup(start_keyboard());
        }
        if let Err(e) = request.await {
            error!(chat = chat.0, error = %redact_secrets(&e.to_string()), "Failed to send reply");
        }
    }
}

fn submitter_of(user: &User) -> Submitter {
    Submitter::new(user.id.0, user.username.as_deref())
}

/// Inline keyboard with the single start button.
pub fn start_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        START_BUTTON_LABEL,
        START_ENTRY_BUTTON,
    )]])
}

/// Map message text to an event. Commands may carry a `@botname` suffix.
pub fn classify_text(text: &str) -> InboundEvent {
    let command = text
        .trim()
        .strip_prefix('/')
        .and_then(|rest| rest.split_whitespace().next())
        .map(|word| word.split('@').next().unwrap_or(word).to_ascii_lowercase());

    match command.as_deref() {
        Some("start") => InboundEvent::Start,
        Some("cancel") => InboundEvent::Cancel,
        _ => InboundEvent::TextMessage { body: text.to_string() },
    }
}

/// Pick the highest-resolution size from `(file_id, width, height)` triples.
pub fn largest_photo<T>(sizes: impl IntoIterator<Item = (T, u32, u32)>) -> Option<T> {
    sizes
        .into_iter()
        .max_by_key(|(_, width, height)| u64::from(*width) * u64::from(*height))
        .map(|(id, _, _)| id)
}

/// Reply where the button was pressed. Without the originating message only
/// the private chat is known, whose id equals the user id.
fn callback_chat(message_chat: Option<ChatId>, user: u64) -> ChatId {
    message_chat.unwrap_or(ChatId(user as i64))
}

async fn on_message(msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let submitter = submitter_of(user);

    let event = if let Some(photos) = msg.photo() {
        let sizes = photos.iter().map(|p| (&p.file.id, p.width, p.height));
        let Some(file_id) = largest_photo(sizes) else {
            warn!(user = submitter.id, "Photo message without sizes");
            return Ok(());
        };
        InboundEvent::PhotoMessage {
            image_ref: file_id.to_string(),
            media_group_id: msg.media_group_id().map(|g| g.to_string()),
        }
    } else if let Some(text) = msg.text() {
        classify_text(text)
    } else {
        debug!(user = submitter.id, "Ignoring unsupported message kind");
        return Ok(());
    };

    router.submit(msg.chat.id, Inbound::new(submitter, event));
    Ok(())
}

async fn on_callback(bot: Bot, q: CallbackQuery, router: Arc<Router>) -> ResponseResult<()> {
    // Stop the client spinner whatever happens next.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(error = %redact_secrets(&e.to_string()), "Failed to answer callback query");
    }

    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let submitter = submitter_of(&q.from);
    let chat = callback_chat(q.message.as_ref().map(|m| m.chat().id), submitter.id);
    router.submit(chat, Inbound::new(submitter, InboundEvent::ButtonPressed { data }));
    Ok(())
}
