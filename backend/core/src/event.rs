use crate::types::Submitter;

/// Callback payload of the inline "start data entry" button.
pub const START_ENTRY_BUTTON: &str = "start_entry";

/// A transport-agnostic inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Explicit `/start` command.
    Start,
    /// Inline keyboard button pressed; `data` is the callback payload.
    ButtonPressed { data: String },
    /// Explicit `/cancel` command: drop the in-progress record.
    Cancel,
    /// Plain text message.
    TextMessage { body: String },
    /// Photo message. `image_ref` is whatever the transport needs to fetch the bytes.
    PhotoMessage {
        image_ref: String,
        media_group_id: Option<String>,
    },
}

/// An inbound event together with the identity of whoever sent it.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub submitter: Submitter,
    pub event: InboundEvent,
}

impl Inbound {
    pub fn new(submitter: Submitter, event: InboundEvent) -> Self {
        Self { submitter, event }
    }

    pub fn text(submitter: Submitter, body: impl Into<String>) -> Self {
        Self::new(submitter, InboundEvent::TextMessage { body: body.into() })
    }

    pub fn photo(
        submitter: Submitter,
        image_ref: impl Into<String>,
        media_group_id: Option<&str>,
    ) -> Self {
        Self::new(
            submitter,
            InboundEvent::PhotoMessage {
                image_ref: image_ref.into(),
                media_group_id: media_group_id.map(str::to_string),
            },
        )
    }
}

impl InboundEvent {
    /// Short label for structured logs; never includes message content.
    pub fn label(&self) -> &'static str {
        match self {
            InboundEvent::Start => "start",
            InboundEvent::ButtonPressed { .. } => "button",
            InboundEvent::Cancel => "cancel",
            InboundEvent::TextMessage { .. } => "text",
            InboundEvent::PhotoMessage { .. } => "photo",
        }
    }
}
