//! User-facing replies. The controller returns these; the transport sends them.

use std::fmt::Write as _;

use flexscan_core::IdentifierKind;

use crate::session::DialogueState;

/// A message to send back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Attach the inline "start data entry" button.
    pub offer_start_button: bool,
}

/// What happened to one identifier during photo processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Saved(String),
    /// Written, but the check digit disagrees; a review note was written too.
    SavedForReview { token: String, expected: char },
    /// Written by an earlier photo of this record.
    AlreadySaved,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Welcome,
    AskBooking,
    EmptyBooking,
    BookingSaved,
    SendPhoto,
    PhotoProcessed(Vec<(IdentifierKind, FieldOutcome)>),
    PhotoAlreadyProcessed(DialogueState),
    PhotoBeforeBooking,
    DownloadFailed,
    PhotoSaveFailed,
    Ask(DialogueState),
    NumberRequired,
    SaveFailed,
    AllSaved { booking: String },
    Cancelled,
    StartFirst,
    Unauthorized,
}

fn question(state: DialogueState) -> &'static str {
    match state {
        DialogueState::AwaitingBooking => "Enter the booking number:",
        DialogueState::AwaitingPhoto => "Send a photo of the container and the flexitank.",
        DialogueState::AwaitingBeams => "How many beams? Enter a number:",
        DialogueState::AwaitingAddons => "How many addons? Enter a number:",
        DialogueState::AwaitingSheets => "How many sheets? Enter a number:",
        DialogueState::Idle => "Press /start to begin.",
    }
}

fn kind_title(kind: IdentifierKind) -> &'static str {
    match kind {
        IdentifierKind::Container => "Container",
        IdentifierKind::Flex => "Flex",
    }
}

impl Prompt {
    pub fn text(&self) -> String {
        match self {
            Prompt::Welcome => {
                "Welcome! Enter the booking number (or press the button below).".to_string()
            }
            Prompt::AskBooking => question(DialogueState::AwaitingBooking).to_string(),
            Prompt::EmptyBooking => "⚠ The booking number cannot be empty. Enter the booking number:".to_string(),
            Prompt::BookingSaved => {
                "📌 Booking saved. Now upload a photo of the container and the flexitank.".to_string()
            }
            Prompt::SendPhoto => format!("📷 {}", question(DialogueState::AwaitingPhoto)),
            Prompt::PhotoProcessed(outcomes) => {
                let mut text = String::from("📸 Photo processed.");
                for (kind, outcome) in outcomes {
                    let title = kind_title(*kind);
                    let _ = match outcome {
                        FieldOutcome::Saved(token) => write!(text, "\n{title}: {token}"),
                        FieldOutcome::SavedForReview { token, expected } => write!(
                            text,
                            "\n{title}: {token} ⚠ check digit should be {expected}, flagged for review"
                        ),
                        FieldOutcome::AlreadySaved => write!(text, "\n{title}: already saved"),
                        FieldOutcome::NotFound => write!(text, "\n{title}: not recognized"),
                    };
                }
                let _ = write!(text, "\n📌 {}", question(DialogueState::AwaitingBeams));
                text
            }
            Prompt::PhotoAlreadyProcessed(state) => {
                format!("Photo already processed. {}", question(*state))
            }
            Prompt::PhotoBeforeBooking => {
                "First press /start and enter the booking number.".to_string()
            }
            Prompt::DownloadFailed => {
                "❌ Could not download the photo, please send it again.".to_string()
            }
            Prompt::PhotoSaveFailed => "❌ Save failed, please send the photo again.".to_string(),
            Prompt::Ask(state) => format!("📌 {}", question(*state)),
            Prompt::NumberRequired => "⚠ Please enter a number.".to_string(),
            Prompt::SaveFailed => "❌ Save failed, please retry this step.".to_string(),
            Prompt::AllSaved { booking } => format!("✅ All data saved for booking {booking}."),
            Prompt::Cancelled => "Entry cancelled. Press /start to begin again.".to_string(),
            Prompt::StartFirst => "Press /start and follow the steps.".to_string(),
            Prompt::Unauthorized => "⛔ You are not allowed to use this bot.".to_string(),
        }
    }
}

impl From<Prompt> for Reply {
    fn from(prompt: Prompt) -> Self {
        Reply {
            offer_start_button: matches!(prompt, Prompt::Welcome),
            text: prompt.text(),
        }
    }
}
