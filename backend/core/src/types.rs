use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The two identifier families read from photographs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// Family A: 4 letters + 7 digits, last digit is a mod-11 check digit.
    Container,
    /// Family B: `B3G` prefixed flexitank serial with a closed suffix set.
    Flex,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 2] = [IdentifierKind::Container, IdentifierKind::Flex];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Container => "container",
            IdentifierKind::Flex => "flex",
        }
    }

    /// The record column this identifier is written to.
    pub fn field(&self) -> RecordField {
        match self {
            IdentifierKind::Container => RecordField::Container,
            IdentifierKind::Flex => RecordField::Flex,
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running the extraction pipeline for one identifier kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Token matched the grammar (and the checksum, where one exists).
    Validated(String),
    /// Token matched the grammar but its check digit is wrong. Only produced
    /// for containers; `expected` is the digit computed from the first 10 chars.
    NeedsReview { token: String, expected: char },
    NotFound,
}

impl ExtractionResult {
    pub fn found(&self) -> bool {
        !matches!(self, ExtractionResult::NotFound)
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            ExtractionResult::Validated(token) | ExtractionResult::NeedsReview { token, .. } => {
                Some(token)
            }
            ExtractionResult::NotFound => None,
        }
    }

    pub fn needs_review(&self) -> bool {
        matches!(self, ExtractionResult::NeedsReview { .. })
    }
}

/// Identity of the user driving a dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Submitter {
    pub id: u64,
    pub username: Option<String>,
}

impl Submitter {
    pub fn new(id: u64, username: Option<&str>) -> Self {
        Self { id, username: username.map(str::to_string) }
    }

    /// Name written to the submitter column.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("no username")
    }
}

/// Opaque handle to a persisted record. For the spreadsheet store this is
/// the 1-based row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef(pub u32);

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// Fields of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Timestamp,
    Booking,
    Container,
    Flex,
    Beams,
    Addons,
    Sheets,
    Submitter,
    /// Free-text note flagging values that need manual checking.
    Review,
}

impl RecordField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Timestamp => "timestamp",
            RecordField::Booking => "booking",
            RecordField::Container => "container",
            RecordField::Flex => "flex",
            RecordField::Beams => "beams",
            RecordField::Addons => "addons",
            RecordField::Sheets => "sheets",
            RecordField::Submitter => "submitter",
            RecordField::Review => "review",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields known when a record is first created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub timestamp: NaiveDateTime,
    pub booking: String,
    pub submitter: String,
}

impl NewRecord {
    /// Timestamp rendered for the sheet, minute precision.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M").to_string()
    }
}
