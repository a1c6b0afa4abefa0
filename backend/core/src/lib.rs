pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use error::FlexscanError;
pub use event::{Inbound, InboundEvent, START_ENTRY_BUTTON};
pub use traits::{IdentifierExtractor, MediaSource, RecordStore, VisionClient, VisionRequest};
pub use types::{
    ExtractionResult, IdentifierKind, NewRecord, RecordField, RecordRef, Submitter,
};
