use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FlexscanError;
use crate::types::{ExtractionResult, IdentifierKind, NewRecord, RecordField, RecordRef};

/// External record store (the spreadsheet).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Append a new record and return a reference that addresses it for later writes.
    async fn create_record(&self, record: &NewRecord) -> Result<RecordRef, FlexscanError>;

    /// Overwrite a single field of an existing record.
    async fn update_field(
        &self,
        record: RecordRef,
        field: RecordField,
        value: &str,
    ) -> Result<(), FlexscanError>;
}

/// A single query to a vision-capable model.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub image_b64: String,
    pub mime_type: String,
    pub max_tokens: u32,
}

/// Vision model service. Responses are untrusted free text.
#[async_trait]
pub trait VisionClient: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, request: &VisionRequest) -> Result<String, FlexscanError>;
}

/// Resolves a transport image reference to the image bytes.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, image_ref: &str) -> Result<Bytes, FlexscanError>;
}

/// Turns a photograph into an identifier of the requested kind. Infallible by
/// contract: every failure collapses to [`ExtractionResult::NotFound`].
#[async_trait]
pub trait IdentifierExtractor: Send + Sync {
    async fn extract(&self, image: Bytes, kind: IdentifierKind) -> ExtractionResult;
}
