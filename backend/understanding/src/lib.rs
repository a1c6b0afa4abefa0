//! Photo-to-identifier extraction: identifier grammars, image variants, the
//! vision client, and the fallback ladder that ties them together.

pub mod enhance;
pub mod grammar;
pub mod pipeline;
pub mod prompts;
pub mod vision;

pub use enhance::{variants, ImageVariant};
pub use grammar::{check_digit, extract_container, extract_flex, is_valid_container, FLEX_SUFFIXES};
pub use pipeline::{ladder, match_kind, Attempt, ExtractionPipeline, PipelineConfig};
pub use prompts::{PromptStrategy, NOT_FOUND_SENTINEL};
pub use vision::OpenAiVision;
