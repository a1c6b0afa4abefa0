//! Structured logging for flexscan: console plus rolling NDJSON files, and a
//! scrubber for secrets that may appear in error text.

pub mod logger;
pub mod redact;

pub use logger::{LogGuard, init_logger};
pub use redact::redact_secrets;
