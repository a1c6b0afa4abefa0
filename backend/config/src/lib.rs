//! Configuration loading, validation and redaction.

pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{InvalidEnvVarError, MissingEnvVarError, apply_overrides, substitute};
pub use io::{load_config, load_config_with, parse_config};
pub use redact::redact_string;
pub use schema::{
    AccessConfig, FlexscanConfig, LoggingConfig, SheetsConfig, TelegramConfig, VisionConfig,
};
pub use validation::{Mode, ValidationIssue, ValidationReport, validate};
