//! Conversational intake: per-user sessions, album deduplication, access
//! policy, and the controller that walks a user through one record.

pub mod controller;
pub mod dedup;
pub mod policy;
pub mod replies;
pub mod session;

pub use controller::{is_count, Controller, ControllerConfig};
pub use policy::AccessPolicy;
pub use replies::{FieldOutcome, Prompt, Reply};
pub use session::{DialogueState, Session, SessionSlot, SessionStore};
