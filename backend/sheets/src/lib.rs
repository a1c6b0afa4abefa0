//! Record stores for intake rows: the Google Sheets backend and an in-memory
//! stand-in, sharing one column layout.

pub mod google;
pub mod layout;
pub mod memory;

pub use google::{GoogleSheetsConfig, GoogleSheetsStore};
pub use memory::{InMemoryRecordStore, MemoryRow};
