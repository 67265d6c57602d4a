//! Sqlite-backed persistence for glitch campaign records.

pub mod export;
pub mod schema;

pub use export::{export_csv, export_json};
pub use schema::{SqliteStore, StoredAttempt};
