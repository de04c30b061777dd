//! TrendTap Store: normalized SQLite storage for topic analyses and search logs.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
