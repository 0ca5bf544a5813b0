//! Backend test support utilities
//!
//! Shared by unit and integration tests: idempotent logging setup, envelope
//! assertions that do not depend on backend types, and a throwaway SQLite
//! database migrated to the current schema.

pub mod envelope;
pub mod sqlite_db;
pub mod test_logging;

pub use sqlite_db::TestDb;
