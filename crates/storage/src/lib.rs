//! Storage backends for loaded tables.
//!
//! Provides the narrow [`TableStore`] interface used by the ingestion
//! pipeline, with implementations for:
//! - PostgreSQL (production)
//! - SQLite (local runs, SQL-level tests)
//! - In-memory (pipeline tests)
//! - Unavailable (a pass whose database could not be reached)
//!
//! Identifier quoting and value binding happen here and nowhere else.

pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod store;
pub mod unavailable;

pub use memory::{MemoryTableStore, StoreCall};
pub use postgres::PgTableStore;
pub use sqlite::SqliteTableStore;
pub use store::{connect, TableStore};
pub use unavailable::UnavailableStore;
