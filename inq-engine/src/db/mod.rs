//! Database access for inq-engine

pub mod collections;

pub use collections::{Collection, RecordPredicate, SqliteCollection, StoredRecord};
