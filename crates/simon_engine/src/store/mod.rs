//! Persistence for the single best-score record.
//!
//! Stores are synchronous and may be slow; the engine only calls them from
//! blocking worker threads, never from the playback path.

mod error;
mod memory;
mod models;
mod schema; // Diesel generated schema - internal use only
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use simon_rules::Record;

/// Durable home of the one best-score record.
///
/// "Nothing stored" and "a stored round of zero or less" both read back as
/// `Ok(None)`. `Err` means the store itself could not be reached and must not
/// be mistaken for an absent record.
pub trait RecordStore: Send + Sync {
    /// Reads the current record.
    fn get(&self) -> Result<Option<Record>, StoreError>;

    /// Replaces the stored record.
    fn put(&self, record: &Record) -> Result<(), StoreError>;

    /// Removes the stored record.
    fn clear(&self) -> Result<(), StoreError>;
}
