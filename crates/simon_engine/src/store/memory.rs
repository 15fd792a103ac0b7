//! In-process record store.

use std::sync::{Mutex, PoisonError};

use simon_rules::Record;
use tracing::{debug, instrument};

use crate::store::{RecordStore, StoreError};

/// Keeps the record in memory. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    record: Mutex<Option<Record>>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `record`.
    pub fn with_record(record: Record) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl RecordStore for MemoryRecordStore {
    #[instrument(skip(self))]
    fn get(&self) -> Result<Option<Record>, StoreError> {
        let record = *self.record.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(found = record.is_some(), "Read record");
        Ok(record)
    }

    #[instrument(skip(self), fields(max_round = record.max_round()))]
    fn put(&self, record: &Record) -> Result<(), StoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(*record);
        debug!("Stored record");
        Ok(())
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<(), StoreError> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!("Cleared record");
        Ok(())
    }
}
