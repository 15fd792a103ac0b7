//! Row model for the persisted record.

use diesel::prelude::*;
use simon_rules::Record;
use tracing::instrument;

use crate::store::{StoreError, schema};

/// The table only ever holds this row.
pub(crate) const RECORD_ROW_ID: i32 = 1;

/// The `best_record` row: round and capture time, read and written as a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::best_record)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct StoredRecord {
    id: i32,
    max_round: i32,
    captured_at_ms: i64,
}

impl StoredRecord {
    /// Converts a record into its row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the round does not fit the column.
    #[instrument(skip(record), fields(max_round = record.max_round()))]
    pub(crate) fn from_record(record: &Record) -> Result<Self, StoreError> {
        let max_round = i32::try_from(record.max_round()).map_err(|_| {
            StoreError::new(format!("Round {} too large to store", record.max_round()))
        })?;
        Ok(Self {
            id: RECORD_ROW_ID,
            max_round,
            captured_at_ms: record.captured_at_millis(),
        })
    }

    /// Converts the row back into a record. A non-positive round reads as no record.
    pub(crate) fn into_record(self) -> Option<Record> {
        Record::from_parts(i64::from(self.max_round), self.captured_at_ms)
    }
}
