//! SQLite-backed record store.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use simon_rules::Record;
use tracing::{debug, info, instrument};

use crate::store::models::{RECORD_ROW_ID, StoredRecord};
use crate::store::{RecordStore, StoreError, schema};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Record store persisted in a SQLite database file.
///
/// Each operation opens its own connection, so the store is cheap to share
/// across threads.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    db_path: String,
}

impl SqliteRecordStore {
    /// Opens (creating if needed) the database at `db_path` and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path.as_ref()))]
    pub fn open(db_path: impl AsRef<str>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.as_ref().to_string(),
        };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Failed to migrate '{}': {}", store.db_path, e)))?;
        info!(path = %store.db_path, migrations = applied.len(), "Opened record store");
        Ok(store)
    }

    /// Path of the backing database.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }
}

impl RecordStore for SqliteRecordStore {
    #[instrument(skip(self))]
    fn get(&self) -> Result<Option<Record>, StoreError> {
        let mut conn = self.connection()?;

        let row = schema::best_record::table
            .filter(schema::best_record::id.eq(RECORD_ROW_ID))
            .select(StoredRecord::as_select())
            .first(&mut conn)
            .optional()?;

        let record = row.and_then(StoredRecord::into_record);
        debug!(found = record.is_some(), "Read record");
        Ok(record)
    }

    #[instrument(skip(self), fields(max_round = record.max_round()))]
    fn put(&self, record: &Record) -> Result<(), StoreError> {
        let row = StoredRecord::from_record(record)?;
        let mut conn = self.connection()?;

        diesel::replace_into(schema::best_record::table)
            .values(&row)
            .execute(&mut conn)?;

        info!(max_round = record.max_round(), "Record stored");
        Ok(())
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let removed = diesel::delete(schema::best_record::table).execute(&mut conn)?;
        info!(removed, "Record cleared");
        Ok(())
    }
}
