//! SQLite adapter: Implementation of PredictionRepository.
//!
//! Provides local persistence for prediction records.
//!
//! # Transactions
//!
//! The connection sits behind a `Mutex`. Every write locks it, opens a
//! transaction, inserts, commits and releases; an error drops the
//! transaction, which rolls it back. A poisoned mutex is reported as
//! `StorageError::LockPoisoned` instead of panicking.
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row, ToSql};

use crate::config::DatabaseConfig;
use crate::domain::fields::storage_columns;
use crate::domain::{PersistedRecord, RecordId, StorageValue, StoredPrediction};
use crate::ports::{PredictionPage, PredictionRepository};

const CREATED_AT_COLUMN: &str = "created_at";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown storage column: {0}")]
    UnknownColumn(String),

    #[error("Missing storage column: {0}")]
    MissingColumn(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToSql for StorageValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Integer(v) => ToSqlOutput::from(*v),
            Self::Real(v) => ToSqlOutput::from(*v),
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// SQLite storage adapter.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) the database described by `config`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn open(config: &DatabaseConfig) -> Result<Self, StorageError> {
        if config.is_in_memory() {
            return Self::in_memory();
        }
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.path)?;
        tracing::info!(path = %config.path.display(), "Opened prediction database");
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite database.
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                height REAL NOT NULL,
                weight REAL NOT NULL,
                bmi REAL NOT NULL,
                alcohol_consumption REAL NOT NULL,
                fruit_consumption REAL NOT NULL,
                green_vegetables_consumption REAL NOT NULL,
                fried_potato_consumption REAL NOT NULL,
                general_health INTEGER NOT NULL,
                checkup INTEGER NOT NULL,
                exercise INTEGER NOT NULL,
                skin_cancer INTEGER NOT NULL,
                other_cancer INTEGER NOT NULL,
                depression INTEGER NOT NULL,
                diabetes INTEGER NOT NULL,
                arthritis INTEGER NOT NULL,
                sex INTEGER NOT NULL,
                smoking_history INTEGER NOT NULL,
                age_category TEXT NOT NULL,
                prediction_result INTEGER NOT NULL,
                probability REAL NOT NULL,
                display_probability REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_predictions_created
                ON predictions(created_at DESC);
            ",
        )?;

        Ok(())
    }

    /// Reject records whose columns do not match the fixed table.
    fn check_columns(record: &PersistedRecord) -> Result<(), StorageError> {
        let known = storage_columns();
        if let Some(unknown) = record.columns().keys().find(|c| !known.contains(&c.as_str())) {
            return Err(StorageError::UnknownColumn(unknown.clone()));
        }
        if let Some(missing) = known.iter().find(|c| record.get(c).is_none()) {
            return Err(StorageError::MissingColumn((*missing).to_string()));
        }
        Ok(())
    }

    fn select_sql(tail: &str) -> String {
        format!(
            "SELECT id, {}, {CREATED_AT_COLUMN} FROM predictions ORDER BY {CREATED_AT_COLUMN} DESC, id DESC {tail}",
            storage_columns().join(", ")
        )
    }

    fn row_to_prediction(row: &Row<'_>) -> rusqlite::Result<(RecordId, BTreeMap<String, StorageValue>, String)> {
        let id: RecordId = row.get(0)?;
        let mut columns = BTreeMap::new();
        for (i, name) in storage_columns().into_iter().enumerate() {
            let value = match row.get_ref(i + 1)? {
                ValueRef::Integer(v) => StorageValue::Integer(v),
                ValueRef::Real(v) => StorageValue::Real(v),
                ValueRef::Text(t) => StorageValue::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Null | ValueRef::Blob(_) => continue,
            };
            columns.insert(name.to_string(), value);
        }
        let created_at: String = row.get(storage_columns().len() + 1)?;
        Ok((id, columns, created_at))
    }

    fn into_stored(
        (id, columns, created_at): (RecordId, BTreeMap<String, StorageValue>, String),
    ) -> Result<StoredPrediction, StorageError> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| StorageError::Corrupt(format!("created_at of record {id}: {e}")))?;
        Ok(StoredPrediction {
            id,
            record: PersistedRecord::new(columns, created_at),
        })
    }

    fn query(
        conn: &Connection,
        tail: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredPrediction>, StorageError> {
        let mut stmt = conn.prepare(&Self::select_sql(tail))?;
        let rows = stmt
            .query_map(params, Self::row_to_prediction)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::into_stored).collect()
    }
}

impl PredictionRepository for SqliteRepository {
    type Error = StorageError;

    fn save(&self, record: &PersistedRecord) -> Result<RecordId, Self::Error> {
        Self::check_columns(record)?;

        let names: Vec<&str> = record.columns().keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=names.len() + 1).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO predictions ({}, {CREATED_AT_COLUMN}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );
        let created_at = StorageValue::Text(record.created_at().to_rfc3339());
        let values = record.columns().values().chain(std::iter::once(&created_at));

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(&sql, params_from_iter(values))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(id, "Saved prediction record");
        Ok(id)
    }

    fn load_recent(&self, limit: usize) -> Result<Vec<StoredPrediction>, Self::Error> {
        let conn = self.lock()?;
        Self::query(&conn, "LIMIT ?1", params![limit as i64])
    }

    fn load_page(&self, offset: usize, limit: usize) -> Result<PredictionPage, Self::Error> {
        let conn = self.lock()?;

        let total_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        let items = Self::query(
            &conn,
            "LIMIT ?1 OFFSET ?2",
            params![limit as i64, offset as i64],
        )?;

        Ok(PredictionPage::new(items, total_count as usize, offset, limit))
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
