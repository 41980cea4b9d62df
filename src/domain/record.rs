//! Storage-facing records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier assigned by the storage collaborator.
pub type RecordId = i64;

/// A single storage cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StorageValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StorageValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Normalized input plus outcome, keyed by storage column name.
///
/// Created once per successful prediction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    columns: BTreeMap<String, StorageValue>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl PersistedRecord {
    #[must_use]
    pub fn new(
        columns: BTreeMap<String, StorageValue>,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            columns,
            created_at,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &BTreeMap<String, StorageValue> {
        &self.columns
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&StorageValue> {
        self.columns.get(column)
    }

    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }
}

/// A record read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: RecordId,
    pub record: PersistedRecord,
}
