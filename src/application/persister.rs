//! Result persister: writes a prediction and its normalized input.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::fields::to_storage_column;
use crate::domain::{
    FieldKind, NormalizedInput, NormalizedValue, PersistedRecord, PredictionResult, RecordId,
    StorageValue,
};
use crate::ports::{PredictionPage, PredictionRepository};
use crate::{HeartwiseError, Result};

/// Flatten `input` and `result` into a record keyed by storage column.
///
/// Age is stored as its bracket label, coded fields as integers and
/// measurements as reals. The first value wins when a field repeats.
#[must_use]
pub fn to_record(input: &NormalizedInput, result: &PredictionResult) -> PersistedRecord {
    let mut columns = BTreeMap::new();
    for (field, value) in input.entries() {
        let cell = match (value, field.kind()) {
            (NormalizedValue::Bracket(bracket), _) => StorageValue::Text(bracket.label().to_string()),
            (NormalizedValue::Number(v), FieldKind::Code(_)) => StorageValue::Integer(*v as i64),
            (NormalizedValue::Number(v), _) => StorageValue::Real(*v),
        };
        columns
            .entry(to_storage_column(field.technical()).to_string())
            .or_insert(cell);
    }

    let outcomes = [
        ("prediction_result", StorageValue::Integer(result.risk_label.as_code())),
        ("probability", StorageValue::Real(result.probability)),
        ("display_probability", StorageValue::Real(result.display_probability)),
    ];
    for (technical, cell) in outcomes {
        columns.insert(to_storage_column(technical).to_string(), cell);
    }

    PersistedRecord::new(columns, chrono::Utc::now())
}

/// Writes predictions through a [`PredictionRepository`].
pub struct ResultPersister<R> {
    repository: Arc<R>,
}

impl<R> ResultPersister<R>
where
    R: PredictionRepository,
    R::Error: Into<StorageError>,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Persist one prediction.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Persistence` if the write fails. The failure
    /// is logged before it is returned.
    pub fn persist(&self, input: &NormalizedInput, result: &PredictionResult) -> Result<RecordId> {
        let record = to_record(input, result);
        match self.repository.save(&record) {
            Ok(id) => {
                tracing::debug!(id, "Persisted prediction");
                Ok(id)
            }
            Err(e) => {
                let e: StorageError = e.into();
                tracing::error!(error = %e, "Failed to persist prediction");
                Err(HeartwiseError::Persistence(e))
            }
        }
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<crate::domain::StoredPrediction>> {
        self.repository
            .load_recent(limit)
            .map_err(|e| HeartwiseError::Persistence(e.into()))
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn page(&self, offset: usize, limit: usize) -> Result<PredictionPage> {
        self.repository
            .load_page(offset, limit)
            .map_err(|e| HeartwiseError::Persistence(e.into()))
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn count(&self) -> Result<usize> {
        self.repository
            .count()
            .map_err(|e| HeartwiseError::Persistence(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteRepository;
    use crate::domain::{AgeBracket, Field, FormVariant};

    fn input() -> NormalizedInput {
        let mut input = NormalizedInput::new(FormVariant::multi_step());
        for field in Field::ALL {
            let value = match field {
                Field::AgeCategory => NormalizedValue::Bracket(AgeBracket::From45To49),
                Field::Height => NormalizedValue::Number(170.0),
                Field::Fruit => NormalizedValue::Number(14.0),
                Field::GeneralHealth => NormalizedValue::Number(3.0),
                _ => NormalizedValue::Number(0.0),
            };
            input.push(field, value);
        }
        input
    }

    #[test]
    fn test_record_uses_storage_columns() {
        let record = to_record(&input(), &PredictionResult::new(0.42, 0.35));

        assert_eq!(record.get("height"), Some(&StorageValue::Real(170.0)));
        assert_eq!(record.get("fruit_consumption"), Some(&StorageValue::Real(14.0)));
        assert_eq!(record.get("general_health"), Some(&StorageValue::Integer(3)));
        assert_eq!(record.get("age_category"), Some(&StorageValue::Text("45-49".into())));
        assert_eq!(record.get("prediction_result"), Some(&StorageValue::Integer(1)));
        assert_eq!(record.get("probability"), Some(&StorageValue::Real(0.42)));
        assert_eq!(record.get("display_probability"), Some(&StorageValue::Real(0.51)));
        assert!(record.get("Height_(cm)").is_none());
        assert_eq!(record.columns().len(), 21);
    }

    #[test]
    fn test_persist_roundtrip() {
        let repo = Arc::new(SqliteRepository::in_memory().expect("Should create db"));
        let persister = ResultPersister::new(Arc::clone(&repo));

        let id = persister
            .persist(&input(), &PredictionResult::new(0.1, 0.35))
            .expect("Should persist");
        assert_eq!(persister.count().expect("Should count"), 1);
        assert_eq!(persister.recent(5).expect("Should load")[0].id, id);
    }

    #[test]
    fn test_incomplete_record_is_persistence_error() {
        let repo = Arc::new(SqliteRepository::in_memory().expect("Should create db"));
        let persister = ResultPersister::new(repo);

        let mut partial = NormalizedInput::new(FormVariant::multi_step());
        partial.push(Field::Height, NormalizedValue::Number(170.0));
        let err = persister
            .persist(&partial, &PredictionResult::new(0.1, 0.35))
            .unwrap_err();
        assert!(matches!(err, HeartwiseError::Persistence(_)));
        assert_eq!(persister.count().expect("Should count"), 0);
    }
}
