//! Prediction service: Orchestrates the cardiovascular risk pipeline.
//!
//! This service coordinates:
//! - Unit normalization of the raw form
//! - Feature vector assembly
//! - Calibrated scoring
//! - Best-effort persistence

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{NormalizedInput, Normalizer, PredictionResult, RawInput, RecordId};
use crate::ports::{PredictionEngine, PredictionRepository};
use crate::{HeartwiseError, Result};

use super::persister::ResultPersister;

/// Outcome of [`PredictionService::submit`].
///
/// `result` is valid whatever happened to `persistence`.
#[derive(Debug)]
pub struct Submission {
    pub result: PredictionResult,
    pub persistence: Result<RecordId>,
}

/// Runs raw form input through the whole pipeline.
///
/// Stateless between calls: share one instance across threads.
pub struct PredictionService<E, R> {
    normalizer: Normalizer,
    engine: Arc<E>,
    persister: ResultPersister<R>,
}

impl<E, R> PredictionService<E, R>
where
    E: PredictionEngine,
    R: PredictionRepository,
    R::Error: Into<StorageError>,
{
    pub fn new(normalizer: Normalizer, engine: Arc<E>, persister: ResultPersister<R>) -> Self {
        Self {
            normalizer,
            engine,
            persister,
        }
    }

    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    #[must_use]
    pub fn persister(&self) -> &ResultPersister<R> {
        &self.persister
    }

    /// Predict without persisting.
    ///
    /// # Errors
    /// - `Validation` / `IncompleteInput` for user-correctable input problems
    /// - `InvariantViolation` for internal consistency failures
    /// - `ModelUnavailable` if the classifier cannot score
    pub fn predict(&self, raw: &RawInput) -> Result<PredictionResult> {
        self.run(raw).map(|(_, result)| result)
    }

    /// Predict, then persist the normalized input and the outcome.
    ///
    /// No write is attempted when the prediction fails. A failed write is
    /// reported in [`Submission::persistence`] and does not affect the result.
    ///
    /// # Errors
    /// Same as [`PredictionService::predict`].
    pub fn submit(&self, raw: &RawInput) -> Result<Submission> {
        let (normalized, result) = self.run(raw)?;
        let persistence = self.persister.persist(&normalized, &result);
        Ok(Submission {
            result,
            persistence,
        })
    }

    fn run(&self, raw: &RawInput) -> Result<(NormalizedInput, PredictionResult)> {
        let outcome = self.normalizer.normalize(raw).and_then(|normalized| {
            let vector = self.engine.preprocess(&normalized)?;
            tracing::debug!(columns = vector.len(), "Feature vector assembled");
            let result = self.engine.predict(&vector)?;
            Ok((normalized, result))
        });

        match &outcome {
            Ok((_, result)) => tracing::info!(
                risk_label = %result.risk_label,
                "Prediction complete"
            ),
            Err(e) => log_failure(e),
        }
        outcome
    }
}

fn log_failure(error: &HeartwiseError) {
    if error.is_user_correctable() {
        tracing::info!(error = %error, "Rejected form input");
    } else {
        tracing::error!(error = %error, "Prediction failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{JsonModelLoader, LinearDiscriminant, SqliteRepository};
    use crate::application::CalibratedEngine;
    use crate::config::ModelConfig;
    use crate::domain::{FormStep, FormVariant, RiskLabel};
    use crate::ports::{ModelLoader, PredictionPage};
    use crate::domain::{PersistedRecord, StoredPrediction};

    type Service<R> = PredictionService<CalibratedEngine<LinearDiscriminant>, R>;

    fn engine() -> Arc<CalibratedEngine<LinearDiscriminant>> {
        let loaded = JsonModelLoader::new(&ModelConfig::new("models"))
            .load()
            .expect("Sample model should load");
        Arc::new(CalibratedEngine::new(loaded))
    }

    fn service_with<R>(repo: Arc<R>) -> Service<R>
    where
        R: PredictionRepository,
        R::Error: Into<StorageError>,
    {
        PredictionService::new(
            Normalizer::new(FormVariant::multi_step()),
            engine(),
            ResultPersister::new(repo),
        )
    }

    fn sample_form() -> RawInput {
        RawInput::new()
            .with("altura", 170)
            .with("peso", 70)
            .with("imc", 24.2)
            .with("sexo", 0)
            .with("edad", 45)
            .with("consumo_alcohol", 0)
            .with("consumo_fruta", 2)
            .with("consumo_vegetales", 2)
            .with("consumo_papas", 0)
            .with("salud_general", 3)
            .with("chequeo_medico", 1)
            .with("ejercicio", 1)
            .with("cancer_piel", 0)
            .with("otro_cancer", 0)
            .with("depresion", 0)
            .with("diabetes", 0)
            .with("artritis", 0)
            .with("historial_tabaquismo", 0)
    }

    /// Repository whose writes always fail.
    struct BrokenRepository;

    impl PredictionRepository for BrokenRepository {
        type Error = StorageError;

        fn save(&self, _record: &PersistedRecord) -> std::result::Result<RecordId, StorageError> {
            Err(StorageError::LockPoisoned)
        }

        fn load_recent(&self, _limit: usize) -> std::result::Result<Vec<StoredPrediction>, StorageError> {
            Ok(Vec::new())
        }

        fn load_page(&self, offset: usize, limit: usize) -> std::result::Result<PredictionPage, StorageError> {
            Ok(PredictionPage::new(Vec::new(), 0, offset, limit))
        }

        fn count(&self) -> std::result::Result<usize, StorageError> {
            Ok(0)
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let engine = engine();
        let normalizer = Normalizer::new(FormVariant::multi_step());

        let normalized = normalizer.normalize(&sample_form()).expect("Should normalize");
        assert_eq!(normalized.number(crate::Field::Fruit), Some(14.0));
        assert_eq!(normalized.number(crate::Field::Vegetables), Some(14.0));

        let vector = engine.preprocess(&normalized).expect("Should build");
        assert_eq!(vector.columns(), engine.schema().columns());
        assert_eq!(vector.get("AgeCategory_45-49"), Some(1.0));
        for (column, value) in vector.iter() {
            if column.starts_with("AgeCategory_") && column != "AgeCategory_45-49" {
                assert_eq!(value, 0.0, "{column} should be cold");
            }
        }

        let result = engine.predict(&vector).expect("Should predict");
        assert!((0.0..=1.0).contains(&result.probability));
        let expected = if result.probability > engine.threshold() {
            RiskLabel::High
        } else {
            RiskLabel::Low
        };
        assert_eq!(result.risk_label, expected);
    }

    #[test]
    fn test_submit_persists_record() {
        let repo = Arc::new(SqliteRepository::in_memory().expect("Should create db"));
        let service = service_with(Arc::clone(&repo));

        let submission = service.submit(&sample_form()).expect("Should predict");
        let id = submission.persistence.expect("Should persist");

        let stored = repo.load_recent(1).expect("Should load");
        assert_eq!(stored[0].id, id);
        assert_eq!(
            stored[0].record.get("fruit_consumption").and_then(|v| v.as_f64()),
            Some(14.0)
        );
        assert_eq!(
            stored[0].record.get("age_category").and_then(|v| v.as_str()),
            Some("45-49")
        );
        assert_eq!(
            stored[0].record.get("probability").and_then(|v| v.as_f64()),
            Some(submission.result.probability)
        );
    }

    #[test]
    fn test_missing_sex_is_incomplete_and_not_persisted() {
        let repo = Arc::new(SqliteRepository::in_memory().expect("Should create db"));
        let service = service_with(Arc::clone(&repo));

        let mut form = sample_form();
        form.remove("sexo");
        let err = service.submit(&form).unwrap_err();
        match &err {
            HeartwiseError::IncompleteInput { step, missing } => {
                assert_eq!(*step, FormStep::General);
                assert_eq!(missing, &vec!["sexo".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_user_correctable());
        assert_eq!(repo.count().expect("Should count"), 0);
    }

    #[test]
    fn test_unknown_diabetes_code_names_field() {
        let service = service_with(Arc::new(SqliteRepository::in_memory().expect("Should create db")));
        let form = sample_form().with("diabetes", 9);

        let err = service.predict(&form).unwrap_err();
        assert!(matches!(&err, HeartwiseError::Validation { field, .. } if field == "diabetes"));
    }

    #[test]
    fn test_persistence_failure_keeps_result() {
        let service = service_with(Arc::new(BrokenRepository));

        let submission = service.submit(&sample_form()).expect("Prediction should succeed");
        assert!((0.0..=1.0).contains(&submission.result.probability));
        assert!(matches!(
            submission.persistence,
            Err(HeartwiseError::Persistence(StorageError::LockPoisoned))
        ));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let service = service_with(Arc::new(SqliteRepository::in_memory().expect("Should create db")));
        let plain = service.predict(&sample_form()).expect("Should predict");
        let extra = service
            .predict(&sample_form().with("comentario", "hola").with("version_formulario", 3))
            .expect("Should predict");
        assert_eq!(plain.probability.to_bits(), extra.probability.to_bits());
    }

    #[test]
    fn test_concurrent_requests_share_one_service() {
        let repo = Arc::new(SqliteRepository::in_memory().expect("Should create db"));
        let service = service_with(Arc::clone(&repo));
        let expected = service.predict(&sample_form()).expect("Should predict");

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let submission = service.submit(&sample_form()).expect("Should predict");
                        submission.persistence.expect("Should persist");
                        submission.result
                    })
                })
                .collect();
            for handle in handles {
                let result = handle.join().expect("thread should not panic");
                assert_eq!(result.probability.to_bits(), expected.probability.to_bits());
                assert_eq!(result.risk_label, expected.risk_label);
            }
        });

        assert_eq!(repo.count().expect("Should count"), 8);
    }
}
