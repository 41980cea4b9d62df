//! Calibrated prediction engine.

use std::sync::Arc;

use crate::domain::{FeatureVector, FeatureVectorBuilder, ModelSchema, NormalizedInput, PredictionResult};
use crate::ports::{Classifier, LoadedModel, ModelError, ModelMetadata, PredictionEngine};
use crate::{HeartwiseError, Result};

/// Scores feature vectors with a shared classifier and applies the
/// calibrated threshold.
///
/// Holds only read-only state; one instance serves every request.
pub struct CalibratedEngine<C> {
    classifier: Arc<C>,
    builder: FeatureVectorBuilder,
    threshold: f64,
}

impl<C: Classifier> CalibratedEngine<C> {
    #[must_use]
    pub fn new(model: LoadedModel<C>) -> Self {
        Self::from_shared(Arc::new(model.classifier), model.metadata)
    }

    #[must_use]
    pub fn from_shared(classifier: Arc<C>, metadata: ModelMetadata) -> Self {
        Self {
            classifier,
            builder: FeatureVectorBuilder::new(metadata.schema),
            threshold: metadata.optimal_threshold,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn schema(&self) -> &ModelSchema {
        self.builder.schema()
    }
}

impl<C: Classifier> PredictionEngine for CalibratedEngine<C> {
    fn preprocess(&self, input: &NormalizedInput) -> Result<FeatureVector> {
        self.builder.build(input)
    }

    fn predict(&self, vector: &FeatureVector) -> Result<PredictionResult> {
        if vector.columns() != self.classifier.feature_names() {
            return Err(HeartwiseError::InvariantViolation(format!(
                "feature vector columns ({}) do not match the classifier's ({})",
                vector.len(),
                self.classifier.feature_names().len()
            )));
        }

        let scores = self.classifier.predict_proba(&[vector.values()])?;
        let probability = match scores.as_slice() {
            [[_, positive]] => *positive,
            other => {
                return Err(ModelError::Scoring(format!(
                    "expected one score row, got {}",
                    other.len()
                ))
                .into())
            }
        };
        if !(0.0..=1.0).contains(&probability) {
            return Err(
                ModelError::Scoring(format!("probability {probability} outside [0, 1]")).into(),
            );
        }

        Ok(PredictionResult::new(probability, self.threshold))
    }
}
