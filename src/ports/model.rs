//! Model ports: Traits for the classifier artifact and the prediction engine.
//!
//! The artifact format stays behind [`ModelLoader`]; the application only
//! sees a [`Classifier`] plus its calibrated metadata.

use std::path::PathBuf;

use crate::domain::{FeatureVector, ModelSchema, NormalizedInput, PredictionResult};

/// Error type for model artifact operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Model artifact {} is malformed: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Model artifact is inconsistent: {0}")]
    Inconsistent(String),

    #[error("Model integrity check failed for {file}")]
    IntegrityMismatch { file: String },

    #[error("Model manifest required but missing: {}", .path.display())]
    MissingManifest { path: PathBuf },

    #[error("Classifier scoring failed: {0}")]
    Scoring(String),
}

/// Calibrated metadata shipped next to the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// Probability cutoff selected at training time
    pub optimal_threshold: f64,
    /// Columns the classifier was fit on, in order
    pub schema: ModelSchema,
}

/// A classifier together with its metadata.
#[derive(Debug, Clone)]
pub struct LoadedModel<C> {
    pub classifier: C,
    pub metadata: ModelMetadata,
}

/// A binary probabilistic classifier.
///
/// Implementations must be immutable after loading; they are shared across
/// request threads.
pub trait Classifier: Send + Sync {
    /// Ordered feature names the classifier was fit on.
    fn feature_names(&self) -> &[String];

    /// Class probabilities `[negative, positive]` for each row.
    ///
    /// # Errors
    /// Returns `ModelError::Scoring` if a row cannot be scored.
    fn predict_proba(&self, rows: &[&[f64]]) -> Result<Vec<[f64; 2]>, ModelError>;

    /// The classifier's own labels (positive class above 0.5).
    ///
    /// These are not the calibrated risk labels.
    ///
    /// # Errors
    /// Returns `ModelError::Scoring` if a row cannot be scored.
    fn predict(&self, rows: &[&[f64]]) -> Result<Vec<u8>, ModelError> {
        Ok(self
            .predict_proba(rows)?
            .iter()
            .map(|p| u8::from(p[1] > 0.5))
            .collect())
    }
}

/// Loads the classifier artifact once at startup.
pub trait ModelLoader {
    type Model: Classifier;

    /// Load and validate the artifact.
    ///
    /// # Errors
    /// Returns `ModelError` if the artifact is missing, malformed,
    /// inconsistent with its metadata or fails its integrity check.
    fn load(&self) -> Result<LoadedModel<Self::Model>, ModelError>;
}

/// Turns normalized input into a calibrated prediction.
pub trait PredictionEngine: Send + Sync {
    /// Build the classifier row for `input`.
    ///
    /// # Errors
    /// `IncompleteInput` or `InvariantViolation` from the feature builder.
    fn preprocess(&self, input: &NormalizedInput) -> crate::Result<FeatureVector>;

    /// Score a prepared row.
    ///
    /// # Errors
    /// `ModelUnavailable` if the classifier fails; never a guessed result.
    fn predict(&self, vector: &FeatureVector) -> crate::Result<PredictionResult>;
}
