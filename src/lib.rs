//! # HeartWise
//!
//! Cardiovascular risk estimation pipeline.
//!
//! This crate provides:
//! - A field dictionary translating localized form keys into the classifier's
//!   feature names and the storage column names
//! - Unit normalization of raw form values (per-day to per-week, coded enums,
//!   integer age to age bracket)
//! - A feature vector builder reproducing the classifier's exact schema
//! - A calibrated prediction engine and a best-effort result persister
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and the pure pipeline stages
//! - `ports`: Trait definitions for the classifier and storage seams
//! - `adapters`: Concrete implementations (JSON model artifact, SQLite, log sanitizing)
//! - `application`: Services orchestrating domain and ports
//! - `config`: Explicit application configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{
    AgeBracket, FeatureVector, Field, FormStep, FormVariant, ModelSchema, NormalizedInput,
    PredictionResponse, PredictionResult, RawInput, RiskLabel,
};

/// Result type for HeartWise operations
pub type Result<T> = std::result::Result<T, HeartwiseError>;

/// Message shown to users for every failure that is not user-correctable.
pub const GENERIC_USER_MESSAGE: &str =
    "A processing error occurred while evaluating the form. Please try again later.";

/// Main error type for HeartWise
#[derive(Debug, thiserror::Error)]
pub enum HeartwiseError {
    #[error("Invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Form step '{step}' is incomplete: missing {}", .missing.join(", "))]
    IncompleteInput {
        step: FormStep,
        missing: Vec<String>,
    },

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ports::ModelError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] adapters::StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HeartwiseError {
    pub(crate) fn validation(field: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the user can fix the request by editing the form.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::IncompleteInput { .. })
    }

    /// Message safe to show to the end user.
    ///
    /// Validation failures name the offending field; everything else is
    /// reported generically and only logged in full server-side.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_user_correctable() {
            self.to_string()
        } else {
            GENERIC_USER_MESSAGE.to_string()
        }
    }
}
