//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (model artifact, storage).

mod model;
mod storage;

pub use model::{
    Classifier, LoadedModel, ModelError, ModelLoader, ModelMetadata, PredictionEngine,
};
pub use storage::{PredictionPage, PredictionRepository};
