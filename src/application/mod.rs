//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod engine;
mod persister;
mod prediction;

pub use engine::CalibratedEngine;
pub use persister::{to_record, ResultPersister};
pub use prediction::{PredictionService, Submission};
