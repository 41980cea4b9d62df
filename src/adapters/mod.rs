//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifact`: JSON classifier artifact with integrity manifest
//! - `sqlite`: SQLite for prediction records
//! - `sanitize`: personal data filtering for logs

pub mod artifact;
pub mod sanitize;
pub mod sqlite;

pub use artifact::{JsonModelLoader, LinearDiscriminant};
pub use sqlite::{SqliteRepository, StorageError};
