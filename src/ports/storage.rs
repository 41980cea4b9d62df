//! Storage port: Trait for persisting prediction records.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use crate::domain::{PersistedRecord, RecordId, StoredPrediction};

/// A page of stored predictions with pagination metadata.
#[derive(Debug, Clone)]
pub struct PredictionPage {
    /// Predictions in this page, newest first
    pub items: Vec<StoredPrediction>,
    /// Total count of all predictions
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
    /// Whether there are more pages
    pub has_more: bool,
}

impl PredictionPage {
    #[must_use]
    pub fn new(items: Vec<StoredPrediction>, total_count: usize, offset: usize, limit: usize) -> Self {
        let has_more = offset + items.len() < total_count;
        Self {
            items,
            total_count,
            offset,
            limit,
            has_more,
        }
    }

    /// Get the next page offset.
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more.then(|| self.offset + self.limit)
    }

    /// Get the previous page offset.
    #[must_use]
    pub fn prev_offset(&self) -> Option<usize> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }
}

/// Durable store for prediction records.
///
/// Each write is its own transaction; no session is shared between calls.
pub trait PredictionRepository: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write one record and return its identifier.
    ///
    /// # Errors
    /// Returns error if the record does not fit the fixed schema or the
    /// write fails. Nothing is written in that case.
    fn save(&self, record: &PersistedRecord) -> Result<RecordId, Self::Error>;

    /// Load the most recent records (up to `limit`), newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_recent(&self, limit: usize) -> Result<Vec<StoredPrediction>, Self::Error>;

    /// Load records with offset pagination, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_page(&self, offset: usize, limit: usize) -> Result<PredictionPage, Self::Error>;

    /// Total number of stored records.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count(&self) -> Result<usize, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offsets() {
        let page = PredictionPage::new(Vec::new(), 25, 10, 10);
        assert!(page.has_more);
        assert_eq!(page.next_offset(), Some(20));
        assert_eq!(page.prev_offset(), Some(0));

        let first = PredictionPage::new(Vec::new(), 0, 0, 10);
        assert!(!first.has_more);
        assert_eq!(first.next_offset(), None);
        assert_eq!(first.prev_offset(), None);
    }
}
