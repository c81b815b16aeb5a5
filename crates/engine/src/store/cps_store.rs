use shared_types::{AppError, CpsSubmissionRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::lock;

/// Processed court-form submissions keyed by submission id.
#[derive(Clone, Default)]
pub struct CpsStore {
    inner: Arc<Mutex<HashMap<Uuid, CpsSubmissionRecord>>>,
}

impl CpsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, submission_id: Uuid) -> Result<Option<CpsSubmissionRecord>, AppError> {
        Ok(lock(&self.inner)?.get(&submission_id).cloned())
    }

    /// Insert unless already recorded. Returns the earlier record on a repeat.
    pub fn insert_new(
        &self,
        record: CpsSubmissionRecord,
    ) -> Result<Option<CpsSubmissionRecord>, AppError> {
        let mut inner = lock(&self.inner)?;
        if let Some(existing) = inner.get(&record.submission_id) {
            return Ok(Some(existing.clone()));
        }
        inner.insert(record.submission_id, record);
        Ok(None)
    }
}
