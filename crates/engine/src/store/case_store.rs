use shared_types::{AppError, CaseRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::lock;

/// Case aggregates keyed by case id, with a urn index for material and form
/// lookups. Writes are compare-and-swap on `version`.
#[derive(Clone, Default)]
pub struct CaseStore {
    inner: Arc<Mutex<CaseStoreInner>>,
}

#[derive(Default)]
struct CaseStoreInner {
    cases: HashMap<Uuid, CaseRecord>,
    by_urn: HashMap<String, Uuid>,
}

impl CaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, case_id: Uuid) -> Result<Option<CaseRecord>, AppError> {
        Ok(lock(&self.inner)?.cases.get(&case_id).cloned())
    }

    pub fn find_by_urn(&self, urn: &str) -> Result<Option<CaseRecord>, AppError> {
        let inner = lock(&self.inner)?;
        Ok(inner
            .by_urn
            .get(urn)
            .and_then(|id| inner.cases.get(id))
            .cloned())
    }

    /// Store a brand-new case at version 1.
    pub fn insert(&self, mut record: CaseRecord) -> Result<CaseRecord, AppError> {
        let mut inner = lock(&self.inner)?;
        if inner.cases.contains_key(&record.case_id) {
            return Err(AppError::conflict(format!(
                "Case {} already exists",
                record.case_id
            )));
        }
        record.version = 1;
        match inner.by_urn.get(&record.urn).copied() {
            Some(existing) => {
                tracing::warn!(urn = %record.urn, existing = %existing, case_id = %record.case_id, "URN already indexed to another case");
            }
            None => {
                inner.by_urn.insert(record.urn.clone(), record.case_id);
            }
        }
        inner.cases.insert(record.case_id, record.clone());
        Ok(record)
    }

    /// Replace the case if its stored version is still `expected_version`.
    /// The stored copy comes back with the version bumped.
    pub fn compare_and_swap(
        &self,
        expected_version: u64,
        mut record: CaseRecord,
    ) -> Result<CaseRecord, AppError> {
        let mut inner = lock(&self.inner)?;
        let current = inner
            .cases
            .get(&record.case_id)
            .map(|c| c.version)
            .ok_or_else(|| AppError::not_found(format!("Case {} not found", record.case_id)))?;
        if current != expected_version {
            return Err(AppError::conflict(format!(
                "Case {} is at version {}, expected {}",
                record.case_id, current, expected_version
            )));
        }
        record.version = expected_version + 1;
        inner.cases.insert(record.case_id, record.clone());
        Ok(record)
    }
}
