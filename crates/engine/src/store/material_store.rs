use shared_types::{AppError, AttachmentStatus, MaterialRecord, MaterialStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::lock;

#[derive(Default)]
struct Materials {
    by_id: HashMap<Uuid, MaterialRecord>,
    /// (case, defendant) to the IDPC bundle that owns the slot.
    idpc_holders: HashMap<(Uuid, Uuid), Uuid>,
}

impl Materials {
    /// A holder keeps the slot until its bundle is rejected. A holder not
    /// yet inserted is still on its way in.
    fn idpc_slot_held(&self, key: &(Uuid, Uuid), claimant: Uuid) -> bool {
        match self.idpc_holders.get(key) {
            Some(holder) if *holder != claimant => self
                .by_id
                .get(holder)
                .map_or(true, |m| m.status != MaterialStatus::Rejected),
            _ => false,
        }
    }
}

/// Material records keyed by material id.
///
/// Leaving `Pending` goes through [`MaterialStore::compare_and_transition`],
/// which applies a change only while the record is still pending. Two
/// racing exits (timer vs resolution) therefore settle on exactly one.
#[derive(Clone, Default)]
pub struct MaterialStore {
    inner: Arc<Mutex<Materials>>,
}

impl MaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, material_id: Uuid) -> Result<Option<MaterialRecord>, AppError> {
        Ok(lock(&self.inner)?.by_id.get(&material_id).cloned())
    }

    /// Insert unless the id is known. Returns the existing record on a repeat.
    pub fn insert_new(&self, record: MaterialRecord) -> Result<Option<MaterialRecord>, AppError> {
        let mut inner = lock(&self.inner)?;
        if let Some(existing) = inner.by_id.get(&record.material_id) {
            return Ok(Some(existing.clone()));
        }
        inner.by_id.insert(record.material_id, record);
        Ok(None)
    }

    /// Apply `change` if the material is still pending. `None` means another
    /// exit got there first (or the id is unknown) and nothing was changed.
    pub fn compare_and_transition<F>(
        &self,
        material_id: Uuid,
        change: F,
    ) -> Result<Option<MaterialRecord>, AppError>
    where
        F: FnOnce(&mut MaterialRecord),
    {
        let mut inner = lock(&self.inner)?;
        match inner.by_id.get_mut(&material_id) {
            Some(record) if record.status == MaterialStatus::Pending => {
                change(record);
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    /// Unconditional update for bookkeeping outside the pending exit.
    pub fn update<F>(&self, material_id: Uuid, change: F) -> Result<Option<MaterialRecord>, AppError>
    where
        F: FnOnce(&mut MaterialRecord),
    {
        let mut inner = lock(&self.inner)?;
        Ok(inner.by_id.get_mut(&material_id).map(|record| {
            change(record);
            record.clone()
        }))
    }

    /// Pending materials for a case urn, oldest first.
    pub fn pending_for_urn(&self, urn: &str) -> Result<Vec<MaterialRecord>, AppError> {
        let inner = lock(&self.inner)?;
        let mut pending: Vec<MaterialRecord> = inner
            .by_id
            .values()
            .filter(|m| m.status == MaterialStatus::Pending && m.urn == urn)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.submitted_at);
        Ok(pending)
    }

    pub fn failed_attachments(&self) -> Result<Vec<MaterialRecord>, AppError> {
        let inner = lock(&self.inner)?;
        let mut failed: Vec<MaterialRecord> = inner
            .by_id
            .values()
            .filter(|m| matches!(m.attachment, AttachmentStatus::Failed { .. }))
            .cloned()
            .collect();
        failed.sort_by_key(|m| m.submitted_at);
        Ok(failed)
    }

    /// Claim the one IDPC slot of a defendant for `material_id`. Check and
    /// claim happen under one lock, so of two racing bundles only one gets
    /// `true`. Claiming again with the same id is a no-op that succeeds.
    pub fn claim_idpc(
        &self,
        case_id: Uuid,
        defendant_id: Uuid,
        material_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut inner = lock(&self.inner)?;
        let key = (case_id, defendant_id);
        if inner.idpc_slot_held(&key, material_id) {
            return Ok(false);
        }
        inner.idpc_holders.insert(key, material_id);
        Ok(true)
    }
}
