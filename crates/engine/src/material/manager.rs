//! Material lifecycle manager.
//!
//! A material moves `Submitted → Pending → {Added, Rejected}`:
//!
//! 1. Synchronous checks (file type, file handle, owning case state)
//! 2. Resolution against the owning case and defendant, or `Pending`
//! 3. Pending materials settle on reconciliation, expiry or ejection
//!
//! Every exit from `Pending` is a compare-and-transition in the
//! [`MaterialStore`], so a timer firing while the case resolves yields one
//! outcome only. The losing side publishes nothing.

use chrono::{DateTime, Utc};
use shared_types::{
    AppError, AttachmentStatus, CaseRecord, CaseStatus, EngineConfig, EventEnvelope,
    MaterialDefendant, MaterialKind, MaterialOutcome, MaterialRecord, MaterialStatus,
    PendingReason, PersonalInformation, Problem, ProblemCode, Scope, SessionState,
    SubmitIdpcRequest, SubmitMaterialRequest, SubmitMaterialV2Request, TimerClass,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::scheduler::TimerFired;
use crate::collaborators::{AttachDocumentRequest, Collaborators};
use crate::normalizer::{canonical_code, canonical_name};
use crate::publisher::{envelopes, Outcome, Publisher};
use crate::retry::with_retry;
use crate::store::{CaseStore, MaterialStore};

/// Where a material lands after a resolution attempt.
#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    Pending {
        case_id: Option<Uuid>,
        reason: PendingReason,
    },
    Added {
        case_id: Uuid,
        defendant_id: Option<Uuid>,
        warnings: Vec<Problem>,
    },
    Rejected {
        case_id: Option<Uuid>,
        problems: Vec<Problem>,
    },
    /// An IDPC bundle is already attached for the defendant.
    AlreadyExists { case_id: Uuid, defendant_id: Uuid },
    /// Transient refusal; nothing is recorded.
    Refused {
        case_id: Uuid,
        problems: Vec<Problem>,
    },
}

#[derive(Clone)]
pub struct MaterialManager {
    config: Arc<EngineConfig>,
    materials: MaterialStore,
    cases: CaseStore,
    collaborators: Collaborators,
    publisher: Publisher,
}

impl MaterialManager {
    pub fn new(
        config: Arc<EngineConfig>,
        materials: MaterialStore,
        cases: CaseStore,
        collaborators: Collaborators,
        publisher: Publisher,
    ) -> Self {
        Self {
            config,
            materials,
            cases,
            collaborators,
            publisher,
        }
    }

    // ── Intake ──────────────────────────────────────────────────────

    /// Submit a case- or defendant-level material.
    pub async fn submit_material(
        &self,
        request: SubmitMaterialRequest,
    ) -> Result<MaterialOutcome, AppError> {
        request.validate()?;
        if let Some(existing) = self.materials.get(request.material_id)? {
            return Ok(self.replay(existing));
        }
        let defendant = match non_blank(request.prosecutor_defendant_reference) {
            Some(reference) => MaterialDefendant::by_reference(reference),
            None => MaterialDefendant::default(),
        };
        let record = new_record(
            request.material_id,
            MaterialKind::Standard,
            &request.urn,
            defendant,
            canonical_code(&request.document_type),
            request.file_name,
            request.mime_type,
            request.file_handle,
            request.timer_class,
        );
        self.intake(record, Vec::new(), None).await
    }

    /// Submit a material whose defendant is named by reference and/or
    /// personal information. Partial identification is reported as warnings.
    pub async fn submit_material_v2(
        &self,
        request: SubmitMaterialV2Request,
    ) -> Result<MaterialOutcome, AppError> {
        request.validate()?;
        if let Some(existing) = self.materials.get(request.material_id)? {
            return Ok(self.replay(existing));
        }
        let defendant = MaterialDefendant {
            prosecutor_reference: non_blank(request.defendant.prosecutor_reference),
            personal_information: request
                .defendant
                .personal_information
                .map(|p| PersonalInformation {
                    forename: p.forename.trim().to_string(),
                    surname: p.surname.trim().to_string(),
                    date_of_birth: p.date_of_birth,
                }),
        };
        let mut record = new_record(
            request.material_id,
            MaterialKind::V2,
            &request.urn,
            defendant,
            canonical_code(&request.document_type),
            request.file_name,
            request.mime_type,
            request.file_handle,
            request.timer_class,
        );

        if record.defendant.is_empty() {
            let problem = Problem::new(ProblemCode::DefendantDetailsRequired, Scope::Case)
                .with_value("materialId", record.material_id.to_string());
            let early = Resolution::Rejected {
                case_id: None,
                problems: vec![problem],
            };
            return self.intake(record, Vec::new(), Some(early)).await;
        }
        if let (Some(reference), None) = (
            &record.defendant.prosecutor_reference,
            &record.defendant.personal_information,
        ) {
            let warning = Problem::new(ProblemCode::DefendantPersonalInformationMissing, Scope::Case)
                .with_value("prosecutorDefendantReference", reference.as_str());
            record.warnings.push(warning);
        }
        self.intake(record, Vec::new(), None).await
    }

    /// Submit an IDPC bundle for one defendant.
    pub async fn submit_idpc_material(
        &self,
        request: SubmitIdpcRequest,
    ) -> Result<MaterialOutcome, AppError> {
        request.validate()?;
        if let Some(existing) = self.materials.get(request.material_id)? {
            return Ok(self.replay(existing));
        }
        let record = new_record(
            request.material_id,
            MaterialKind::Idpc,
            &request.urn,
            MaterialDefendant::by_reference(request.prosecutor_defendant_reference.trim()),
            self.config.materials.idpc_document_type.clone(),
            request.file_name,
            request.mime_type,
            request.file_handle,
            TimerClass::Standard,
        );
        let received = Outcome::IdpcReceived {
            material_id: record.material_id,
            urn: record.urn.clone(),
        };
        self.intake(record, vec![received], None).await
    }

    async fn intake(
        &self,
        mut record: MaterialRecord,
        prelude: Vec<Outcome>,
        early: Option<Resolution>,
    ) -> Result<MaterialOutcome, AppError> {
        let resolution = match early {
            Some(resolution) => resolution,
            None => self.classify(&record).await?,
        };
        let at = record.submitted_at;

        if let Resolution::Refused { case_id, problems } = &resolution {
            tracing::info!(
                material_id = %record.material_id,
                case_id = %case_id,
                "Material refused while case is in session"
            );
            let mut outcomes = prelude;
            outcomes.push(Outcome::MaterialRejected {
                material_id: record.material_id,
                case_id: Some(*case_id),
                problems: problems.clone(),
            });
            self.publisher
                .publish_all(&envelopes(outcomes, record.material_id, at));
            return Ok(MaterialOutcome {
                material_id: record.material_id,
                status: MaterialStatus::Rejected,
                pending_reason: None,
                problems: problems.clone(),
                warnings: record.warnings.clone(),
                replayed: false,
            });
        }

        apply(&mut record, &resolution, at);
        let mut outcomes = prelude;
        outcomes.extend(outcomes_for(&record, &resolution));
        record.events = envelopes(outcomes, record.material_id, at);

        if let Some(existing) = self.materials.insert_new(record.clone())? {
            return Ok(self.replay(existing));
        }
        self.publisher.publish_all(&record.events);
        tracing::info!(
            material_id = %record.material_id,
            urn = %record.urn,
            status = record.status.as_str(),
            "Material received"
        );

        match record.status {
            MaterialStatus::Pending => {
                self.arm_timer(&record)?;
                return self.recheck_pending(record).await;
            }
            MaterialStatus::Added => {
                self.attach(&record).await;
            }
            MaterialStatus::Rejected => {}
        }
        Ok(MaterialOutcome::from_record(&record, false))
    }

    /// Look at the owning case again once the pending record is stored. A
    /// case accepted or ejected between classification and insert ran its
    /// reconciliation before this record was visible.
    async fn recheck_pending(&self, record: MaterialRecord) -> Result<MaterialOutcome, AppError> {
        let Some(case) = self.cases.find_by_urn(&record.urn)? else {
            return Ok(MaterialOutcome::from_record(&record, false));
        };
        let resolution = if case.status == CaseStatus::Ejected {
            let problem = Problem::new(ProblemCode::CaseEjected, scope_of(&record))
                .with_value("urn", case.urn.as_str());
            Resolution::Rejected {
                case_id: Some(case.case_id),
                problems: vec![problem],
            }
        } else if case.accepts_material() {
            match self.resolve_on_case(&record, &case) {
                Ok(resolution) => resolution,
                Err(e) => {
                    tracing::warn!(error = %e, material_id = %record.material_id, "Material left pending");
                    return Ok(MaterialOutcome::from_record(&record, false));
                }
            }
        } else {
            return Ok(MaterialOutcome::from_record(&record, false));
        };

        match self.settle(record.material_id, resolution, Utc::now())? {
            Some(updated) => {
                if updated.status != MaterialStatus::Pending {
                    tracing::info!(
                        material_id = %updated.material_id,
                        case_id = %case.case_id,
                        status = updated.status.as_str(),
                        "Pending material settled on recheck"
                    );
                }
                if updated.status == MaterialStatus::Added {
                    self.attach(&updated).await;
                }
                Ok(MaterialOutcome::from_record(&updated, false))
            }
            None => {
                let current = self.materials.get(record.material_id)?.unwrap_or(record);
                Ok(MaterialOutcome::from_record(&current, false))
            }
        }
    }

    /// Synchronous checks, then resolution against the owning case.
    async fn classify(&self, record: &MaterialRecord) -> Result<Resolution, AppError> {
        if !self
            .config
            .materials
            .is_supported(&record.mime_type, &record.file_name)
        {
            let problem = Problem::new(ProblemCode::FileTypeNotSupported, Scope::Case)
                .with_value("mimeType", record.mime_type.as_str())
                .with_value("fileName", record.file_name.as_str());
            return Ok(Resolution::Rejected {
                case_id: None,
                problems: vec![problem],
            });
        }

        let documents = Arc::clone(&self.collaborators.documents);
        let handle = record.file_handle.clone();
        let found = with_retry(&self.config.retry, "document_exists", || {
            let documents = Arc::clone(&documents);
            let handle = handle.clone();
            async move { documents.exists(&handle).await }
        })
        .await?;
        if !found {
            let problem = Problem::new(ProblemCode::MaterialFileNotFound, Scope::Case)
                .with_value("fileHandle", record.file_handle.as_str());
            return Ok(Resolution::Rejected {
                case_id: None,
                problems: vec![problem],
            });
        }

        let Some(case) = self.cases.find_by_urn(&record.urn)? else {
            return Ok(Resolution::Pending {
                case_id: None,
                reason: PendingReason::AwaitingCase,
            });
        };
        if case.status == CaseStatus::Ejected {
            let problem = Problem::new(ProblemCode::CaseEjected, Scope::Case)
                .with_value("urn", case.urn.as_str());
            return Ok(Resolution::Rejected {
                case_id: Some(case.case_id),
                problems: vec![problem],
            });
        }
        if let SessionState::Exclusive { session_id } = case.session {
            let problem = Problem::new(ProblemCode::CaseInActiveSession, Scope::Case)
                .with_value("urn", case.urn.as_str())
                .with_value("sessionId", session_id.to_string());
            return Ok(Resolution::Refused {
                case_id: case.case_id,
                problems: vec![problem],
            });
        }
        if let Some(rejected) = self.check_document_type(record, Some(case.case_id))? {
            return Ok(rejected);
        }
        if !case.accepts_material() {
            return Ok(Resolution::Pending {
                case_id: Some(case.case_id),
                reason: PendingReason::AwaitingCase,
            });
        }
        self.resolve_on_case(record, &case)
    }

    fn check_document_type(
        &self,
        record: &MaterialRecord,
        case_id: Option<Uuid>,
    ) -> Result<Option<Resolution>, AppError> {
        if record.kind == MaterialKind::Idpc {
            return Ok(None);
        }
        if self
            .collaborators
            .reference
            .document_type(&record.document_type)?
            .is_some()
        {
            return Ok(None);
        }
        let problem = Problem::new(ProblemCode::InvalidDocumentType, Scope::Case)
            .with_value("documentType", record.document_type.as_str());
        Ok(Some(Resolution::Rejected {
            case_id,
            problems: vec![problem],
        }))
    }

    /// Resolve against a case that accepts material.
    fn resolve_on_case(
        &self,
        record: &MaterialRecord,
        case: &CaseRecord,
    ) -> Result<Resolution, AppError> {
        if let Some(rejected) = self.check_document_type(record, Some(case.case_id))? {
            return Ok(rejected);
        }
        if !record.is_defendant_level() {
            return Ok(Resolution::Added {
                case_id: case.case_id,
                defendant_id: None,
                warnings: record.warnings.clone(),
            });
        }
        let Some((defendant_id, on_personal_information)) =
            find_defendant(case, &record.defendant)
        else {
            return Ok(Resolution::Pending {
                case_id: Some(case.case_id),
                reason: PendingReason::AwaitingDefendant,
            });
        };
        if record.kind == MaterialKind::Idpc
            && !self
                .materials
                .claim_idpc(case.case_id, defendant_id, record.material_id)?
        {
            return Ok(Resolution::AlreadyExists {
                case_id: case.case_id,
                defendant_id,
            });
        }

        let mut warnings = record.warnings.clone();
        if on_personal_information {
            if let Some(info) = &record.defendant.personal_information {
                warnings.push(
                    Problem::new(
                        ProblemCode::DefendantMatchedOnPersonalInformation,
                        Scope::Defendant { defendant_id },
                    )
                    .with_value("forename", info.forename.as_str())
                    .with_value("surname", info.surname.as_str())
                    .with_value("dateOfBirth", info.date_of_birth.to_string()),
                );
            }
        }
        Ok(Resolution::Added {
            case_id: case.case_id,
            defendant_id: Some(defendant_id),
            warnings,
        })
    }

    // ── Pending exits ───────────────────────────────────────────────

    /// Settle every material pending on a case that just became resolvable.
    /// Each material resolves independently; a reference-data failure leaves
    /// that one pending for the next pass.
    pub async fn reconcile_case(&self, case_id: Uuid) -> Result<Vec<MaterialOutcome>, AppError> {
        let case = self
            .cases
            .get(case_id)?
            .ok_or_else(|| AppError::not_found(format!("Case {} not found", case_id)))?;
        if case.status == CaseStatus::Ejected {
            return self.reject_pending_for_case(case_id);
        }
        if !case.accepts_material() {
            tracing::debug!(case_id = %case_id, status = case.status.as_str(), "Reconciliation skipped");
            return Ok(Vec::new());
        }

        let pending = self.materials.pending_for_urn(&case.urn)?;
        tracing::info!(case_id = %case_id, pending = pending.len(), "Reconciling pending materials");

        let now = Utc::now();
        let mut settled = Vec::new();
        for record in pending {
            let resolution = match self.resolve_on_case(&record, &case) {
                Ok(resolution) => resolution,
                Err(e) => {
                    tracing::warn!(error = %e, material_id = %record.material_id, "Material left pending");
                    continue;
                }
            };
            let Some(updated) = self.settle(record.material_id, resolution, now)? else {
                continue;
            };
            if updated.status == MaterialStatus::Added {
                self.attach(&updated).await;
            }
            settled.push(MaterialOutcome::from_record(&updated, false));
        }
        Ok(settled)
    }

    /// Expire a material whose timer fired while it was still pending.
    pub fn on_timer_fired(&self, fired: TimerFired) -> Result<Option<MaterialOutcome>, AppError> {
        let Some(record) = self.materials.get(fired.key)? else {
            tracing::debug!(key = %fired.key, "Timer fired for unknown material");
            return Ok(None);
        };
        if record.timer.is_some_and(|armed| armed != fired.handle) {
            tracing::debug!(material_id = %record.material_id, "Stale timer ignored");
            return Ok(None);
        }
        let problem = Problem::new(ProblemCode::MaterialExpired, scope_of(&record))
            .with_value("expiredAt", fired.fired_at.to_rfc3339());
        let resolution = Resolution::Rejected {
            case_id: record.case_id,
            problems: vec![problem],
        };
        let settled = self.settle(record.material_id, resolution, fired.fired_at)?;
        if settled.is_some() {
            tracing::info!(material_id = %record.material_id, "Pending material expired");
        }
        Ok(settled.map(|r| MaterialOutcome::from_record(&r, false)))
    }

    /// Reject every material still pending on an ejected case.
    pub fn reject_pending_for_case(&self, case_id: Uuid) -> Result<Vec<MaterialOutcome>, AppError> {
        let case = self
            .cases
            .get(case_id)?
            .ok_or_else(|| AppError::not_found(format!("Case {} not found", case_id)))?;
        let now = Utc::now();
        let mut rejected = Vec::new();
        for record in self.materials.pending_for_urn(&case.urn)? {
            let problem = Problem::new(ProblemCode::CaseEjected, scope_of(&record))
                .with_value("urn", case.urn.as_str());
            let resolution = Resolution::Rejected {
                case_id: Some(case_id),
                problems: vec![problem],
            };
            if let Some(updated) = self.settle(record.material_id, resolution, now)? {
                rejected.push(MaterialOutcome::from_record(&updated, false));
            }
        }
        if !rejected.is_empty() {
            tracing::info!(case_id = %case_id, count = rejected.len(), "Pending materials rejected on ejection");
        }
        Ok(rejected)
    }

    /// Move a pending material to `resolution` if nothing else settled it
    /// first. Returns the updated record when this call won.
    fn settle(
        &self,
        material_id: Uuid,
        resolution: Resolution,
        at: DateTime<Utc>,
    ) -> Result<Option<MaterialRecord>, AppError> {
        let mut published: Vec<EventEnvelope> = Vec::new();
        let mut released = None;
        let settled = self.materials.compare_and_transition(material_id, |m| {
            let reason_before = m.pending_reason;
            apply(m, &resolution, at);
            let unchanged = matches!(
                &resolution,
                Resolution::Pending { reason, .. } if reason_before == Some(*reason)
            );
            if !unchanged {
                published = envelopes(outcomes_for(m, &resolution), m.material_id, at);
                m.events.extend(published.iter().cloned());
            }
            if !m.is_pending() {
                released = m.timer.take();
            }
        })?;

        if settled.is_some() {
            self.publisher.publish_all(&published);
            if let Some(handle) = released {
                self.collaborators.scheduler.cancel(handle);
            }
        }
        Ok(settled)
    }

    fn arm_timer(&self, record: &MaterialRecord) -> Result<(), AppError> {
        let window = self.config.timers.duration(record.timer_class);
        let window = chrono::Duration::from_std(window)
            .map_err(|e| AppError::internal(format!("Timer window out of range: {}", e)))?;
        let scheduler = &self.collaborators.scheduler;
        let handle = scheduler
            .schedule(record.material_id, record.submitted_at + window)
            .inspect_err(|e| {
                tracing::error!(error = %e, material_id = %record.material_id, "Expiry timer not armed");
            })?;
        let armed = self
            .materials
            .compare_and_transition(record.material_id, |m| m.timer = Some(handle))?;
        if armed.is_none() {
            // Settled between insert and scheduling.
            scheduler.cancel(handle);
        }
        Ok(())
    }

    // ── Attachment ──────────────────────────────────────────────────

    fn attachment_required(&self, record: &MaterialRecord) -> Result<bool, AppError> {
        if !self.config.features.downstream_attach
            || record.case_id.is_none()
            || record.defendant_id.is_none()
        {
            return Ok(false);
        }
        if record.kind == MaterialKind::Idpc {
            return Ok(true);
        }
        Ok(self
            .collaborators
            .reference
            .document_type(&record.document_type)?
            .is_some_and(|d| d.court_document))
    }

    /// Forward a defendant-level court document to the CMS. Failures are
    /// recorded on the material, never surfaced to the submitter.
    async fn attach(&self, record: &MaterialRecord) -> AttachmentStatus {
        let required = match self.attachment_required(record) {
            Ok(required) => required,
            Err(e) => {
                return self.record_attachment(
                    record.material_id,
                    AttachmentStatus::Failed { reason: e.message },
                )
            }
        };
        let (Some(case_id), Some(defendant_id), true) =
            (record.case_id, record.defendant_id, required)
        else {
            return AttachmentStatus::NotRequired;
        };

        self.record_attachment(record.material_id, AttachmentStatus::Requested);
        let request = AttachDocumentRequest {
            material_id: record.material_id,
            case_id,
            defendant_id,
            document_type: record.document_type.clone(),
            file_handle: record.file_handle.clone(),
            file_name: record.file_name.clone(),
        };
        let cms = Arc::clone(&self.collaborators.cms);
        let result = with_retry(&self.config.retry, "attach_court_document", || {
            let cms = Arc::clone(&cms);
            let request = request.clone();
            async move { cms.attach_court_document(&request).await }
        })
        .await;

        let status = match result {
            Ok(()) => {
                tracing::info!(material_id = %record.material_id, case_id = %case_id, "Court document attached");
                AttachmentStatus::Attached
            }
            Err(e) => AttachmentStatus::Failed { reason: e.message },
        };
        self.record_attachment(record.material_id, status)
    }

    fn record_attachment(&self, material_id: Uuid, status: AttachmentStatus) -> AttachmentStatus {
        if let Err(e) = self
            .materials
            .update(material_id, |m| m.attachment = status.clone())
        {
            tracing::error!(error = %e, material_id = %material_id, "Attachment status not recorded");
        }
        status
    }

    /// Re-attempt every attachment that failed. Returns how many succeeded.
    pub async fn retry_failed_attachments(&self) -> Result<usize, AppError> {
        let failed = self.materials.failed_attachments()?;
        let mut attached = 0;
        for record in &failed {
            if self.attach(record).await == AttachmentStatus::Attached {
                attached += 1;
            }
        }
        tracing::info!(failed = failed.len(), attached, "Attachment retry pass finished");
        Ok(attached)
    }

    fn replay(&self, record: MaterialRecord) -> MaterialOutcome {
        tracing::info!(
            material_id = %record.material_id,
            events = record.events.len(),
            "Replaying material outcome"
        );
        self.publisher.publish_all(&record.events);
        MaterialOutcome::from_record(&record, true)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn new_record(
    material_id: Uuid,
    kind: MaterialKind,
    urn: &str,
    defendant: MaterialDefendant,
    document_type: String,
    file_name: String,
    mime_type: String,
    file_handle: String,
    timer_class: TimerClass,
) -> MaterialRecord {
    MaterialRecord {
        material_id,
        kind,
        urn: canonical_code(urn),
        case_id: None,
        defendant,
        defendant_id: None,
        document_type,
        file_name: file_name.trim().to_string(),
        mime_type: mime_type.trim().to_lowercase(),
        file_handle: file_handle.trim().to_string(),
        timer_class,
        status: MaterialStatus::Pending,
        pending_reason: None,
        problems: Vec::new(),
        warnings: Vec::new(),
        timer: None,
        attachment: AttachmentStatus::NotRequired,
        events: Vec::new(),
        submitted_at: Utc::now(),
        resolved_at: None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn scope_of(record: &MaterialRecord) -> Scope {
    match record.defendant_id {
        Some(defendant_id) => Scope::Defendant { defendant_id },
        None => Scope::Case,
    }
}

/// Active defendant named by the material. The flag is set when only the
/// name and date of birth matched.
fn find_defendant(case: &CaseRecord, wanted: &MaterialDefendant) -> Option<(Uuid, bool)> {
    if let Some(reference) = &wanted.prosecutor_reference {
        if let Some(d) = case.defendant_by_reference(reference) {
            return Some((d.id, false));
        }
    }
    let info = wanted.personal_information.as_ref()?;
    let forename = canonical_name(&info.forename);
    let surname = canonical_name(&info.surname);
    let mut hits = case.defendants.iter().filter(|d| {
        d.person().is_some_and(|p| {
            canonical_name(&p.forename) == forename
                && canonical_name(&p.surname) == surname
                && p.date_of_birth == Some(info.date_of_birth)
        })
    });
    match (hits.next(), hits.next()) {
        (Some(d), None) => Some((d.id, true)),
        _ => None,
    }
}

fn apply(record: &mut MaterialRecord, resolution: &Resolution, at: DateTime<Utc>) {
    match resolution {
        Resolution::Pending { case_id, reason } => {
            record.case_id = *case_id;
            record.pending_reason = Some(*reason);
        }
        Resolution::Added {
            case_id,
            defendant_id,
            warnings,
        } => {
            record.status = MaterialStatus::Added;
            record.case_id = Some(*case_id);
            record.defendant_id = *defendant_id;
            record.warnings = warnings.clone();
            record.pending_reason = None;
            record.resolved_at = Some(at);
        }
        Resolution::Rejected { case_id, problems } => {
            record.status = MaterialStatus::Rejected;
            if case_id.is_some() {
                record.case_id = *case_id;
            }
            record.problems = problems.clone();
            record.pending_reason = None;
            record.resolved_at = Some(at);
        }
        Resolution::AlreadyExists {
            case_id,
            defendant_id,
        } => {
            record.status = MaterialStatus::Rejected;
            record.case_id = Some(*case_id);
            record.defendant_id = Some(*defendant_id);
            record.pending_reason = None;
            record.resolved_at = Some(at);
        }
        Resolution::Refused { .. } => {}
    }
}

/// Outcomes announcing a resolution, by material kind.
fn outcomes_for(record: &MaterialRecord, resolution: &Resolution) -> Vec<Outcome> {
    let material_id = record.material_id;
    let idpc = record.kind == MaterialKind::Idpc;
    let outcome = match resolution {
        Resolution::Pending { reason, .. } if idpc => Outcome::IdpcMatchPending {
            material_id,
            urn: record.urn.clone(),
            reason: *reason,
        },
        Resolution::Pending { case_id, reason } => Outcome::MaterialPending {
            material_id,
            case_id: *case_id,
            reason: *reason,
            warnings: record.warnings.clone(),
        },
        Resolution::Added {
            case_id,
            defendant_id: Some(defendant_id),
            ..
        } if idpc => Outcome::IdpcMatched {
            material_id,
            case_id: *case_id,
            defendant_id: *defendant_id,
        },
        Resolution::Added {
            case_id,
            defendant_id,
            warnings,
        } => Outcome::MaterialAdded {
            material_id,
            case_id: *case_id,
            defendant_id: *defendant_id,
            document_type: record.document_type.clone(),
            warnings: warnings.clone(),
        },
        Resolution::Rejected { case_id, problems } => Outcome::MaterialRejected {
            material_id,
            case_id: *case_id,
            problems: problems.clone(),
        },
        Resolution::AlreadyExists {
            case_id,
            defendant_id,
        } => Outcome::IdpcAlreadyExists {
            material_id,
            case_id: *case_id,
            defendant_id: *defendant_id,
        },
        Resolution::Refused { case_id, problems } => Outcome::MaterialRejected {
            material_id,
            case_id: Some(*case_id),
            problems: problems.clone(),
        },
    };
    vec![outcome]
}
