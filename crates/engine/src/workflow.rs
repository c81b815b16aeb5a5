//! Case aggregate workflow.
//!
//! State machine per case:
//! `Received → Validating → {Accepted, AcceptedWithWarnings, PartiallyRejected}`,
//! corrections loop `PartiallyRejected` back through `Validating`, summons
//! cases park clean defendants in `ParkedForApproval`, and `Ejected` is
//! terminal.
//!
//! Every write is a read-modify-write on the case version. Events are built
//! inside the write, recorded against the submission id for replay, and
//! published only once the write has landed.

use chrono::Utc;
use shared_types::{
    AppError, CaseDetails, CaseOutcome, CaseRecord, CaseStatus, CorrectionRequest,
    CorrectionTarget, DefendantDetails, DownstreamStatus, EngineConfig, EventEnvelope, Problem,
    ProblemCode, Prosecution, Scope, SessionState, SubmitProsecutionRequest, SummonsDecision,
    ValidationReport,
};
use shared_types::{CaseCorrection, Defendant, DefendantCorrection};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::collaborators::{Collaborators, CreateCaseRequest};
use crate::normalizer::{canonical_code, merge_into_case, normalize, NormalizeContext};
use crate::notify::spawn_validation_failure;
use crate::publisher::{envelopes, Outcome, Publisher};
use crate::retry::with_retry;
use crate::store::CaseStore;
use crate::validation::{self, ValidationContext};

/// Follow-up call to the case-management system after a write.
#[derive(Debug, Clone)]
enum Downstream {
    /// Create the case with every active defendant.
    Create,
    AddDefendants(Vec<Defendant>),
}

/// What one evaluation did to a case.
#[derive(Debug, Default)]
struct Transition {
    outcomes: Vec<Outcome>,
    downstream: Option<Downstream>,
    /// Problems worth telling the informant about.
    failed: Option<Vec<Problem>>,
}

/// A committed write: the events to publish and the follow-up work.
struct Committed {
    events: Vec<EventEnvelope>,
    downstream: Option<Downstream>,
    failed: Option<Vec<Problem>>,
}

#[derive(Clone)]
pub struct CaseWorkflow {
    config: Arc<EngineConfig>,
    cases: CaseStore,
    collaborators: Collaborators,
    publisher: Publisher,
}

impl CaseWorkflow {
    pub fn new(
        config: Arc<EngineConfig>,
        cases: CaseStore,
        collaborators: Collaborators,
        publisher: Publisher,
    ) -> Self {
        Self {
            config,
            cases,
            collaborators,
            publisher,
        }
    }

    pub fn get_case(&self, case_id: Uuid) -> Result<Option<CaseRecord>, AppError> {
        self.cases.get(case_id)
    }

    // ── Submissions ─────────────────────────────────────────────────

    pub async fn submit_prosecution(
        &self,
        raw: SubmitProsecutionRequest,
    ) -> Result<CaseOutcome, AppError> {
        let existing = self.cases.get(raw.case_id)?;
        if let Some(case) = &existing {
            if let Some(outcome) = self.replay(case, raw.submission_id) {
                return Ok(outcome);
            }
            if case.status.is_accepted() {
                return Ok(self.reject_duplicate(case, raw.submission_id));
            }
            if case.status == CaseStatus::Ejected {
                return Err(AppError::conflict(format!(
                    "Case {} has been ejected",
                    case.case_id
                )));
            }
        }

        let ctx = NormalizeContext {
            is_resubmission: existing.is_some(),
            dedup: &self.config.dedup,
            rules: &self.config.rules,
        };
        let prosecution = normalize(raw, &ctx)?;
        tracing::info!(
            case_id = %prosecution.case_id,
            submission_id = %prosecution.submission_id,
            channel = %prosecution.channel,
            defendants = prosecution.defendants.len(),
            "Prosecution received"
        );

        match existing {
            None => self.open_case(prosecution).await,
            Some(_) => self.resubmit(prosecution).await,
        }
    }

    async fn open_case(&self, prosecution: Prosecution) -> Result<CaseOutcome, AppError> {
        let now = Utc::now();
        let submission_id = prosecution.submission_id;
        let mut case = CaseRecord {
            case_id: prosecution.case_id,
            urn: prosecution.urn.clone(),
            channel: prosecution.channel,
            version: 0,
            status: CaseStatus::Received,
            details: details_of(&prosecution),
            defendants: prosecution.defendants.clone(),
            parked_defendants: Vec::new(),
            problems: Vec::new(),
            warnings: Vec::new(),
            session: SessionState::Open,
            downstream: DownstreamStatus::NotRequested,
            processed_submissions: HashMap::new(),
            created_at: now,
            updated_at: now,
        };

        case.status = CaseStatus::Validating;
        let report = self.evaluate(&prosecution)?;
        let transition = apply_report(&mut case, report);
        let committed = commit(&mut case, submission_id, transition);

        match self.cases.insert(case) {
            Ok(stored) => self.finish(stored, committed).await,
            Err(e) if e.is_conflict() => {
                tracing::warn!(case_id = %prosecution.case_id, "Case opened concurrently, merging");
                self.resubmit(prosecution).await
            }
            Err(e) => Err(e),
        }
    }

    /// Merge a re-submission into a known case and re-evaluate all of it.
    async fn resubmit(&self, prosecution: Prosecution) -> Result<CaseOutcome, AppError> {
        let submission_id = prosecution.submission_id;
        let dedup = self.config.dedup.applies(prosecution.channel, true);
        let include_organisations = self.config.dedup.include_organisations;

        let (stored, committed) = self.update_case(prosecution.case_id, |case| {
            if case.processed_submissions.contains_key(&submission_id)
                || case.status.is_accepted()
            {
                return Ok(None);
            }
            if case.status == CaseStatus::Ejected {
                return Err(AppError::conflict(format!(
                    "Case {} has been ejected",
                    case.case_id
                )));
            }
            case.details = details_of(&prosecution);
            case.parked_defendants
                .retain(|p| !prosecution.defendants.iter().any(|d| d.id == p.id));
            merge_into_case(
                &mut case.defendants,
                prosecution.defendants.clone(),
                dedup,
                include_organisations,
            );
            case.status = CaseStatus::Validating;
            let report = self.evaluate(&case.to_prosecution(submission_id))?;
            let transition = apply_report(case, report);
            Ok(Some(commit(case, submission_id, transition)))
        })?;

        match committed {
            Some(committed) => self.finish(stored, committed).await,
            None => Ok(self
                .replay(&stored, submission_id)
                .unwrap_or_else(|| self.reject_duplicate(&stored, submission_id))),
        }
    }

    /// A new submission for a case that is already accepted.
    fn reject_duplicate(&self, case: &CaseRecord, submission_id: Uuid) -> CaseOutcome {
        let problem = Problem::new(ProblemCode::DuplicatedProsecution, Scope::Case)
            .with_value("urn", case.urn.as_str());
        tracing::info!(case_id = %case.case_id, submission_id = %submission_id, "Duplicate prosecution rejected");
        let events = Outcome::ProsecutionRejected {
            case_id: case.case_id,
            urn: case.urn.clone(),
            problems: vec![problem.clone()],
        }
        .into_envelopes(submission_id, Utc::now());
        self.publisher.publish_all(&events);
        CaseOutcome {
            case_id: case.case_id,
            status: case.status,
            version: case.version,
            problems: vec![problem],
            warnings: Vec::new(),
            replayed: false,
        }
    }

    fn replay(&self, case: &CaseRecord, submission_id: Uuid) -> Option<CaseOutcome> {
        let events = case.processed_submissions.get(&submission_id)?;
        tracing::info!(case_id = %case.case_id, submission_id = %submission_id, "Replaying recorded outcome");
        self.publisher.publish_all(events);
        Some(outcome_of(case, true))
    }

    // ── Corrections ─────────────────────────────────────────────────

    /// Apply a case- or defendant-level correction and re-evaluate the case.
    pub async fn submit_correction(
        &self,
        request: CorrectionRequest,
    ) -> Result<CaseOutcome, AppError> {
        let submission_id = request.submission_id;
        let (stored, committed) = self.update_case(request.case_id, |case| {
            if case.processed_submissions.contains_key(&submission_id) {
                return Ok(None);
            }
            if case.status != CaseStatus::PartiallyRejected {
                return Err(AppError::conflict(format!(
                    "Case {} is {}, corrections need partially_rejected",
                    case.case_id,
                    case.status.as_str()
                )));
            }
            match &request.target {
                CorrectionTarget::Case(correction) => correct_case(case, correction),
                CorrectionTarget::Defendant {
                    defendant_id,
                    correction,
                } => correct_defendant(case, *defendant_id, correction)?,
            }
            case.status = CaseStatus::Validating;
            let report = self.evaluate(&case.to_prosecution(submission_id))?;
            let transition = apply_report(case, report);
            Ok(Some(commit(case, submission_id, transition)))
        })?;

        match committed {
            Some(committed) => {
                tracing::info!(case_id = %stored.case_id, status = stored.status.as_str(), "Correction applied");
                self.finish(stored, committed).await
            }
            None => self
                .replay(&stored, submission_id)
                .ok_or_else(|| AppError::internal("Correction skipped without a recorded outcome")),
        }
    }

    // ── Summons parking ─────────────────────────────────────────────

    /// Move parked defendants onto the case. An empty list approves all.
    pub async fn approve_summons(&self, decision: SummonsDecision) -> Result<CaseOutcome, AppError> {
        let submission_id = decision.submission_id;
        let (stored, committed) = self.update_case(decision.case_id, |case| {
            if case.processed_submissions.contains_key(&submission_id) {
                return Ok(None);
            }
            if !case.problems.is_empty() {
                return Err(AppError::conflict(format!(
                    "Case {} has {} open problems, correct them before approving",
                    case.case_id,
                    case.problems.len()
                )));
            }
            let approved = take_parked(case, &decision.defendant_ids)?;
            let ids: Vec<Uuid> = approved.iter().map(|d| d.id).collect();
            let downstream = if case.downstream == DownstreamStatus::Created {
                Downstream::AddDefendants(approved.clone())
            } else {
                case.downstream = DownstreamStatus::Pending;
                Downstream::Create
            };
            case.defendants.extend(approved);
            case.status = accepted_status(case);
            let transition = Transition {
                outcomes: vec![Outcome::SummonsApproved {
                    case_id: case.case_id,
                    defendant_ids: ids,
                }],
                downstream: Some(downstream),
                failed: None,
            };
            Ok(Some(commit(case, submission_id, transition)))
        })?;

        match committed {
            Some(committed) => {
                tracing::info!(case_id = %stored.case_id, "Summons approved");
                self.finish(stored, committed).await
            }
            None => self
                .replay(&stored, submission_id)
                .ok_or_else(|| AppError::internal("Approval skipped without a recorded outcome")),
        }
    }

    /// Drop parked defendants. An empty list rejects all.
    pub async fn reject_summons(&self, decision: SummonsDecision) -> Result<CaseOutcome, AppError> {
        let submission_id = decision.submission_id;
        let (stored, committed) = self.update_case(decision.case_id, |case| {
            if case.processed_submissions.contains_key(&submission_id) {
                return Ok(None);
            }
            let rejected = take_parked(case, &decision.defendant_ids)?;
            let transition = Transition {
                outcomes: vec![Outcome::SummonsRejected {
                    case_id: case.case_id,
                    defendant_ids: rejected.iter().map(|d| d.id).collect(),
                }],
                ..Default::default()
            };
            Ok(Some(commit(case, submission_id, transition)))
        })?;

        match committed {
            Some(committed) => {
                tracing::info!(case_id = %stored.case_id, "Summons rejected");
                self.finish(stored, committed).await
            }
            None => self
                .replay(&stored, submission_id)
                .ok_or_else(|| AppError::internal("Rejection skipped without a recorded outcome")),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Terminal. Pending materials are rejected by the caller afterwards.
    pub fn eject_case(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        let (stored, events) = self.update_case(case_id, |case| {
            if case.status == CaseStatus::Ejected {
                return Ok(None);
            }
            case.status = CaseStatus::Ejected;
            let outcome = Outcome::CaseEjected {
                case_id: case.case_id,
                urn: case.urn.clone(),
            };
            Ok(Some(outcome.into_envelopes(case.case_id, Utc::now())))
        })?;
        if let Some(events) = events {
            tracing::info!(case_id = %case_id, "Case ejected");
            self.publisher.publish_all(&events);
        }
        Ok(outcome_of(&stored, false))
    }

    pub fn begin_session(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        let (stored, _) = self.update_case(case_id, |case| {
            if case.status == CaseStatus::Ejected {
                return Err(AppError::conflict(format!("Case {} has been ejected", case_id)));
            }
            if let SessionState::Exclusive { session_id } = case.session {
                return Err(AppError::conflict(format!(
                    "Case {} already in session {}",
                    case_id, session_id
                )));
            }
            case.session = SessionState::Exclusive {
                session_id: Uuid::new_v4(),
            };
            Ok(Some(()))
        })?;
        tracing::info!(case_id = %case_id, "Session started");
        Ok(outcome_of(&stored, false))
    }

    pub fn end_session(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        let (stored, ended) = self.update_case(case_id, |case| {
            if case.session == SessionState::Open {
                return Ok(None);
            }
            case.session = SessionState::Open;
            Ok(Some(()))
        })?;
        if ended.is_some() {
            tracing::info!(case_id = %case_id, "Session ended");
        }
        Ok(outcome_of(&stored, false))
    }

    /// Re-attempt a downstream creation that failed operationally.
    pub async fn retry_downstream(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        let (stored, _) = self.update_case(case_id, |case| {
            match &case.downstream {
                DownstreamStatus::Failed { .. } if case.status.is_accepted() => {}
                other => {
                    return Err(AppError::conflict(format!(
                        "Case {} has no failed downstream creation ({:?})",
                        case_id, other
                    )))
                }
            }
            case.downstream = DownstreamStatus::Pending;
            Ok(Some(()))
        })?;
        let stored = self.run_downstream(stored, Downstream::Create).await?;
        Ok(outcome_of(&stored, false))
    }

    // ── Internals ───────────────────────────────────────────────────

    fn evaluate(&self, prosecution: &Prosecution) -> Result<ValidationReport, AppError> {
        let ctx = ValidationContext {
            today: Utc::now().date_naive(),
            reference: self.collaborators.reference.as_ref(),
            rules: &self.config.rules,
        };
        validation::evaluate(prosecution, &ctx)
    }

    /// Read-modify-write with optimistic retry. `change` returning `None`
    /// skips the write and hands back the current record.
    fn update_case<T>(
        &self,
        case_id: Uuid,
        mut change: impl FnMut(&mut CaseRecord) -> Result<Option<T>, AppError>,
    ) -> Result<(CaseRecord, Option<T>), AppError> {
        let attempts = self.config.concurrency.max_retries.max(1);
        for attempt in 1..=attempts {
            let current = self
                .cases
                .get(case_id)?
                .ok_or_else(|| AppError::not_found(format!("Case {} not found", case_id)))?;
            let mut next = current.clone();
            let Some(out) = change(&mut next)? else {
                return Ok((current, None));
            };
            next.updated_at = Utc::now();
            match self.cases.compare_and_swap(current.version, next) {
                Ok(stored) => return Ok((stored, Some(out))),
                Err(e) if e.is_conflict() => {
                    tracing::warn!(case_id = %case_id, attempt, "Case version conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::conflict(format!(
            "Case {} kept changing, gave up after {} attempts",
            case_id, attempts
        )))
    }

    /// Publish, notify and call downstream once a write has landed.
    async fn finish(
        &self,
        stored: CaseRecord,
        committed: Committed,
    ) -> Result<CaseOutcome, AppError> {
        self.publisher.publish_all(&committed.events);
        if let Some(problems) = &committed.failed {
            let _ = spawn_validation_failure(
                Arc::clone(&self.collaborators.notifier),
                &self.config,
                &stored,
                problems,
            );
        }
        let stored = match committed.downstream {
            Some(action) => self.run_downstream(stored, action).await?,
            None => stored,
        };
        Ok(outcome_of(&stored, false))
    }

    /// Call the CMS and record how it went. Operational failures leave the
    /// case accepted with `DownstreamStatus::Failed`.
    async fn run_downstream(
        &self,
        stored: CaseRecord,
        action: Downstream,
    ) -> Result<CaseRecord, AppError> {
        let cms = Arc::clone(&self.collaborators.cms);
        let case_id = stored.case_id;
        let result = match action {
            Downstream::Create => {
                let request = CreateCaseRequest {
                    case_id,
                    urn: stored.urn.clone(),
                    initiation_code: stored.details.initiation_code.clone(),
                    originating_organisation: stored.details.originating_organisation.clone(),
                    defendants: stored.defendants.clone(),
                };
                with_retry(&self.config.retry, "create_case", || {
                    let cms = Arc::clone(&cms);
                    let request = request.clone();
                    async move { cms.create_case(&request).await }
                })
                .await
            }
            Downstream::AddDefendants(defendants) => {
                with_retry(&self.config.retry, "add_defendants", || {
                    let cms = Arc::clone(&cms);
                    let defendants = defendants.clone();
                    async move { cms.add_defendants(case_id, &defendants).await }
                })
                .await
            }
        };

        let status = match result {
            Ok(()) => {
                tracing::info!(case_id = %case_id, "Case created downstream");
                DownstreamStatus::Created
            }
            Err(e) => {
                tracing::error!(error = %e, case_id = %case_id, "Downstream case call failed");
                DownstreamStatus::Failed { reason: e.message }
            }
        };
        let (stored, _) = self.update_case(case_id, |case| {
            case.downstream = status.clone();
            Ok(Some(()))
        })?;
        Ok(stored)
    }
}

// ── Pure helpers ────────────────────────────────────────────────────

fn details_of(prosecution: &Prosecution) -> CaseDetails {
    CaseDetails {
        initiation_code: prosecution.initiation_code.clone(),
        originating_organisation: prosecution.originating_organisation.clone(),
        case_markers: prosecution.case_markers.clone(),
        informant_email: prosecution.informant_email.clone(),
        summons: prosecution.summons,
    }
}

fn outcome_of(case: &CaseRecord, replayed: bool) -> CaseOutcome {
    CaseOutcome {
        case_id: case.case_id,
        status: case.status,
        version: case.version,
        problems: case.problems.clone(),
        warnings: case.warnings.clone(),
        replayed,
    }
}

fn accepted_status(case: &CaseRecord) -> CaseStatus {
    if case.warnings.is_empty() {
        CaseStatus::Accepted
    } else {
        CaseStatus::AcceptedWithWarnings
    }
}

/// Record the transition's events against the submission id.
fn commit(case: &mut CaseRecord, submission_id: Uuid, transition: Transition) -> Committed {
    let events = envelopes(transition.outcomes, submission_id, Utc::now());
    case.processed_submissions
        .insert(submission_id, events.clone());
    Committed {
        events,
        downstream: transition.downstream,
        failed: transition.failed,
    }
}

/// Replace the case's findings with a fresh report and advance its status.
fn apply_report(case: &mut CaseRecord, report: ValidationReport) -> Transition {
    case.problems = report.problems;
    case.warnings = report.warnings;

    if !case.problems.is_empty() {
        case.status = CaseStatus::PartiallyRejected;
        let mut outcomes = Vec::new();
        let case_problems: Vec<Problem> = case
            .problems
            .iter()
            .filter(|p| p.scope.is_case())
            .cloned()
            .collect();
        if !case_problems.is_empty() {
            outcomes.push(Outcome::CaseValidationFailed {
                case_id: case.case_id,
                urn: case.urn.clone(),
                problems: case_problems,
            });
        }
        for defendant in &case.defendants {
            let problems: Vec<Problem> = case
                .problems
                .iter()
                .filter(|p| p.scope.defendant_id() == Some(defendant.id))
                .cloned()
                .collect();
            if !problems.is_empty() {
                outcomes.push(Outcome::DefendantValidationFailed {
                    case_id: case.case_id,
                    defendant_id: defendant.id,
                    problems,
                });
            }
        }
        return Transition {
            outcomes,
            downstream: None,
            failed: Some(case.problems.clone()),
        };
    }

    if case.details.summons {
        for defendant in std::mem::take(&mut case.defendants) {
            match case
                .parked_defendants
                .iter_mut()
                .find(|p| p.id == defendant.id)
            {
                Some(slot) => *slot = defendant,
                None => case.parked_defendants.push(defendant),
            }
        }
        case.status = CaseStatus::ParkedForApproval;
        return Transition {
            outcomes: vec![Outcome::DefendantsParked {
                case_id: case.case_id,
                urn: case.urn.clone(),
                defendant_ids: case.parked_defendants.iter().map(|d| d.id).collect(),
            }],
            ..Default::default()
        };
    }

    case.status = accepted_status(case);
    let defendant_ids: Vec<Uuid> = case.defendants.iter().map(|d| d.id).collect();
    let outcome = if case.warnings.is_empty() {
        Outcome::ProsecutionReceived {
            case_id: case.case_id,
            urn: case.urn.clone(),
            defendant_ids,
        }
    } else {
        Outcome::ProsecutionReceivedWithWarnings {
            case_id: case.case_id,
            urn: case.urn.clone(),
            defendant_ids,
            warnings: case.warnings.clone(),
        }
    };
    let downstream = if case.downstream == DownstreamStatus::Created {
        None
    } else {
        case.downstream = DownstreamStatus::Pending;
        Some(Downstream::Create)
    };
    Transition {
        outcomes: vec![outcome],
        downstream,
        failed: None,
    }
}

/// Remove the named parked defendants. An empty list takes all of them.
fn take_parked(case: &mut CaseRecord, ids: &[Uuid]) -> Result<Vec<Defendant>, AppError> {
    if case.parked_defendants.is_empty() {
        return Err(AppError::conflict(format!(
            "Case {} has no defendants awaiting approval",
            case.case_id
        )));
    }
    if let Some(missing) = ids.iter().find(|id| !case.is_parked(**id)) {
        return Err(AppError::not_found(format!(
            "Defendant {} is not awaiting approval on case {}",
            missing, case.case_id
        )));
    }
    let (taken, kept): (Vec<Defendant>, Vec<Defendant>) = std::mem::take(&mut case.parked_defendants)
        .into_iter()
        .partition(|d| ids.is_empty() || ids.contains(&d.id));
    case.parked_defendants = kept;
    Ok(taken)
}

fn correct_case(case: &mut CaseRecord, correction: &CaseCorrection) {
    if let Some(code) = &correction.initiation_code {
        case.details.initiation_code = canonical_code(code);
    }
    if let Some(organisation) = &correction.originating_organisation {
        case.details.originating_organisation = canonical_code(organisation);
    }
    if let Some(markers) = &correction.case_markers {
        case.details.case_markers = markers
            .iter()
            .map(|m| shared_types::CaseMarker {
                code: canonical_code(&m.code),
                expiry_date: m.expiry_date,
            })
            .collect();
    }
}

fn correct_defendant(
    case: &mut CaseRecord,
    defendant_id: Uuid,
    correction: &DefendantCorrection,
) -> Result<(), AppError> {
    let case_id = case.case_id;
    let defendant = case.defendant_mut(defendant_id).ok_or_else(|| {
        AppError::not_found(format!(
            "Defendant {} not found on case {}",
            defendant_id, case_id
        ))
    })?;

    if let Some(reference) = &correction.prosecutor_reference {
        let reference = reference.trim();
        defendant.prosecutor_reference = (!reference.is_empty()).then(|| reference.to_string());
    }
    if correction.date_of_birth.is_some() || correction.nationality.is_some() {
        let DefendantDetails::Person(person) = &mut defendant.details else {
            return Err(AppError::structural(format!(
                "Defendant {} is an organisation and has no personal details",
                defendant_id
            )));
        };
        if let Some(dob) = correction.date_of_birth {
            person.date_of_birth = Some(dob);
        }
        if let Some(nationality) = &correction.nationality {
            person.nationality = Some(canonical_code(nationality));
        }
    }
    if let Some(status) = &correction.bail_status {
        defendant.bail_status = Some(canonical_code(status));
    }
    if let Some(conditions) = &correction.bail_conditions {
        defendant.bail_conditions = conditions
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    for fix in &correction.offences {
        let offence = defendant.offence_mut(fix.sequence).ok_or_else(|| {
            AppError::not_found(format!(
                "Offence {} not found on defendant {}",
                fix.sequence, defendant_id
            ))
        })?;
        if let Some(code) = &fix.offence_code {
            offence.code = canonical_code(code);
        }
        if let Some(date) = fix.committed_date {
            offence.committed_date = date;
        }
        if let Some(date) = fix.charge_date {
            offence.charge_date = Some(date);
        }
        if let Some(level) = &fix.alcohol_level {
            let mut level = level.clone();
            level.method = canonical_code(&level.method);
            offence.alcohol_level = Some(level);
        }
        if let Some(facts) = &fix.statement_of_facts {
            offence.statement_of_facts = Some(facts.trim().to_string());
        }
    }
    Ok(())
}
