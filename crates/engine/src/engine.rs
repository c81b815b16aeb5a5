//! Public entry point wiring the workflow, material manager and CPS service
//! onto shared stores and one event sink.

use shared_types::{
    AppError, CaseOutcome, CaseRecord, CorrectionRequest, CpsFormSubmission, CpsSubmissionRecord,
    EngineConfig, MaterialOutcome, MaterialRecord, SubmitIdpcRequest, SubmitMaterialRequest,
    SubmitMaterialV2Request, SubmitProsecutionRequest, SummonsDecision,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::collaborators::Collaborators;
use crate::cps::CpsService;
use crate::material::{MaterialManager, TimerFired};
use crate::publisher::{EventSink, Publisher};
use crate::store::{CaseStore, CpsStore, MaterialStore};
use crate::workflow::CaseWorkflow;

#[derive(Clone)]
pub struct IntakeEngine {
    config: Arc<EngineConfig>,
    cases: CaseStore,
    materials: MaterialStore,
    cps_submissions: CpsStore,
    workflow: CaseWorkflow,
    material_manager: MaterialManager,
    cps: CpsService,
}

impl IntakeEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators, sink: Arc<dyn EventSink>) -> Self {
        let config = Arc::new(config);
        let publisher = Publisher::new(sink);
        let cases = CaseStore::new();
        let materials = MaterialStore::new();
        let cps_submissions = CpsStore::new();

        let workflow = CaseWorkflow::new(
            Arc::clone(&config),
            cases.clone(),
            collaborators.clone(),
            publisher.clone(),
        );
        let material_manager = MaterialManager::new(
            Arc::clone(&config),
            materials.clone(),
            cases.clone(),
            collaborators.clone(),
            publisher.clone(),
        );
        let cps = CpsService::new(
            Arc::clone(&config),
            cases.clone(),
            cps_submissions.clone(),
            collaborators,
            publisher,
        );

        Self {
            config,
            cases,
            materials,
            cps_submissions,
            workflow,
            material_manager,
            cps,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Cases ───────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(case_id = %raw.case_id, submission_id = %raw.submission_id))]
    pub async fn submit_prosecution(
        &self,
        raw: SubmitProsecutionRequest,
    ) -> Result<CaseOutcome, AppError> {
        let outcome = self.workflow.submit_prosecution(raw).await?;
        self.reconcile_if_accepted(&outcome).await;
        Ok(outcome)
    }

    /// Parse a raw channel payload and submit it.
    pub async fn submit_prosecution_json(
        &self,
        payload: serde_json::Value,
    ) -> Result<CaseOutcome, AppError> {
        let raw = SubmitProsecutionRequest::from_json(payload)?;
        self.submit_prosecution(raw).await
    }

    #[tracing::instrument(skip_all, fields(case_id = %request.case_id, submission_id = %request.submission_id))]
    pub async fn submit_correction(
        &self,
        request: CorrectionRequest,
    ) -> Result<CaseOutcome, AppError> {
        let outcome = self.workflow.submit_correction(request).await?;
        self.reconcile_if_accepted(&outcome).await;
        Ok(outcome)
    }

    #[tracing::instrument(skip_all, fields(case_id = %decision.case_id))]
    pub async fn approve_summons(&self, decision: SummonsDecision) -> Result<CaseOutcome, AppError> {
        let outcome = self.workflow.approve_summons(decision).await?;
        self.reconcile_if_accepted(&outcome).await;
        Ok(outcome)
    }

    #[tracing::instrument(skip_all, fields(case_id = %decision.case_id))]
    pub async fn reject_summons(&self, decision: SummonsDecision) -> Result<CaseOutcome, AppError> {
        self.workflow.reject_summons(decision).await
    }

    /// Eject a case and reject every material still waiting on it.
    #[tracing::instrument(skip(self))]
    pub fn eject_case(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        let outcome = self.workflow.eject_case(case_id)?;
        let rejected = self.material_manager.reject_pending_for_case(case_id)?;
        if !rejected.is_empty() {
            tracing::info!(case_id = %case_id, rejected = rejected.len(), "Pending materials rejected on ejection");
        }
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    pub fn begin_session(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        self.workflow.begin_session(case_id)
    }

    /// End a session and give pending materials another chance to attach.
    #[tracing::instrument(skip(self))]
    pub async fn end_session(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        let outcome = self.workflow.end_session(case_id)?;
        self.reconcile_if_accepted(&outcome).await;
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    pub async fn retry_downstream(&self, case_id: Uuid) -> Result<CaseOutcome, AppError> {
        self.workflow.retry_downstream(case_id).await
    }

    pub fn get_case(&self, case_id: Uuid) -> Result<Option<CaseRecord>, AppError> {
        self.cases.get(case_id)
    }

    // ── Materials ───────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(material_id = %request.material_id))]
    pub async fn submit_material(
        &self,
        request: SubmitMaterialRequest,
    ) -> Result<MaterialOutcome, AppError> {
        self.material_manager.submit_material(request).await
    }

    #[tracing::instrument(skip_all, fields(material_id = %request.material_id))]
    pub async fn submit_material_v2(
        &self,
        request: SubmitMaterialV2Request,
    ) -> Result<MaterialOutcome, AppError> {
        self.material_manager.submit_material_v2(request).await
    }

    #[tracing::instrument(skip_all, fields(material_id = %request.material_id))]
    pub async fn submit_idpc_material(
        &self,
        request: SubmitIdpcRequest,
    ) -> Result<MaterialOutcome, AppError> {
        self.material_manager.submit_idpc_material(request).await
    }

    /// Re-resolve pending materials for a case now.
    pub async fn reconcile_case(&self, case_id: Uuid) -> Result<Vec<MaterialOutcome>, AppError> {
        self.material_manager.reconcile_case(case_id).await
    }

    /// Feed a fired expiry timer into the material lifecycle.
    pub fn on_timer_fired(&self, fired: TimerFired) -> Result<Option<MaterialOutcome>, AppError> {
        self.material_manager.on_timer_fired(fired)
    }

    /// Re-send court documents whose downstream attachment failed.
    pub async fn retry_failed_attachments(&self) -> Result<usize, AppError> {
        self.material_manager.retry_failed_attachments().await
    }

    pub fn get_material(&self, material_id: Uuid) -> Result<Option<MaterialRecord>, AppError> {
        self.materials.get(material_id)
    }

    // ── CPS forms ───────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(submission_id = %submission.submission_id, form_type = submission.form_type.as_str()))]
    pub async fn submit_cps_form(
        &self,
        submission: CpsFormSubmission,
    ) -> Result<CpsSubmissionRecord, AppError> {
        self.cps.submit_cps_form(submission).await
    }

    pub fn get_cps_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<CpsSubmissionRecord>, AppError> {
        self.cps_submissions.get(submission_id)
    }

    // ── Timers ──────────────────────────────────────────────────────

    /// Drain fired timers into the engine until the channel closes.
    pub fn spawn_timer_pump(&self, mut fired: mpsc::UnboundedReceiver<TimerFired>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(timer) = fired.recv().await {
                if let Err(e) = engine.on_timer_fired(timer) {
                    tracing::error!(error = %e, material_id = %timer.key, "Timer handling failed");
                }
            }
            tracing::info!("Timer pump stopped");
        })
    }

    async fn reconcile_if_accepted(&self, outcome: &CaseOutcome) {
        if !outcome.status.is_accepted() {
            return;
        }
        if let Err(e) = self.material_manager.reconcile_case(outcome.case_id).await {
            tracing::error!(error = %e, case_id = %outcome.case_id, "Material reconciliation failed");
        }
    }
}
