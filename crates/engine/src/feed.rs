//! Line-delimited JSON command feed.
//!
//! Each line is `{"type": "<command>", "body": {...}}`. Commands map one to
//! one onto [`IntakeEngine`] operations; the result of each is returned as
//! JSON so a caller can echo it.

use serde::Deserialize;
use serde_json::Value;
use shared_types::{
    AppError, CorrectionRequest, CpsFormSubmission, SubmitIdpcRequest, SubmitMaterialRequest,
    SubmitMaterialV2Request, SummonsDecision,
};
use uuid::Uuid;

use crate::engine::IntakeEngine;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum FeedCommand {
    /// Raw channel payload, normalized by the engine.
    Prosecution(Value),
    Correction(CorrectionRequest),
    ApproveSummons(SummonsDecision),
    RejectSummons(SummonsDecision),
    EjectCase { case_id: Uuid },
    BeginSession { case_id: Uuid },
    EndSession { case_id: Uuid },
    RetryDownstream { case_id: Uuid },
    Material(SubmitMaterialRequest),
    MaterialV2(SubmitMaterialV2Request),
    Idpc(SubmitIdpcRequest),
    CpsForm(CpsFormSubmission),
    RetryAttachments,
}

impl FeedCommand {
    pub fn parse(line: &str) -> Result<Self, AppError> {
        serde_json::from_str(line)
            .map_err(|e| AppError::structural(format!("Invalid feed command: {}", e)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeedCommand::Prosecution(_) => "prosecution",
            FeedCommand::Correction(_) => "correction",
            FeedCommand::ApproveSummons(_) => "approve_summons",
            FeedCommand::RejectSummons(_) => "reject_summons",
            FeedCommand::EjectCase { .. } => "eject_case",
            FeedCommand::BeginSession { .. } => "begin_session",
            FeedCommand::EndSession { .. } => "end_session",
            FeedCommand::RetryDownstream { .. } => "retry_downstream",
            FeedCommand::Material(_) => "material",
            FeedCommand::MaterialV2(_) => "material_v2",
            FeedCommand::Idpc(_) => "idpc",
            FeedCommand::CpsForm(_) => "cps_form",
            FeedCommand::RetryAttachments => "retry_attachments",
        }
    }
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::internal(format!("Result not serializable: {}", e)))
}

/// Run one command against the engine.
pub async fn dispatch(engine: &IntakeEngine, command: FeedCommand) -> Result<Value, AppError> {
    match command {
        FeedCommand::Prosecution(payload) => to_json(engine.submit_prosecution_json(payload).await?),
        FeedCommand::Correction(request) => to_json(engine.submit_correction(request).await?),
        FeedCommand::ApproveSummons(decision) => to_json(engine.approve_summons(decision).await?),
        FeedCommand::RejectSummons(decision) => to_json(engine.reject_summons(decision).await?),
        FeedCommand::EjectCase { case_id } => to_json(engine.eject_case(case_id)?),
        FeedCommand::BeginSession { case_id } => to_json(engine.begin_session(case_id)?),
        FeedCommand::EndSession { case_id } => to_json(engine.end_session(case_id).await?),
        FeedCommand::RetryDownstream { case_id } => {
            to_json(engine.retry_downstream(case_id).await?)
        }
        FeedCommand::Material(request) => to_json(engine.submit_material(request).await?),
        FeedCommand::MaterialV2(request) => to_json(engine.submit_material_v2(request).await?),
        FeedCommand::Idpc(request) => to_json(engine.submit_idpc_material(request).await?),
        FeedCommand::CpsForm(submission) => to_json(engine.submit_cps_form(submission).await?),
        FeedCommand::RetryAttachments => {
            let attached = engine.retry_failed_attachments().await?;
            Ok(serde_json::json!({ "attached": attached }))
        }
    }
}
