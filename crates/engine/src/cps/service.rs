use chrono::Utc;
use shared_types::{
    AppError, CaseRoster, CpsFormSubmission, CpsResolution, CpsSubmissionRecord, EngineConfig,
    MatchResult, Problem, ProblemCode, Scope, SubmissionStatus, UnmatchedDefendant,
};
use std::sync::Arc;
use validator::Validate;

use super::matcher::match_defendants;
use crate::collaborators::Collaborators;
use crate::normalizer::canonical_code;
use crate::publisher::{envelopes, Outcome, Publisher};
use crate::retry::with_retry;
use crate::store::{CaseStore, CpsStore};

/// Accepts court forms and resolves their defendants against a case.
///
/// A form is accepted only when every defendant on it matches. Any miss
/// rejects the whole submission with one `INVALID_DEFENDANTS_PROVIDED` per
/// unmatched defendant.
#[derive(Clone)]
pub struct CpsService {
    config: Arc<EngineConfig>,
    cases: CaseStore,
    submissions: CpsStore,
    collaborators: Collaborators,
    publisher: Publisher,
}

impl CpsService {
    pub fn new(
        config: Arc<EngineConfig>,
        cases: CaseStore,
        submissions: CpsStore,
        collaborators: Collaborators,
        publisher: Publisher,
    ) -> Self {
        Self {
            config,
            cases,
            submissions,
            collaborators,
            publisher,
        }
    }

    pub async fn submit_cps_form(
        &self,
        submission: CpsFormSubmission,
    ) -> Result<CpsSubmissionRecord, AppError> {
        submission.validate()?;
        if let Some(existing) = self.submissions.get(submission.submission_id)? {
            return Ok(self.replay(existing));
        }

        let received_at = Utc::now();
        let urn = canonical_code(&submission.urn);
        let form_type = submission.form_type;
        let mut outcomes = vec![Outcome::CpsFormReceived {
            form_type,
            urn: urn.clone(),
        }];

        let roster = self.roster(&urn).await?;
        let (case_id, resolution, matches, problems) = match roster {
            None => {
                tracing::info!(submission_id = %submission.submission_id, urn = %urn, "No case for form, left unresolved");
                (None, CpsResolution::Unresolved, MatchResult::default(), Vec::new())
            }
            Some(roster) => {
                let matches = match_defendants(&submission.defendants, &roster.defendants);
                if matches.is_complete() {
                    outcomes.push(Outcome::CpsFormSubmitted {
                        form_type,
                        case_id: roster.case_id,
                        matched: matches.matched.clone(),
                        form_data: submission.form_data.clone(),
                    });
                    outcomes.push(Outcome::CpsMaterialStatusUpdated {
                        case_id: Some(roster.case_id),
                        status: SubmissionStatus::Success,
                        errors: Vec::new(),
                    });
                    (Some(roster.case_id), CpsResolution::Submitted, matches, Vec::new())
                } else {
                    let problems: Vec<Problem> =
                        matches.unmatched.iter().map(unmatched_problem).collect();
                    tracing::info!(
                        submission_id = %submission.submission_id,
                        case_id = %roster.case_id,
                        unmatched = problems.len(),
                        "Form rejected, defendants not matched"
                    );
                    outcomes.push(Outcome::CpsMaterialStatusUpdated {
                        case_id: Some(roster.case_id),
                        status: SubmissionStatus::Rejected,
                        errors: problems.clone(),
                    });
                    (Some(roster.case_id), CpsResolution::Rejected, matches, problems)
                }
            }
        };

        let record = CpsSubmissionRecord {
            submission_id: submission.submission_id,
            form_type,
            urn,
            case_id,
            resolution,
            matches,
            problems,
            events: envelopes(outcomes, submission.submission_id, received_at),
            received_at,
        };
        if let Some(existing) = self.submissions.insert_new(record.clone())? {
            return Ok(self.replay(existing));
        }
        self.publisher.publish_all(&record.events);
        Ok(record)
    }

    /// Defendants of the case named by `urn`: the local aggregate first,
    /// then the downstream CMS.
    async fn roster(&self, urn: &str) -> Result<Option<CaseRoster>, AppError> {
        if let Some(case) = self.cases.find_by_urn(urn)? {
            return Ok(Some(case.roster()));
        }
        let cms = Arc::clone(&self.collaborators.cms);
        let urn = urn.to_string();
        with_retry(&self.config.retry, "find_case_by_urn", || {
            let cms = Arc::clone(&cms);
            let urn = urn.clone();
            async move { cms.find_case_by_urn(&urn).await }
        })
        .await
    }

    fn replay(&self, record: CpsSubmissionRecord) -> CpsSubmissionRecord {
        tracing::info!(submission_id = %record.submission_id, "Replaying form outcome");
        self.publisher.publish_all(&record.events);
        record
    }
}

fn unmatched_problem(unmatched: &UnmatchedDefendant) -> Problem {
    let problem = Problem::new(ProblemCode::InvalidDefendantsProvided, Scope::Case);
    match &unmatched.key {
        Some(key) => problem.with_value(key.evidence_key(), key.evidence_value()),
        None => problem.with_value("formDefendantIndex", unmatched.form_index.to_string()),
    }
}
