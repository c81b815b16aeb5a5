//! Validation rule engine.
//!
//! Stateless. `evaluate` walks a normalized prosecution in a fixed order:
//! 1. Case rules
//! 2. For each defendant in submission order: defendant rules
//! 3. Then that defendant's offences in sequence order: offence rules
//!
//! Every finding is collected; nothing short-circuits. A rule that cannot
//! classify its input reports `UNCATEGORIZED` with the rule name and detail.
//! Only an unreachable reference-data service aborts the evaluation.

pub mod case_rules;
pub mod defendant_rules;
pub mod offence_rules;

use chrono::NaiveDate;
use shared_types::{
    AppError, Problem, ProblemCode, Prosecution, RuleConfig, Scope, ValidationReport,
};

use crate::reference::ReferenceData;

/// Everything a rule may consult besides the prosecution itself.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub today: NaiveDate,
    pub reference: &'a dyn ReferenceData,
    pub rules: &'a RuleConfig,
}

/// Why a rule produced no verdict.
#[derive(Debug)]
pub enum RuleError {
    /// The input could not be classified; reported as `UNCATEGORIZED`.
    Unclassified(String),
    /// A collaborator failed; aborts the evaluation.
    Unavailable(AppError),
}

impl From<AppError> for RuleError {
    fn from(err: AppError) -> Self {
        RuleError::Unavailable(err)
    }
}

pub type RuleResult = Result<Vec<Problem>, RuleError>;

/// What a rule sees besides its subject: the whole prosecution, the scope
/// its findings belong to and the evaluation context.
pub struct RuleEnv<'a> {
    pub prosecution: &'a Prosecution,
    pub scope: Scope,
    pub ctx: &'a ValidationContext<'a>,
}

impl RuleEnv<'_> {
    pub fn problem(&self, code: ProblemCode) -> Problem {
        Problem::new(code, self.scope)
    }
}

/// A named check over one subject (the case, a defendant or an offence).
pub struct Rule<S> {
    pub name: &'static str,
    pub check: fn(&S, &RuleEnv<'_>) -> RuleResult,
}

/// Run `rules` over `subject` and file the findings into `report`.
pub(crate) fn apply<S>(
    rules: &[Rule<S>],
    subject: &S,
    env: &RuleEnv<'_>,
    report: &mut ValidationReport,
) -> Result<(), AppError> {
    for rule in rules {
        match (rule.check)(subject, env) {
            Ok(findings) => report.extend(findings),
            Err(RuleError::Unclassified(detail)) => {
                tracing::warn!(rule = rule.name, detail = %detail, "Rule could not classify input");
                report.push(
                    env.problem(ProblemCode::Uncategorized)
                        .with_value("rule", rule.name)
                        .with_value("detail", detail),
                );
            }
            Err(RuleError::Unavailable(err)) => {
                tracing::error!(rule = rule.name, error = %err, "Reference data unavailable");
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Evaluate every rule against a prosecution.
pub fn evaluate(
    prosecution: &Prosecution,
    ctx: &ValidationContext<'_>,
) -> Result<ValidationReport, AppError> {
    let mut report = ValidationReport::default();

    let case_env = RuleEnv {
        prosecution,
        scope: Scope::Case,
        ctx,
    };
    apply(case_rules::RULES, prosecution, &case_env, &mut report)?;

    for defendant in &prosecution.defendants {
        let env = RuleEnv {
            prosecution,
            scope: Scope::Defendant {
                defendant_id: defendant.id,
            },
            ctx,
        };
        apply(defendant_rules::RULES, defendant, &env, &mut report)?;

        let mut offences: Vec<_> = defendant.offences.iter().collect();
        offences.sort_by_key(|o| o.sequence);
        for offence in offences {
            let env = RuleEnv {
                prosecution,
                scope: Scope::Offence {
                    defendant_id: defendant.id,
                    offence_sequence: offence.sequence,
                },
                ctx,
            };
            apply(offence_rules::RULES, offence, &env, &mut report)?;
        }
    }

    tracing::debug!(
        case_id = %prosecution.case_id,
        problems = report.problems.len(),
        warnings = report.warnings.len(),
        "Evaluation complete"
    );
    Ok(report)
}
