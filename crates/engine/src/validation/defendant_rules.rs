//! Defendant-scoped rules. Person rules are skipped for organisations.

use shared_types::{Defendant, ProblemCode};

use super::{Rule, RuleEnv, RuleError, RuleResult};

pub const RULES: &[Rule<Defendant>] = &[
    Rule {
        name: "defendant_reference",
        check: defendant_reference,
    },
    Rule {
        name: "date_of_birth",
        check: date_of_birth,
    },
    Rule {
        name: "nationality",
        check: nationality,
    },
    Rule {
        name: "bail",
        check: bail,
    },
    Rule {
        name: "adult_at_charge",
        check: adult_at_charge,
    },
];

fn defendant_reference(d: &Defendant, env: &RuleEnv<'_>) -> RuleResult {
    if !env
        .ctx
        .rules
        .requires_defendant_reference(env.prosecution.channel)
        || d.prosecutor_reference.is_some()
    {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::DefendantIdRequired)
        .with_value("channel", env.prosecution.channel.as_str())])
}

fn date_of_birth(d: &Defendant, env: &RuleEnv<'_>) -> RuleResult {
    match d.person().and_then(|p| p.date_of_birth) {
        Some(dob) if dob > env.ctx.today => Ok(vec![env
            .problem(ProblemCode::DefendantDobInFuture)
            .with_value("dateOfBirth", dob.to_string())]),
        _ => Ok(vec![]),
    }
}

fn nationality(d: &Defendant, env: &RuleEnv<'_>) -> RuleResult {
    let Some(code) = d.person().and_then(|p| p.nationality.as_deref()) else {
        return Ok(vec![]);
    };
    if env.ctx.reference.is_nationality(code)? {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::DefendantNationalityInvalid)
        .with_value("nationality", code)])
}

/// Unknown status is invalid; a status that demands conditions needs some.
fn bail(d: &Defendant, env: &RuleEnv<'_>) -> RuleResult {
    let Some(status) = d.bail_status.as_deref() else {
        return Ok(vec![]);
    };
    match env.ctx.reference.bail_status(status)? {
        None => Ok(vec![env
            .problem(ProblemCode::DefendantBailStatusInvalid)
            .with_value("bailStatus", status)]),
        Some(reference) if reference.conditions_required && d.bail_conditions.is_empty() => {
            Ok(vec![env
                .problem(ProblemCode::DefendantBailConditionsRequired)
                .with_value("bailStatus", status)])
        }
        Some(_) => Ok(vec![]),
    }
}

/// Age at the earliest charge date (today when uncharged). Never blocks.
fn adult_at_charge(d: &Defendant, env: &RuleEnv<'_>) -> RuleResult {
    let Some(dob) = d.person().and_then(|p| p.date_of_birth) else {
        return Ok(vec![]);
    };
    let at = d.earliest_charge_date().unwrap_or(env.ctx.today);
    if dob > at {
        // Reported by date_of_birth when in the future; otherwise the dates disagree.
        if dob > env.ctx.today {
            return Ok(vec![]);
        }
        return Err(RuleError::Unclassified(format!(
            "date of birth {} is after charge date {}",
            dob, at
        )));
    }
    let age = at
        .years_since(dob)
        .ok_or_else(|| RuleError::Unclassified(format!("cannot compute age from {}", dob)))?;
    if age >= env.ctx.rules.adult_age {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::DefendantUnder18)
        .with_value("dateOfBirth", dob.to_string())
        .with_value("ageAtCharge", age.to_string())])
}
