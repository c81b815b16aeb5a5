use shared_types::{Offence, ProblemCode};

use super::{Rule, RuleEnv, RuleError, RuleResult};

pub const RULES: &[Rule<Offence>] = &[
    Rule {
        name: "committed_date",
        check: committed_date,
    },
    Rule {
        name: "charge_date",
        check: charge_date,
    },
    Rule {
        name: "offence_code",
        check: offence_code,
    },
    Rule {
        name: "alcohol_level_method",
        check: alcohol_level_method,
    },
    Rule {
        name: "statement_of_facts",
        check: statement_of_facts,
    },
];

fn committed_date(o: &Offence, env: &RuleEnv<'_>) -> RuleResult {
    if o.committed_date <= env.ctx.today {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::OffenceCommittedDateInFuture)
        .with_value("committedDate", o.committed_date.to_string())])
}

fn charge_date(o: &Offence, env: &RuleEnv<'_>) -> RuleResult {
    match o.charge_date {
        Some(charged) if charged < o.committed_date => Ok(vec![env
            .problem(ProblemCode::OffenceChargeDateBeforeCommittedDate)
            .with_value("chargeDate", charged.to_string())
            .with_value("committedDate", o.committed_date.to_string())]),
        _ => Ok(vec![]),
    }
}

/// The code must exist and be in force on the committed date.
fn offence_code(o: &Offence, env: &RuleEnv<'_>) -> RuleResult {
    let Some(reference) = env.ctx.reference.offence(&o.code)? else {
        return Ok(vec![env
            .problem(ProblemCode::OffenceCodeInvalid)
            .with_value("offenceCode", o.code.as_str())]);
    };
    if let (Some(from), Some(to)) = (reference.valid_from, reference.valid_to) {
        if from > to {
            return Err(RuleError::Unclassified(format!(
                "offence {} validity window {}..{} is inverted",
                o.code, from, to
            )));
        }
    }
    let started = reference.valid_from.map_or(true, |from| from <= o.committed_date);
    let not_ended = reference.valid_to.map_or(true, |to| o.committed_date <= to);
    if started && not_ended {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::OffenceCodeInvalid)
        .with_value("offenceCode", o.code.as_str())
        .with_value("committedDate", o.committed_date.to_string())])
}

fn alcohol_level_method(o: &Offence, env: &RuleEnv<'_>) -> RuleResult {
    let Some(level) = &o.alcohol_level else {
        return Ok(vec![]);
    };
    if env.ctx.reference.is_alcohol_level_method(&level.method)? {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::AlcoholDrugLevelMethodInvalid)
        .with_value("alcoholLevelMethod", level.method.as_str())])
}

fn statement_of_facts(o: &Offence, env: &RuleEnv<'_>) -> RuleResult {
    let p = env.prosecution;
    if o.statement_of_facts.is_some()
        || !env
            .ctx
            .rules
            .requires_statement_of_facts(&p.initiation_code, p.channel)
    {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::StatementOfFactsRequired)
        .with_value("initiationCode", p.initiation_code.as_str())])
}
