use shared_types::{is_valid_initiation_code, ProblemCode, Prosecution};

use super::{Rule, RuleEnv, RuleResult};

pub const RULES: &[Rule<Prosecution>] = &[
    Rule {
        name: "initiation_code",
        check: initiation_code,
    },
    Rule {
        name: "originating_organisation",
        check: originating_organisation,
    },
    Rule {
        name: "case_markers",
        check: case_markers,
    },
];

fn initiation_code(p: &Prosecution, env: &RuleEnv<'_>) -> RuleResult {
    if is_valid_initiation_code(&p.initiation_code) {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::InitiationCodeInvalid)
        .with_value("initiationCode", p.initiation_code.as_str())])
}

fn originating_organisation(p: &Prosecution, env: &RuleEnv<'_>) -> RuleResult {
    if env
        .ctx
        .reference
        .is_organisation_unit(&p.originating_organisation)?
    {
        return Ok(vec![]);
    }
    Ok(vec![env
        .problem(ProblemCode::OriginatingOrganisationInvalid)
        .with_value("originatingOrganisation", p.originating_organisation.as_str())])
}

/// Unknown markers are invalid; known markers past their expiry are expired.
fn case_markers(p: &Prosecution, env: &RuleEnv<'_>) -> RuleResult {
    let mut findings = Vec::new();
    for marker in &p.case_markers {
        if !env.ctx.reference.is_case_marker(&marker.code)? {
            findings.push(
                env.problem(ProblemCode::CaseMarkerInvalid)
                    .with_value("caseMarker", marker.code.as_str()),
            );
            continue;
        }
        if let Some(expiry) = marker.expiry_date {
            if expiry < env.ctx.today {
                findings.push(
                    env.problem(ProblemCode::CaseMarkerExpired)
                        .with_value("caseMarker", marker.code.as_str())
                        .with_value("expiryDate", expiry.to_string()),
                );
            }
        }
    }
    Ok(findings)
}
