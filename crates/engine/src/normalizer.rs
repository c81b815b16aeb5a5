//! Intake normalization: every channel's payload becomes one canonical
//! [`Prosecution`].
//!
//! Pure and deterministic. Defendant ids the channel does not supply are
//! derived with UUID v5 from the case id, prosecutor reference and position,
//! so normalizing the same payload twice yields identical output.

use shared_types::{
    AppError, CaseMarker, DedupPolicy, Defendant, DefendantDetails, DefendantInput, Offence,
    OrganisationDetails, PersonDetails, Prosecution, RuleConfig, SubmitProsecutionRequest,
};
use uuid::Uuid;
use validator::Validate;

/// What the normalizer needs to know beyond the payload itself.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// The case id is already known to the engine.
    pub is_resubmission: bool,
    pub dedup: &'a DedupPolicy,
    pub rules: &'a RuleConfig,
}

pub fn normalize(
    raw: SubmitProsecutionRequest,
    ctx: &NormalizeContext<'_>,
) -> Result<Prosecution, AppError> {
    raw.validate()?;

    let case_id = raw.case_id;
    let initiation_code = canonical_code(&raw.initiation_code);
    let summons = ctx.rules.is_summons(&initiation_code);

    let defendants = raw
        .defendants
        .into_iter()
        .enumerate()
        .map(|(position, input)| canonical_defendant(case_id, position, input))
        .collect::<Result<Vec<_>, _>>()?;

    let defendants = if ctx.dedup.applies(raw.channel, ctx.is_resubmission) {
        dedup_by_reference(defendants, ctx.dedup.include_organisations)
    } else {
        defendants
    };

    Ok(Prosecution {
        submission_id: raw.submission_id,
        case_id,
        urn: canonical_code(&raw.urn),
        channel: raw.channel,
        initiation_code,
        originating_organisation: canonical_code(&raw.originating_organisation),
        case_markers: raw
            .case_markers
            .into_iter()
            .map(|m| CaseMarker {
                code: canonical_code(&m.code),
                expiry_date: m.expiry_date,
            })
            .collect(),
        informant_email: raw.informant_email.map(|e| e.trim().to_string()),
        defendants,
        summons,
    })
}

/// Deterministic id for a defendant the channel did not identify.
pub fn derive_defendant_id(case_id: Uuid, reference: Option<&str>, position: usize) -> Uuid {
    let name = format!("{}:{}", reference.unwrap_or(""), position);
    Uuid::new_v5(&case_id, name.as_bytes())
}

/// Merge repeated prosecutor references into their first occurrence. The
/// later occurrence's offences are appended and renumbered.
pub fn dedup_by_reference(defendants: Vec<Defendant>, include_organisations: bool) -> Vec<Defendant> {
    let mut merged: Vec<Defendant> = Vec::with_capacity(defendants.len());
    for defendant in defendants {
        let eligible = include_organisations || !defendant.is_organisation();
        let existing = match (&defendant.prosecutor_reference, eligible) {
            (Some(reference), true) => merged.iter_mut().find(|d| {
                (include_organisations || !d.is_organisation())
                    && d.prosecutor_reference.as_deref() == Some(reference.as_str())
            }),
            _ => None,
        };
        match existing {
            Some(first) => {
                tracing::debug!(
                    reference = ?defendant.prosecutor_reference,
                    "Merging repeated defendant reference"
                );
                first.offences.extend(defendant.offences);
                renumber(&mut first.offences);
            }
            None => merged.push(defendant),
        }
    }
    merged
}

/// Trim and upper-case a reference code.
pub fn canonical_code(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Names compare case-insensitively with runs of whitespace collapsed.
pub fn canonical_name(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// ASNs are compared without internal whitespace.
pub fn canonical_asn(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn renumber(offences: &mut [Offence]) {
    for (index, offence) in offences.iter_mut().enumerate() {
        offence.sequence = index as u32 + 1;
    }
}

fn canonical_defendant(
    case_id: Uuid,
    position: usize,
    input: DefendantInput,
) -> Result<Defendant, AppError> {
    let prosecutor_reference = non_blank(input.prosecutor_reference);
    let id = input
        .id
        .unwrap_or_else(|| derive_defendant_id(case_id, prosecutor_reference.as_deref(), position));

    let details = match (input.person, input.organisation) {
        (Some(person), None) => DefendantDetails::Person(PersonDetails {
            forename: person.forename.trim().to_string(),
            surname: person.surname.trim().to_string(),
            date_of_birth: person.date_of_birth,
            nationality: non_blank(person.nationality).map(|n| canonical_code(&n)),
        }),
        (None, Some(org)) => DefendantDetails::Organisation(OrganisationDetails {
            name: org.name.trim().to_string(),
        }),
        _ => {
            return Err(AppError::structural(format!(
                "Defendant {} needs exactly one of person or organisation details",
                position
            )))
        }
    };

    let offences = input
        .offences
        .into_iter()
        .enumerate()
        .map(|(index, o)| Offence {
            sequence: index as u32 + 1,
            code: canonical_code(&o.offence_code),
            committed_date: o.committed_date,
            charge_date: o.charge_date,
            alcohol_level: o.alcohol_level.map(|mut level| {
                level.method = canonical_code(&level.method);
                level
            }),
            statement_of_facts: non_blank(o.statement_of_facts),
        })
        .collect();

    Ok(Defendant {
        id,
        prosecutor_reference,
        asn: non_blank(input.asn).map(|a| canonical_asn(&a)),
        cps_defendant_id: non_blank(input.cps_defendant_id),
        details,
        bail_status: non_blank(input.bail_status).map(|b| canonical_code(&b)),
        bail_conditions: input
            .bail_conditions
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        offences,
    })
}

/// Fold a re-submission's defendants into the ones a case already holds.
///
/// A defendant with the same id replaces the held one. When `dedup` is set,
/// a defendant whose prosecutor reference matches a held one replaces its
/// details but keeps the held id. Anything else is appended.
pub fn merge_into_case(
    held: &mut Vec<Defendant>,
    incoming: Vec<Defendant>,
    dedup: bool,
    include_organisations: bool,
) {
    for defendant in incoming {
        if let Some(slot) = held.iter_mut().find(|d| d.id == defendant.id) {
            *slot = defendant;
            continue;
        }
        let eligible = include_organisations || !defendant.is_organisation();
        let by_reference = match (&defendant.prosecutor_reference, dedup && eligible) {
            (Some(reference), true) => held
                .iter_mut()
                .find(|d| d.prosecutor_reference.as_deref() == Some(reference.as_str())),
            _ => None,
        };
        match by_reference {
            Some(slot) => {
                let id = slot.id;
                *slot = Defendant { id, ..defendant };
            }
            None => held.push(defendant),
        }
    }
}
