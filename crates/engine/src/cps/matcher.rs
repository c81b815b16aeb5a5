//! Defendant matching for court forms.
//!
//! Each form-defendant tries its keys in priority order:
//! 1. ASN, exact after removing whitespace
//! 2. CPS defendant id, exact
//! 3. Forename + surname + date of birth, case-insensitive
//!
//! A key that hits more than one case defendant is ambiguous and the next
//! strategy is tried. A case defendant claimed by an earlier form-defendant
//! is not offered again.

use shared_types::{
    FormDefendant, MatchKey, MatchResult, MatchedDefendant, RosterDefendant, UnmatchedDefendant,
};
use std::collections::HashSet;
use uuid::Uuid;

use crate::normalizer::{canonical_asn, canonical_name};

pub fn match_defendants(form: &[FormDefendant], roster: &[RosterDefendant]) -> MatchResult {
    let mut claimed: HashSet<Uuid> = HashSet::new();
    let mut result = MatchResult::default();

    for (form_index, defendant) in form.iter().enumerate() {
        let found = defendant.keys().into_iter().find_map(|key| {
            let mut hits = roster
                .iter()
                .filter(|r| !claimed.contains(&r.defendant_id) && key_matches(&key, r));
            match (hits.next(), hits.next()) {
                (Some(hit), None) => Some((hit.defendant_id, key)),
                (Some(_), Some(_)) => {
                    tracing::debug!(form_index, strategy = key.evidence_key(), "Ambiguous match, falling through");
                    None
                }
                _ => None,
            }
        });

        match found {
            Some((defendant_id, key)) => {
                claimed.insert(defendant_id);
                result.matched.push(MatchedDefendant {
                    form_index,
                    defendant_id,
                    key,
                });
            }
            None => result.unmatched.push(UnmatchedDefendant {
                form_index,
                key: defendant.reported_key(),
            }),
        }
    }
    result
}

fn key_matches(key: &MatchKey, candidate: &RosterDefendant) -> bool {
    match key {
        MatchKey::Asn(asn) => candidate
            .asn
            .as_deref()
            .is_some_and(|c| canonical_asn(c) == canonical_asn(asn)),
        MatchKey::ExternalId(id) => candidate
            .cps_defendant_id
            .as_deref()
            .is_some_and(|c| c.trim() == id.trim()),
        MatchKey::NameDob {
            forename,
            surname,
            date_of_birth,
        } => {
            candidate.date_of_birth == Some(*date_of_birth)
                && candidate
                    .forename
                    .as_deref()
                    .is_some_and(|f| canonical_name(f) == canonical_name(forename))
                && candidate
                    .surname
                    .as_deref()
                    .is_some_and(|s| canonical_name(s) == canonical_name(surname))
        }
    }
}
