//! Authoritative fact selection.
//!
//! A single period is often reported several times: in the original 10-Q, again
//! as a comparative in later filings, and in amendments. The selector groups
//! observations by their exact period boundaries and picks one per group.

use chrono::NaiveDate;
use fundamentals_core::RawObservation;
use std::collections::BTreeMap;

/// Exact `(start, end)` boundaries of a reporting period.
pub type PeriodKey = (Option<NaiveDate>, NaiveDate);

/// Ranks filing forms; amendments outrank originals, unknown forms rank last.
#[must_use]
pub fn form_priority(form: Option<&str>) -> u8 {
    match form {
        Some("10-K/A") => 4,
        Some("10-Q/A") => 3,
        Some("10-K") => 2,
        Some("10-Q") => 1,
        _ => 0,
    }
}

/// Picks the observation that represents its period.
///
/// Observations are ordered by `(filed, form_priority)` descending with a
/// stable sort, so the most recently filed value wins and form priority only
/// breaks same-day ties. Observations equal on both keys keep their input
/// order and the earliest one is returned.
///
/// Returns `None` only for an empty slice.
#[must_use]
pub fn select_authoritative(observations: &[RawObservation]) -> Option<&RawObservation> {
    let mut ranked: Vec<&RawObservation> = observations.iter().collect();
    ranked.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
    ranked.first().copied()
}

fn sort_key(observation: &RawObservation) -> (NaiveDate, u8) {
    (observation.filed, form_priority(observation.form.as_deref()))
}

/// Groups observations by their exact period boundaries.
///
/// Boundaries are not canonicalized: two filings that disagree on a period's
/// start or end by a day land in different groups.
#[must_use]
pub fn group_by_period(observations: Vec<RawObservation>) -> BTreeMap<PeriodKey, Vec<RawObservation>> {
    let mut groups: BTreeMap<PeriodKey, Vec<RawObservation>> = BTreeMap::new();
    for observation in observations {
        groups
            .entry(observation.period_key())
            .or_default()
            .push(observation);
    }
    groups
}
