//! Raw company facts as delivered by the SEC `companyfacts` API.
//!
//! [`CompanyFacts`] mirrors the wire document (taxonomy → tag → unit → values)
//! closely enough to round-trip it to disk. [`RawObservation`] is the parsed,
//! typed view of a single reported value that the normalization pipeline works
//! on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::period::FiscalPeriod;

/// Date format used throughout SEC XBRL JSON.
pub const SEC_DATE_FORMAT: &str = "%Y-%m-%d";

/// Response from the SEC EDGAR Company Facts API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    /// CIK number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cik: Option<u64>,
    /// Entity name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    /// Facts organized by taxonomy and tag.
    #[serde(default)]
    pub facts: HashMap<String, HashMap<String, TagFacts>>,
}

/// Facts for a specific XBRL tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagFacts {
    /// Label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Units (USD, shares, etc.) containing the actual fact values.
    #[serde(default)]
    pub units: HashMap<String, Vec<FactValue>>,
}

/// A single fact value with its filing metadata, as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactValue {
    /// Start date of the period; absent for instant facts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// End date of the period.
    pub end: String,
    /// Value.
    pub val: f64,
    /// Accession number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accn: Option<String>,
    /// Fiscal year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<i32>,
    /// Fiscal period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp: Option<String>,
    /// Form type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    /// Filed date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filed: Option<String>,
    /// Frame (calendar-aligned period identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
}

impl FactValue {
    /// Parses the filed date, if present and well-formed.
    #[must_use]
    pub fn filed_date(&self) -> Option<NaiveDate> {
        self.filed
            .as_deref()
            .and_then(|filed| NaiveDate::parse_from_str(filed, SEC_DATE_FORMAT).ok())
    }
}

impl CompanyFacts {
    /// Returns the typed observations for one taxonomy/tag/unit combination.
    ///
    /// Records whose end or filed date is missing or malformed cannot be
    /// ordered or classified and are skipped.
    #[must_use]
    pub fn observations(&self, taxonomy: &str, tag: &str, unit: &str) -> Vec<RawObservation> {
        self.facts
            .get(taxonomy)
            .and_then(|tags| tags.get(tag))
            .and_then(|tag_facts| tag_facts.units.get(unit))
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| RawObservation::from_wire(value, unit))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the most recent filed date across every fact in the document.
    ///
    /// Returns `None` when no fact carries a parseable filed date.
    #[must_use]
    pub fn latest_filed(&self) -> Option<NaiveDate> {
        self.values().filter_map(FactValue::filed_date).max()
    }

    /// Returns the total number of fact values across all taxonomies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values().count()
    }

    /// Returns true if the document contains no fact values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().next().is_none()
    }

    fn values(&self) -> impl Iterator<Item = &FactValue> {
        self.facts
            .values()
            .flat_map(HashMap::values)
            .flat_map(|tag_facts| tag_facts.units.values())
            .flatten()
    }
}

/// One reported value for a concept tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Reported value.
    pub value: f64,
    /// Unit or currency code (e.g. `USD`).
    pub unit: String,
    /// Start of the reporting period; `None` for instant facts.
    pub period_start: Option<NaiveDate>,
    /// End of the reporting period.
    pub period_end: NaiveDate,
    /// Fiscal period; `None` if absent or not one of FY/Q1-Q4.
    pub fiscal_period: Option<FiscalPeriod>,
    /// Fiscal year.
    pub fiscal_year: Option<i32>,
    /// Filing form (e.g. `10-K`, `10-Q/A`).
    pub form: Option<String>,
    /// Date the filing was accepted.
    pub filed: NaiveDate,
}

impl RawObservation {
    /// Converts a wire value into a typed observation.
    ///
    /// Returns `None` if the end or filed date cannot be parsed. A malformed
    /// start date is treated as absent.
    #[must_use]
    pub fn from_wire(value: &FactValue, unit: &str) -> Option<Self> {
        let period_end = NaiveDate::parse_from_str(&value.end, SEC_DATE_FORMAT).ok()?;
        let filed = value.filed_date()?;
        let period_start = value
            .start
            .as_deref()
            .and_then(|start| NaiveDate::parse_from_str(start, SEC_DATE_FORMAT).ok());

        Some(Self {
            value: value.val,
            unit: unit.to_string(),
            period_start,
            period_end,
            fiscal_period: value.fp.as_deref().and_then(|fp| fp.parse().ok()),
            fiscal_year: value.fy,
            form: value.form.clone(),
            filed,
        })
    }

    /// Length of the reporting period in days, or `None` for instant facts.
    #[must_use]
    pub fn duration_days(&self) -> Option<i64> {
        self.period_start
            .map(|start| (self.period_end - start).num_days())
    }

    /// Returns the exact `(start, end)` key used to group overlapping filings.
    #[must_use]
    pub const fn period_key(&self) -> (Option<NaiveDate>, NaiveDate) {
        (self.period_start, self.period_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cik": 320193,
        "entityName": "Apple Inc.",
        "facts": {
            "dei": {
                "EntityCommonStockSharesOutstanding": {
                    "label": "Shares",
                    "units": {
                        "shares": [
                            {"end": "2024-10-18", "val": 15115823000, "fy": 2024, "fp": "FY", "form": "10-K", "filed": "2024-11-01"}
                        ]
                    }
                }
            },
            "us-gaap": {
                "NetCashProvidedByUsedInOperatingActivities": {
                    "label": "Operating cash flow",
                    "units": {
                        "USD": [
                            {"start": "2024-01-01", "end": "2024-03-31", "val": 100, "fy": 2024, "fp": "Q1", "form": "10-Q", "filed": "2024-05-01"},
                            {"start": "2024-01-01", "end": "2024-03-31", "val": 110, "fy": 2024, "fp": "Q1", "form": "10-Q/A", "filed": "2024-08-01", "accn": "0000320193-24-000081"},
                            {"start": "bad", "end": "2024-06-30", "val": 5, "fy": 2024, "fp": "H1", "form": "10-Q", "filed": "2024-08-01"},
                            {"end": "not-a-date", "val": 1, "filed": "2024-12-01"}
                        ]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_company_facts() {
        let facts: CompanyFacts = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(facts.cik, Some(320193));
        assert_eq!(facts.entity_name.as_deref(), Some("Apple Inc."));
        assert_eq!(facts.len(), 5);
        assert!(!facts.is_empty());
    }

    #[test]
    fn test_observations_skip_malformed_records() {
        let facts: CompanyFacts = serde_json::from_str(SAMPLE).unwrap();
        let obs =
            facts.observations("us-gaap", "NetCashProvidedByUsedInOperatingActivities", "USD");

        assert_eq!(obs.len(), 3);
        assert_eq!(obs[1].value, 110.0);
        assert_eq!(obs[1].form.as_deref(), Some("10-Q/A"));
        assert_eq!(obs[0].duration_days(), Some(90));
        // Malformed start is treated as an instant; unknown fp is dropped
        assert_eq!(obs[2].period_start, None);
        assert_eq!(obs[2].fiscal_period, None);

        assert!(facts.observations("us-gaap", "Missing", "USD").is_empty());
        assert!(
            facts
                .observations("us-gaap", "NetCashProvidedByUsedInOperatingActivities", "EUR")
                .is_empty()
        );
    }

    #[test]
    fn test_latest_filed_scans_every_taxonomy() {
        let facts: CompanyFacts = serde_json::from_str(SAMPLE).unwrap();
        // The dei fact and the malformed-end fact are both later than any usable us-gaap fact
        assert_eq!(
            facts.latest_filed(),
            NaiveDate::from_ymd_opt(2024, 12, 1)
        );
    }

    #[test]
    fn test_latest_filed_without_dates() {
        assert_eq!(CompanyFacts::default().latest_filed(), None);
        assert!(CompanyFacts::default().is_empty());
    }
}
