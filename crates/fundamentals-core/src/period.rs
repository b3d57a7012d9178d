//! Fiscal period definitions and the period classifier.
//!
//! This module defines [`FiscalPeriod`] for the raw `fp` field of a filing,
//! [`Period`] for the canonical label a normalized fact is keyed by, and
//! [`classify`] which maps one [`RawObservation`] onto a [`Period`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FundamentalsError;
use crate::facts::RawObservation;

/// Shortest span, in days, accepted as a discrete quarter.
pub const QUARTER_MIN_DAYS: i64 = 80;

/// Longest span, in days, accepted as a discrete quarter.
pub const QUARTER_MAX_DAYS: i64 = 100;

/// Fiscal period reported alongside a fact (`fp` in SEC data).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FiscalPeriod {
    /// Full fiscal year.
    #[serde(rename = "FY")]
    FullYear,
    /// First quarter.
    Q1,
    /// Second quarter.
    Q2,
    /// Third quarter.
    Q3,
    /// Fourth quarter.
    Q4,
}

impl FiscalPeriod {
    /// Returns the quarter number (1-4), or `None` for a full year.
    #[must_use]
    pub const fn quarter(&self) -> Option<u8> {
        match self {
            Self::FullYear => None,
            Self::Q1 => Some(1),
            Self::Q2 => Some(2),
            Self::Q3 => Some(3),
            Self::Q4 => Some(4),
        }
    }
}

impl FromStr for FiscalPeriod {
    type Err = FundamentalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FY" => Ok(Self::FullYear),
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            other => Err(FundamentalsError::Parse(format!(
                "Unsupported fiscal period: {other}"
            ))),
        }
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quarter() {
            Some(q) => write!(f, "Q{q}"),
            None => f.write_str("FY"),
        }
    }
}

/// Canonical period label, independent of filing boundaries.
///
/// Serialized as `"FY-2024"` or `"Q1-2024"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    /// A whole fiscal year.
    FiscalYear(i32),
    /// A discrete fiscal quarter.
    Quarter {
        /// Quarter number, 1-4.
        quarter: u8,
        /// Fiscal year the quarter belongs to.
        year: i32,
    },
}

impl Period {
    /// Returns the fiscal year of this period.
    #[must_use]
    pub const fn fiscal_year(&self) -> i32 {
        match self {
            Self::FiscalYear(year) | Self::Quarter { year, .. } => *year,
        }
    }

    /// Returns true if this is a discrete quarter.
    #[must_use]
    pub const fn is_quarter(&self) -> bool {
        matches!(self, Self::Quarter { .. })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FiscalYear(year) => write!(f, "FY-{year}"),
            Self::Quarter { quarter, year } => write!(f, "Q{quarter}-{year}"),
        }
    }
}

impl FromStr for Period {
    type Err = FundamentalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FundamentalsError::Parse(format!("Invalid period label: {s}"));
        let (fp, fy) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = fy.parse().map_err(|_| invalid())?;

        match fp.parse::<FiscalPeriod>().map_err(|_| invalid())?.quarter() {
            Some(quarter) => Ok(Self::Quarter { quarter, year }),
            None => Ok(Self::FiscalYear(year)),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = FundamentalsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

/// Maps an observation's duration metadata to a canonical period.
///
/// Full-year facts are labelled by fiscal year regardless of duration. Other
/// facts must span between [`QUARTER_MIN_DAYS`] and [`QUARTER_MAX_DAYS`]
/// inclusive; year-to-date spans, instants and unrecognised fiscal periods
/// return `None` and are dropped by the caller.
#[must_use]
pub fn classify(observation: &RawObservation) -> Option<Period> {
    let fiscal_period = observation.fiscal_period?;
    let year = observation.fiscal_year?;

    let Some(quarter) = fiscal_period.quarter() else {
        return Some(Period::FiscalYear(year));
    };

    let days = observation.duration_days()?;
    (QUARTER_MIN_DAYS..=QUARTER_MAX_DAYS)
        .contains(&days)
        .then_some(Period::Quarter { quarter, year })
}
