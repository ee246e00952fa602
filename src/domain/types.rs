use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumIter;
use thiserror::Error;

// ============================================================================
// Domain Errors
// ============================================================================

/// Invariant violations detected before anything reaches the store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("invalid period {year}-{month:02}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("{utility} requires unit {expected}, got {actual}")]
    UnitMismatch {
        utility: UtilityType,
        expected: MeasurementUnit,
        actual: MeasurementUnit,
    },

    #[error("value must not be negative, got {0}")]
    NegativeValue(f64),

    #[error("device category {0} is not available for new devices")]
    CategoryDisabled(DeviceCategory),

    #[error("unknown report kind '{0}'; expected 'monthly' or 'annual'")]
    InvalidReportKind(String),

    #[error("invalid {kind}: '{value}'")]
    Unparsable { kind: &'static str, value: String },
}

// ============================================================================
// Utility Types
// ============================================================================

/// The three metered utilities a household pays for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum UtilityType {
    Electricity,
    Water,
    Gas,
}

impl UtilityType {
    /// The only unit a device or supplier service of this type may use
    pub fn expected_unit(&self) -> MeasurementUnit {
        match self {
            Self::Electricity => MeasurementUnit::KilowattHour,
            Self::Water | Self::Gas => MeasurementUnit::CubicMeter,
        }
    }

    /// Reject a unit that does not belong to this utility
    pub fn check_unit(&self, unit: MeasurementUnit) -> Result<(), DomainError> {
        let expected = self.expected_unit();
        if unit != expected {
            return Err(DomainError::UnitMismatch {
                utility: *self,
                expected,
                actual: unit,
            });
        }
        Ok(())
    }
}

impl fmt::Display for UtilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Electricity => "electricity",
            Self::Water => "water",
            Self::Gas => "gas",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UtilityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "electricity" | "power" => Ok(Self::Electricity),
            "water" => Ok(Self::Water),
            "gas" => Ok(Self::Gas),
            _ => Err(DomainError::Unparsable {
                kind: "utility type",
                value: s.to_string(),
            }),
        }
    }
}

/// Role of a metered device
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    /// Draws from the grid / mains
    Consumer,
    /// Produces (e.g. solar panels); only offsets electricity
    Generator,
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Consumer => "consumer",
            Self::Generator => "generator",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DeviceCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consumer" => Ok(Self::Consumer),
            "generator" => Ok(Self::Generator),
            _ => Err(DomainError::Unparsable {
                kind: "device category",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementUnit {
    #[serde(rename = "m3")]
    CubicMeter,
    #[serde(rename = "kWh")]
    KilowattHour,
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CubicMeter => "m3",
            Self::KilowattHour => "kWh",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MeasurementUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m3" | "m³" => Ok(Self::CubicMeter),
            "kwh" => Ok(Self::KilowattHour),
            _ => Err(DomainError::Unparsable {
                kind: "measurement unit",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Billing Period
// ============================================================================

/// A calendar month. Consumption records and budget limits are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodParts", into = "PeriodParts")]
pub struct Period {
    first_day: NaiveDate,
}

#[derive(Serialize, Deserialize)]
struct PeriodParts {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first_day| Self { first_day })
            .ok_or(DomainError::InvalidPeriod { year, month })
    }

    /// The month a timestamp falls in
    pub fn containing(ts: DateTime<Utc>) -> Self {
        Self {
            first_day: ts.date_naive().with_day(1).unwrap_or(ts.date_naive()),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// Timestamp stored for entries of this period: day 1 at 12:00 UTC
    pub fn anchor(&self) -> DateTime<Utc> {
        (self.first_day.and_time(NaiveTime::MIN) + chrono::Duration::hours(12)).and_utc()
    }

    /// All twelve months of a year, January first
    pub fn months_of(year: i32) -> Result<Vec<Self>, DomainError> {
        (1..=12).map(|month| Self::new(year, month)).collect()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts.year() == self.year() && ts.month() == self.month()
    }
}

impl TryFrom<PeriodParts> for Period {
    type Error = DomainError;
    fn try_from(p: PeriodParts) -> Result<Self, Self::Error> {
        Self::new(p.year, p.month)
    }
}

impl From<Period> for PeriodParts {
    fn from(p: Period) -> Self {
        Self {
            year: p.year(),
            month: p.month(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// Round to cents, the precision every cost and overage is reported in
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
