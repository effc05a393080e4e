//! Raw instrument readings and per-row parse outcomes

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One instrument reading from the test rig.
///
/// Row order in the source file is acquisition order; `index` is the
/// zero-based data row position (header excluded).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Data row position in the source file
    pub index: usize,
    /// Acquisition time, when a timestamp column is configured and parses
    pub timestamp: Option<NaiveDateTime>,
    /// Volumetric flow rate (m³/h)
    pub flow: f64,
    /// Discharge pressure (bar)
    pub pressure: f64,
    /// Electrical input power (kW)
    pub power: f64,
}

impl Sample {
    /// Build a sample without a timestamp.
    pub fn new(index: usize, flow: f64, pressure: f64, power: f64) -> Self {
        Self {
            index,
            timestamp: None,
            flow,
            pressure,
            power,
        }
    }
}

/// Why a data row was dropped by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The row has fewer columns than the configured offset
    MissingField { column: usize },
    /// The field is present but not a number
    InvalidNumber { column: usize },
    /// The field parsed to NaN or infinity
    NonFinite { column: usize },
    /// The CSV reader could not decode the row at all
    Malformed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { column } => write!(f, "missing column {column}"),
            Self::InvalidNumber { column } => write!(f, "non-numeric value in column {column}"),
            Self::NonFinite { column } => write!(f, "non-finite value in column {column}"),
            Self::Malformed => write!(f, "malformed row"),
        }
    }
}

/// Result of parsing one data row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Row parsed into a valid sample
    Sample(Sample),
    /// Row was dropped; `line` is the 1-based line number in the file
    Skipped { line: u64, reason: SkipReason },
}

impl RowOutcome {
    /// The parsed sample, if any
    pub fn sample(&self) -> Option<&Sample> {
        match self {
            Self::Sample(sample) => Some(sample),
            Self::Skipped { .. } => None,
        }
    }
}
