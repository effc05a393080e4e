//! Validity Filter
//!
//! Drops samples recorded while the rig was not pressurized. Pressure at or
//! below the floor means the pump was not primed, not a real low-flow
//! operating state. Runs before segmentation so fault periods never become
//! a segment's reference flow.

use crate::config::FilterConfig;
use crate::types::Sample;

/// Result of validity filtering
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Samples that passed, in original order
    pub samples: Vec<Sample>,
    /// Number of samples at or below the pressure floor
    pub rejected: usize,
}

/// Pressure-floor filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidityFilter {
    pressure_floor: f64,
}

impl Default for ValidityFilter {
    fn default() -> Self {
        Self::from(&FilterConfig::default())
    }
}

impl From<&FilterConfig> for ValidityFilter {
    fn from(config: &FilterConfig) -> Self {
        Self::new(config.pressure_floor)
    }
}

impl ValidityFilter {
    pub fn new(pressure_floor: f64) -> Self {
        Self { pressure_floor }
    }

    /// Whether a sample was taken with the rig pressurized.
    ///
    /// NaN pressure is never valid.
    pub fn is_valid(&self, sample: &Sample) -> bool {
        sample.pressure > self.pressure_floor
    }

    /// Keep valid samples, preserving order.
    pub fn filter(&self, samples: Vec<Sample>) -> FilterOutcome {
        let total = samples.len();
        let samples: Vec<Sample> = samples.into_iter().filter(|s| self.is_valid(s)).collect();
        let rejected = total - samples.len();

        if rejected > 0 {
            tracing::debug!(
                rejected,
                kept = samples.len(),
                floor = self.pressure_floor,
                "Dropped samples at or below pressure floor"
            );
        }

        FilterOutcome { samples, rejected }
    }
}
