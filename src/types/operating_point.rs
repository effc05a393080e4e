//! Stable segments and the operating points summarizing them

use serde::{Deserialize, Serialize};

/// Inclusive index range `[start, end]` over a filtered sample sequence
/// where flow stayed within tolerance of `reference_flow`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    /// Flow of the sample at `start`, the band centre for the whole run
    pub reference_flow: f64,
}

impl Segment {
    /// Number of samples covered (always >= 1)
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a segment covers at least its start sample
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether two segments share any sample index
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Steady-state summary of one stable segment or a merged group of points.
///
/// Values are kept at full precision in memory. Rounding is applied by the
/// report emitter only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    /// Mean flow (m³/h)
    pub flow: f64,
    /// Mean electrical power (kW)
    pub power: f64,
    /// Mean pressure (bar)
    pub pressure: f64,
    /// Pressure expressed as metres of water column
    pub head: f64,
    /// Samples observed: segment duration, or `n_samples` for binned/merged points
    pub weight: u64,
    /// Population standard deviation of flow inside the segment
    pub std_flow: Option<f64>,
    /// Population standard deviation of power inside the segment
    pub std_power: Option<f64>,
    /// Pressure setpoint of an inverter control test
    pub target_pressure: Option<f64>,
    /// Provenance label (file name or test label)
    pub source: String,
}

impl OperatingPoint {
    /// Copy of this point with a different provenance label
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_len_and_overlap() {
        let a = Segment { start: 0, end: 0, reference_flow: 10.0 };
        let b = Segment { start: 0, end: 14, reference_flow: 10.0 };
        let c = Segment { start: 15, end: 29, reference_flow: 50.0 };

        assert_eq!(a.len(), 1);
        assert!(!a.is_empty());
        assert_eq!(b.len(), 15);
        assert!(a.overlaps(&b));
        assert!(!b.overlaps(&c));
    }
}
