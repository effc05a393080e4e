//! Flow range buckets and the valve stages aggregated from them

use serde::{Deserialize, Serialize};

/// Half-open flow interval `[low, high)` in m³/h.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowRange {
    pub low: f64,
    pub high: f64,
}

impl FlowRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// `low <= flow < high`
    pub fn contains(&self, flow: f64) -> bool {
        self.low <= flow && flow < self.high
    }

    /// Whether every flow in `other` is also in `self`
    pub fn covers(&self, other: &Self) -> bool {
        self.low <= other.low && other.high <= self.high
    }
}

impl std::fmt::Display for FlowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.low, self.high)
    }
}

/// Duration-weighted aggregate of every operating point in one flow range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Dense ordinal in declaration order, empty buckets skipped
    pub stage: usize,
    /// Bucket this stage was built from; stable across reruns unlike `stage`
    pub flow_range: FlowRange,
    pub flow: f64,
    pub power: f64,
    pub pressure: f64,
    pub head: f64,
    /// Hydraulic efficiency in percent, full precision
    pub efficiency: f64,
    /// Operating points merged into this stage
    pub n_points: usize,
    /// Sum of point weights
    pub total_weight: u64,
}

impl Stage {
    /// Efficiency as emitted: nearest whole percent
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn efficiency_percent(&self) -> u32 {
        self.efficiency.max(0.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_range_is_half_open() {
        let range = FlowRange::new(19.0, 21.0);
        assert!(range.contains(19.0));
        assert!(range.contains(20.99));
        assert!(!range.contains(21.0));
        assert!(!range.contains(18.99));
    }

    #[test]
    fn test_flow_range_covers() {
        let wide = FlowRange::new(4.0, 8.0);
        assert!(wide.covers(&FlowRange::new(6.0, 8.0)));
        assert!(!wide.covers(&FlowRange::new(6.0, 9.0)));
    }

    #[test]
    fn test_efficiency_percent_rounds() {
        let stage = Stage {
            stage: 0,
            flow_range: FlowRange::new(19.0, 21.0),
            flow: 20.0,
            power: 4.0,
            pressure: 7.0,
            head: 71.4,
            efficiency: 48.6,
            n_points: 1,
            total_weight: 10,
        };
        assert_eq!(stage.efficiency_percent(), 49);
    }
}
