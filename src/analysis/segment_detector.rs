//! Stable Segment Detection
//!
//! Splits a filtered sample sequence into maximal runs where flow stays
//! within `flow_tolerance` of a reference flow. The reference is the flow of
//! the first sample of the run and is re-based at every break, whether or
//! not the finished run was long enough to keep.
//!
//! Runs shorter than `min_duration` samples are discarded.

use crate::config::DetectionConfig;
use crate::types::{Sample, Segment};

/// Tolerance-band segment detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDetector {
    flow_tolerance: f64,
    min_duration: usize,
}

impl Default for SegmentDetector {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for SegmentDetector {
    fn from(config: &DetectionConfig) -> Self {
        Self::new(config.flow_tolerance, config.min_duration)
    }
}

impl SegmentDetector {
    /// `min_duration` of 0 is treated as 1; config validation rejects it earlier.
    pub fn new(flow_tolerance: f64, min_duration: usize) -> Self {
        Self {
            flow_tolerance,
            min_duration: min_duration.max(1),
        }
    }

    pub fn flow_tolerance(&self) -> f64 {
        self.flow_tolerance
    }

    pub fn min_duration(&self) -> usize {
        self.min_duration
    }

    /// Detect stable segments
    ///
    /// # Returns
    /// Non-overlapping segments in increasing order, each at least
    /// `min_duration` samples long. Fewer samples than `min_duration`
    /// yields an empty list.
    pub fn detect(&self, samples: &[Sample]) -> Vec<Segment> {
        self.detect_flows(&samples.iter().map(|s| s.flow).collect::<Vec<_>>())
    }

    /// Same as `detect` over a bare flow series.
    pub fn detect_flows(&self, flows: &[f64]) -> Vec<Segment> {
        let n = flows.len();
        if n < self.min_duration {
            return Vec::new();
        }

        let mut segments = Vec::new();
        let mut start = 0;
        let mut reference = flows[0];

        for (i, &flow) in flows.iter().enumerate() {
            if (flow - reference).abs() > self.flow_tolerance {
                if i - start >= self.min_duration {
                    segments.push(Segment {
                        start,
                        end: i - 1,
                        reference_flow: reference,
                    });
                }
                start = i;
                reference = flow;
            }
        }

        // Trailing run
        if n - start >= self.min_duration {
            segments.push(Segment {
                start,
                end: n - 1,
                reference_flow: reference,
            });
        }

        segments
    }
}
