//! Segment Summarizer
//!
//! Reduces a stable segment to an `OperatingPoint`: mean flow, power and
//! pressure, derived head, and the population standard deviation of flow and
//! power as stability indicators. Nothing is rounded here.

use crate::physics_engine::Hydraulics;
use crate::types::{OperatingPoint, Sample, Segment};
use statrs::statistics::Statistics;

/// Segment-to-operating-point reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentSummarizer {
    hydraulics: Hydraulics,
}

impl SegmentSummarizer {
    pub fn new(hydraulics: Hydraulics) -> Self {
        Self { hydraulics }
    }

    /// Summarize `samples[segment.start..=segment.end]`.
    ///
    /// Returns `None` if the segment does not fit inside `samples`.
    pub fn summarize(
        &self,
        samples: &[Sample],
        segment: &Segment,
        source: &str,
    ) -> Option<OperatingPoint> {
        let slice = samples.get(segment.start..=segment.end)?;
        let mut point = self.summarize_slice(slice)?;
        point.source = source.to_string();
        Some(point)
    }

    /// Summarize every segment of one file, in segment order.
    pub fn summarize_all(
        &self,
        samples: &[Sample],
        segments: &[Segment],
        source: &str,
    ) -> Vec<OperatingPoint> {
        segments
            .iter()
            .filter_map(|segment| self.summarize(samples, segment, source))
            .collect()
    }

    /// Summarize an arbitrary non-empty run of samples.
    pub fn summarize_slice(&self, slice: &[Sample]) -> Option<OperatingPoint> {
        if slice.is_empty() {
            return None;
        }

        let flows = slice.iter().map(|s| s.flow);
        let powers = slice.iter().map(|s| s.power);
        let pressures = slice.iter().map(|s| s.pressure);

        let pressure = pressures.mean();

        Some(OperatingPoint {
            flow: flows.clone().mean(),
            power: powers.clone().mean(),
            pressure,
            head: self.hydraulics.head_m(pressure),
            weight: slice.len() as u64,
            std_flow: Some(flows.population_std_dev()),
            std_power: Some(powers.population_std_dev()),
            target_pressure: None,
            source: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_means_and_head() {
        let samples: Vec<_> = (0..10)
            .map(|i| Sample::new(i, 20.0 + if i % 2 == 0 { 0.1 } else { -0.1 }, 7.0, 3.0))
            .collect();
        let segment = Segment { start: 0, end: 9, reference_flow: 20.1 };
        let point = SegmentSummarizer::default()
            .summarize(&samples, &segment, "a.csv")
            .unwrap();

        assert!(approx(point.flow, 20.0));
        assert!(approx(point.power, 3.0));
        assert!(approx(point.pressure, 7.0));
        assert!(approx(point.head, 71.379));
        assert_eq!(point.weight, 10);
        assert_eq!(point.source, "a.csv");
    }

    #[test]
    fn test_population_std_divides_by_n() {
        // flows 1, 3 => mean 2, population variance 1
        let samples = vec![Sample::new(0, 1.0, 7.0, 2.0), Sample::new(1, 3.0, 7.0, 4.0)];
        let point = SegmentSummarizer::default().summarize_slice(&samples).unwrap();
        assert!(approx(point.std_flow.unwrap(), 1.0));
        assert!(approx(point.std_power.unwrap(), 1.0));
    }

    #[test]
    fn test_single_sample_has_zero_spread() {
        let samples = vec![Sample::new(0, 12.3, 6.5, 2.1)];
        let point = SegmentSummarizer::default().summarize_slice(&samples).unwrap();
        assert!(approx(point.std_flow.unwrap(), 0.0));
        assert_eq!(point.weight, 1);
    }

    #[test]
    fn test_empty_and_out_of_range() {
        let summarizer = SegmentSummarizer::default();
        assert!(summarizer.summarize_slice(&[]).is_none());
        let samples = vec![Sample::new(0, 1.0, 7.0, 2.0)];
        let segment = Segment { start: 0, end: 5, reference_flow: 1.0 };
        assert!(summarizer.summarize(&samples, &segment, "x").is_none());
    }

    #[test]
    fn test_duration_is_inclusive_length() {
        let samples: Vec<_> = (0..30).map(|i| Sample::new(i, 5.0, 7.0, 1.0)).collect();
        let segment = Segment { start: 15, end: 29, reference_flow: 5.0 };
        let point = SegmentSummarizer::default()
            .summarize(&samples, &segment, "x")
            .unwrap();
        assert_eq!(point.weight, 15);
    }
}
