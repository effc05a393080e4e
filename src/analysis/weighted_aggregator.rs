//! Weighted Stage Aggregation
//!
//! Collapses each non-empty bucket into one `Stage`. Means are weighted by
//! point weight (samples observed), so a long stable run counts more than a
//! brief one. Efficiency is derived from the full-precision stage means.

use super::stage_bucketer::{Bucket, BucketAssignment};
use crate::physics_engine::Hydraulics;
use crate::types::{OperatingPoint, Stage};

/// Weighted mean of `values` with `weights`, as `Σ x·(w/W)`.
///
/// Returns 0.0 when the total weight is zero. Normalizing each weight first
/// means a single entry comes back bit-for-bit unchanged.
#[allow(clippy::cast_precision_loss)]
pub fn weighted_mean<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, u64)> + Clone,
{
    let total: u64 = pairs.clone().into_iter().map(|(_, w)| w).sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    pairs
        .into_iter()
        .map(|(x, w)| x * (w as f64 / total))
        .sum()
}

/// Bucket-to-stage reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAggregator {
    hydraulics: Hydraulics,
}

impl WeightedAggregator {
    pub fn new(hydraulics: Hydraulics) -> Self {
        Self { hydraulics }
    }

    /// One stage per non-empty bucket, indexed densely in bucket order.
    pub fn aggregate(&self, assignment: &BucketAssignment) -> Vec<Stage> {
        assignment
            .non_empty()
            .enumerate()
            .map(|(index, bucket)| self.aggregate_bucket(index, bucket))
            .collect()
    }

    fn aggregate_bucket(&self, index: usize, bucket: &Bucket) -> Stage {
        let points = &bucket.points;
        let mean = |f: fn(&OperatingPoint) -> f64| {
            weighted_mean(points.iter().map(move |p| (f(p), p.weight)))
        };

        let flow = mean(|p| p.flow);
        let power = mean(|p| p.power);
        let head = mean(|p| p.head);

        Stage {
            stage: index,
            flow_range: bucket.range,
            flow,
            power,
            pressure: mean(|p| p.pressure),
            head,
            efficiency: self.hydraulics.efficiency_percent(flow, head, power),
            n_points: points.len(),
            total_weight: points.iter().map(|p| p.weight).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlowRange;

    fn point(flow: f64, power: f64, weight: u64) -> OperatingPoint {
        OperatingPoint {
            flow,
            power,
            pressure: 7.0,
            head: 7.0 * 10.197,
            weight,
            std_flow: None,
            std_power: None,
            target_pressure: None,
            source: "t".to_string(),
        }
    }

    fn bucket(low: f64, high: f64, points: Vec<OperatingPoint>) -> Bucket {
        Bucket {
            range: FlowRange::new(low, high),
            points,
        }
    }

    #[test]
    fn test_weighted_flow() {
        let assignment = BucketAssignment {
            buckets: vec![bucket(19.0, 21.0, vec![point(19.5, 3.0, 10), point(20.5, 3.2, 30)])],
            unmatched: 0,
        };
        let stages = WeightedAggregator::default().aggregate(&assignment);
        assert_eq!(stages.len(), 1);
        assert!((stages[0].flow - 20.25).abs() < 1e-12);
        assert!((stages[0].power - 3.15).abs() < 1e-9);
        assert_eq!(stages[0].n_points, 2);
        assert_eq!(stages[0].total_weight, 40);
    }

    #[test]
    fn test_single_point_is_exact() {
        let p = point(20.123_456_789, 3.987_654_321, 17);
        let assignment = BucketAssignment {
            buckets: vec![bucket(19.0, 21.0, vec![p.clone()])],
            unmatched: 0,
        };
        let stage = &WeightedAggregator::default().aggregate(&assignment)[0];
        assert_eq!(stage.flow, p.flow);
        assert_eq!(stage.power, p.power);
        assert_eq!(stage.pressure, p.pressure);
        assert_eq!(stage.head, p.head);
    }

    #[test]
    fn test_dense_indices_skip_empty_buckets() {
        let assignment = BucketAssignment {
            buckets: vec![
                bucket(0.0, 1.0, vec![point(0.0, 0.5, 5)]),
                bucket(4.0, 7.0, vec![]),
                bucket(19.0, 21.0, vec![point(20.0, 3.0, 15)]),
            ],
            unmatched: 0,
        };
        let stages = WeightedAggregator::default().aggregate(&assignment);
        let indices: Vec<_> = stages.iter().map(|s| s.stage).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(stages[1].flow_range, FlowRange::new(19.0, 21.0));
    }

    #[test]
    fn test_zero_weight_and_zero_power() {
        assert_eq!(weighted_mean(vec![(5.0, 0), (7.0, 0)]), 0.0);
        assert_eq!(weighted_mean(Vec::<(f64, u64)>::new()), 0.0);

        let assignment = BucketAssignment {
            buckets: vec![bucket(0.0, 1.0, vec![point(0.0, 0.0, 5)])],
            unmatched: 0,
        };
        let stage = &WeightedAggregator::default().aggregate(&assignment)[0];
        assert_eq!(stage.efficiency, 0.0);
        assert_eq!(stage.efficiency_percent(), 0);
    }

    #[test]
    fn test_efficiency_from_full_precision_means() {
        let assignment = BucketAssignment {
            buckets: vec![bucket(19.0, 21.0, vec![point(20.0, 4.0, 10)])],
            unmatched: 0,
        };
        let stage = &WeightedAggregator::default().aggregate(&assignment)[0];
        // ρg(Q/3600)H/1000 = 1000*9.81*(20/3600)*71.379/1000 ≈ 3.890 kW
        let expected = 1000.0 * 9.81 * (20.0 / 3600.0) * (7.0 * 10.197) / 1000.0 / 4.0 * 100.0;
        assert!((stage.efficiency - expected).abs() < 1e-9);
        assert_eq!(stage.efficiency_percent(), 97);
    }
}
