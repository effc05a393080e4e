//! Stage Bucketing
//!
//! Assigns operating points to the declared flow ranges. Ranges may overlap;
//! the first range in declaration order containing a point's flow claims it.
//! Points outside every range are dropped and counted.

use crate::config::{ConfigError, StageConfig};
use crate::types::{FlowRange, OperatingPoint};

/// Ordered flow-range table, validated at construction
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRangeTable {
    ranges: Vec<FlowRange>,
}

impl FlowRangeTable {
    /// Validate and build a table.
    ///
    /// Every range needs finite bounds with `low < high`, lows must not
    /// decrease in declaration order, and the table must not be empty.
    pub fn new(ranges: Vec<FlowRange>) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        if ranges.is_empty() {
            errors.push("flow range table is empty".to_string());
        }
        for (i, r) in ranges.iter().enumerate() {
            if !r.low.is_finite() || !r.high.is_finite() {
                errors.push(format!("flow range {i} {r}: bounds must be finite"));
            } else if r.low >= r.high {
                errors.push(format!("flow range {i} {r}: low must be < high"));
            }
        }
        for (i, pair) in ranges.windows(2).enumerate() {
            if pair[1].low < pair[0].low {
                errors.push(format!(
                    "flow range {} {} starts below previous range {}",
                    i + 1,
                    pair[1],
                    pair[0]
                ));
            }
        }

        if errors.is_empty() {
            Ok(Self { ranges })
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn ranges(&self) -> &[FlowRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Index of the first range containing `flow`, scanning in declaration order.
    pub fn locate(&self, flow: f64) -> Option<usize> {
        self.ranges.iter().position(|r| r.contains(flow))
    }
}

impl TryFrom<&StageConfig> for FlowRangeTable {
    type Error = ConfigError;

    fn try_from(config: &StageConfig) -> Result<Self, Self::Error> {
        Self::new(config.flow_ranges.clone())
    }
}

/// Points claimed by one flow range
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub range: FlowRange,
    pub points: Vec<OperatingPoint>,
}

/// Every bucket in declaration order (empty ones included) plus the
/// number of points no range claimed.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketAssignment {
    pub buckets: Vec<Bucket>,
    pub unmatched: usize,
}

impl BucketAssignment {
    /// Buckets that received at least one point
    pub fn non_empty(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().filter(|b| !b.points.is_empty())
    }
}

/// First-match-wins bucketer
#[derive(Debug, Clone)]
pub struct StageBucketer {
    table: FlowRangeTable,
}

impl StageBucketer {
    pub fn new(table: FlowRangeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &FlowRangeTable {
        &self.table
    }

    /// Assign each point to the first range containing its flow.
    pub fn assign<I>(&self, points: I) -> BucketAssignment
    where
        I: IntoIterator<Item = OperatingPoint>,
    {
        let mut buckets: Vec<Bucket> = self
            .table
            .ranges()
            .iter()
            .map(|&range| Bucket {
                range,
                points: Vec::new(),
            })
            .collect();
        let mut unmatched = 0;

        for point in points {
            match self.table.locate(point.flow) {
                Some(i) => buckets[i].points.push(point),
                None => {
                    tracing::debug!(flow = point.flow, source = %point.source, "Point outside all flow ranges");
                    unmatched += 1;
                }
            }
        }

        BucketAssignment { buckets, unmatched }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(flow: f64) -> OperatingPoint {
        OperatingPoint {
            flow,
            power: 1.0,
            pressure: 7.0,
            head: 71.4,
            weight: 10,
            std_flow: None,
            std_power: None,
            target_pressure: None,
            source: "t".to_string(),
        }
    }

    fn table(ranges: &[(f64, f64)]) -> FlowRangeTable {
        FlowRangeTable::new(ranges.iter().map(|&(l, h)| FlowRange::new(l, h)).collect()).unwrap()
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let bucketer = StageBucketer::new(table(&[(4.0, 7.0), (6.0, 8.0)]));
        let assignment = bucketer.assign(vec![point(6.5), point(7.5)]);
        assert_eq!(assignment.buckets[0].points.len(), 1);
        assert!((assignment.buckets[0].points[0].flow - 6.5).abs() < 1e-12);
        assert_eq!(assignment.buckets[1].points.len(), 1);
        assert!((assignment.buckets[1].points[0].flow - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_unmatched_points_are_counted() {
        let bucketer = StageBucketer::new(table(&[(0.0, 1.0), (19.0, 21.0)]));
        let assignment = bucketer.assign(vec![point(0.0), point(9.0), point(21.0), point(20.0)]);
        assert_eq!(assignment.unmatched, 2);
        assert_eq!(assignment.non_empty().count(), 2);
    }

    #[test]
    fn test_empty_buckets_are_kept_in_order() {
        let bucketer = StageBucketer::new(table(&[(0.0, 1.0), (4.0, 7.0), (19.0, 21.0)]));
        let assignment = bucketer.assign(vec![point(20.0)]);
        assert_eq!(assignment.buckets.len(), 3);
        assert!(assignment.buckets[0].points.is_empty());
        assert_eq!(assignment.non_empty().count(), 1);
    }

    #[test]
    fn test_invalid_tables_rejected() {
        assert!(FlowRangeTable::new(vec![]).is_err());
        assert!(FlowRangeTable::new(vec![FlowRange::new(5.0, 5.0)]).is_err());
        assert!(FlowRangeTable::new(vec![FlowRange::new(0.0, f64::INFINITY)]).is_err());
        let err = FlowRangeTable::new(vec![FlowRange::new(10.0, 12.0), FlowRange::new(4.0, 7.0)])
            .unwrap_err();
        assert!(err.to_string().contains("starts below previous range"));
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = FlowRangeTable::try_from(&StageConfig::default()).unwrap();
        assert_eq!(table.len(), 10);
        assert_eq!(table.locate(6.5), Some(1));
        assert_eq!(table.locate(8.5), None);
    }
}
