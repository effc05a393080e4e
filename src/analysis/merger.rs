//! Multi-Source Merger
//!
//! Combines operating points extracted independently from several files.
//!
//! - `tag_source` flattens per-file results into one collection, stamping
//!   each point with its provenance.
//! - `merge_by_flow` joins points of the same physical setpoint recorded in
//!   separate runs: points whose flow rounds to the same key are averaged
//!   (unweighted) and their sample counts summed.

use crate::config::MergeConfig;
use crate::physics_engine::Hydraulics;
use crate::types::OperatingPoint;
use std::collections::BTreeMap;

/// Flatten `(source, points)` pairs into one list, preserving input order.
pub fn tag_source<I, S>(per_source: I) -> Vec<OperatingPoint>
where
    I: IntoIterator<Item = (S, Vec<OperatingPoint>)>,
    S: AsRef<str>,
{
    per_source
        .into_iter()
        .flat_map(|(source, points)| {
            let source = source.as_ref().to_string();
            points
                .into_iter()
                .map(move |p| p.with_source(source.clone()))
        })
        .collect()
}

/// Join-key merger for points of one setpoint
#[derive(Debug, Clone, Copy)]
pub struct SetpointMerger {
    flow_granularity: f64,
    hydraulics: Hydraulics,
}

impl Default for SetpointMerger {
    fn default() -> Self {
        Self::new(&MergeConfig::default(), Hydraulics::default())
    }
}

impl SetpointMerger {
    pub fn new(config: &MergeConfig, hydraulics: Hydraulics) -> Self {
        Self {
            flow_granularity: config.flow_granularity,
            hydraulics,
        }
    }

    /// Join key: flow rounded to the nearest multiple of the granularity.
    #[allow(clippy::cast_possible_truncation)]
    pub fn join_key(&self, flow: f64) -> i64 {
        (flow / self.flow_granularity).round() as i64
    }

    /// Merge points sharing a join key.
    ///
    /// Flow, power and pressure are plain means across the group (each
    /// source run counts once), head is recomputed from the mean pressure,
    /// weights are summed and per-segment spreads are dropped. Groups come
    /// out in ascending key order, labelled `source`.
    pub fn merge_by_flow(&self, points: &[OperatingPoint], source: &str) -> Vec<OperatingPoint> {
        let mut groups: BTreeMap<i64, Vec<&OperatingPoint>> = BTreeMap::new();
        for point in points {
            groups.entry(self.join_key(point.flow)).or_default().push(point);
        }

        groups
            .into_values()
            .map(|group| self.merge_group(&group, source))
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn merge_group(&self, group: &[&OperatingPoint], source: &str) -> OperatingPoint {
        let n = group.len() as f64;
        let mean = |f: fn(&OperatingPoint) -> f64| group.iter().map(|p| f(p)).sum::<f64>() / n;
        let pressure = mean(|p| p.pressure);

        OperatingPoint {
            flow: mean(|p| p.flow),
            power: mean(|p| p.power),
            pressure,
            head: self.hydraulics.head_m(pressure),
            weight: group.iter().map(|p| p.weight).sum(),
            std_flow: None,
            std_power: None,
            target_pressure: group.iter().find_map(|p| p.target_pressure),
            source: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(flow: f64, power: f64, pressure: f64, weight: u64) -> OperatingPoint {
        OperatingPoint {
            flow,
            power,
            pressure,
            head: pressure * 10.197,
            weight,
            std_flow: Some(0.05),
            std_power: Some(0.01),
            target_pressure: Some(7.5),
            source: "run".to_string(),
        }
    }

    #[test]
    fn test_tag_source_flattens_in_order() {
        let tagged = tag_source(vec![
            ("a.csv", vec![point(1.0, 1.0, 7.0, 10)]),
            ("b.csv", vec![point(2.0, 1.0, 7.0, 10), point(3.0, 1.0, 7.0, 10)]),
        ]);
        let sources: Vec<_> = tagged.iter().map(|p| p.source.as_str()).collect();
        assert_eq!(sources, vec!["a.csv", "b.csv", "b.csv"]);
    }

    #[test]
    fn test_merge_same_key_averages_and_sums() {
        let points = vec![
            point(19.8, 3.0, 7.4, 40),
            point(20.3, 3.4, 7.6, 25),
            point(12.1, 2.0, 7.5, 15),
        ];
        let merged = SetpointMerger::default().merge_by_flow(&points, "7.5 bar Test");

        assert_eq!(merged.len(), 2);
        // Ascending key order: 12 then 20
        assert!((merged[0].flow - 12.1).abs() < 1e-12);
        assert_eq!(merged[0].weight, 15);

        let m = &merged[1];
        assert!((m.flow - 20.05).abs() < 1e-9);
        assert!((m.power - 3.2).abs() < 1e-9);
        assert!((m.pressure - 7.5).abs() < 1e-9);
        assert!((m.head - 7.5 * 10.197).abs() < 1e-9);
        assert_eq!(m.weight, 65);
        assert!(m.std_flow.is_none());
        assert_eq!(m.target_pressure, Some(7.5));
        assert_eq!(m.source, "7.5 bar Test");
    }

    #[test]
    fn test_join_key_granularity() {
        let coarse = SetpointMerger::new(&MergeConfig { flow_granularity: 5.0 }, Hydraulics::default());
        assert_eq!(coarse.join_key(12.4), 2);
        assert_eq!(coarse.join_key(12.6), 3);
        assert_eq!(SetpointMerger::default().join_key(19.5), 20);
    }

    #[test]
    fn test_merge_empty() {
        assert!(SetpointMerger::default().merge_by_flow(&[], "x").is_empty());
    }
}
