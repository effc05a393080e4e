//! Setpoint Flow Binning
//!
//! Extraction strategy for inverter pressure-control tests. While the
//! inverter holds a pressure setpoint the valve is stepped through flows, so
//! instead of looking for stable runs we keep every sample inside the
//! setpoint's pressure window and group by fixed-width flow bins.
//!
//! A bin needs `min_samples` samples to produce a point.

use crate::config::SetpointConfig;
use crate::physics_engine::Hydraulics;
use crate::types::{OperatingPoint, Sample};
use std::collections::BTreeMap;

/// Pressure-window flow binner for one setpoint
#[derive(Debug, Clone)]
pub struct SetpointBinner {
    target_pressure: f64,
    pressure_min: f64,
    pressure_max: f64,
    bin_width: f64,
    min_samples: usize,
    hydraulics: Hydraulics,
}

impl SetpointBinner {
    pub fn new(setpoint: &SetpointConfig, hydraulics: Hydraulics) -> Self {
        Self {
            target_pressure: setpoint.target_pressure,
            pressure_min: setpoint.pressure_min,
            pressure_max: setpoint.pressure_max,
            bin_width: setpoint.bin_width,
            min_samples: setpoint.min_samples.max(1),
            hydraulics,
        }
    }

    /// Whether a sample lies in the setpoint's inclusive pressure window.
    pub fn in_window(&self, sample: &Sample) -> bool {
        (self.pressure_min..=self.pressure_max).contains(&sample.pressure)
    }

    /// Key of the flow bin containing `flow`, truncated toward zero so
    /// readings in `(-bin_width, bin_width)` all share bin 0.
    #[allow(clippy::cast_possible_truncation)]
    pub fn bin_key(&self, flow: f64) -> i64 {
        (flow / self.bin_width).trunc() as i64
    }

    /// Bin the in-window samples and summarize bins with enough samples.
    ///
    /// Points come out in ascending bin order with `weight = n_samples`.
    pub fn bin(&self, samples: &[Sample], source: &str) -> Vec<OperatingPoint> {
        let mut bins: BTreeMap<i64, Vec<&Sample>> = BTreeMap::new();
        for sample in samples.iter().filter(|s| self.in_window(s)) {
            bins.entry(self.bin_key(sample.flow)).or_default().push(sample);
        }

        let total_bins = bins.len();
        let points: Vec<_> = bins
            .into_values()
            .filter(|bin| bin.len() >= self.min_samples)
            .map(|bin| self.summarize_bin(&bin, source))
            .collect();

        tracing::debug!(
            source,
            target_pressure = self.target_pressure,
            bins = total_bins,
            kept = points.len(),
            "Setpoint bins summarized"
        );

        points
    }

    #[allow(clippy::cast_precision_loss)]
    fn summarize_bin(&self, bin: &[&Sample], source: &str) -> OperatingPoint {
        let n = bin.len() as f64;
        let flow = bin.iter().map(|s| s.flow).sum::<f64>() / n;
        let power = bin.iter().map(|s| s.power).sum::<f64>() / n;
        let pressure = bin.iter().map(|s| s.pressure).sum::<f64>() / n;

        OperatingPoint {
            flow,
            power,
            pressure,
            head: self.hydraulics.head_m(pressure),
            weight: bin.len() as u64,
            std_flow: None,
            std_power: None,
            target_pressure: Some(self.target_pressure),
            source: source.to_string(),
        }
    }
}
