//! Pump hydraulics: head, hydraulic power and efficiency

use crate::config::PhysicsConfig;

/// Seconds per hour, for m³/h to m³/s
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Watts per kilowatt
const WATTS_PER_KW: f64 = 1000.0;

/// Physical constants for one rig / fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hydraulics {
    /// Metres of head per bar
    pub head_per_bar: f64,
    /// Fluid density (kg/m³)
    pub fluid_density: f64,
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
}

impl Default for Hydraulics {
    fn default() -> Self {
        Self::from(&PhysicsConfig::default())
    }
}

impl From<&PhysicsConfig> for Hydraulics {
    fn from(config: &PhysicsConfig) -> Self {
        Self {
            head_per_bar: config.head_per_bar,
            fluid_density: config.fluid_density,
            gravity: config.gravity,
        }
    }
}

impl Hydraulics {
    /// Pressure (bar) as metres of water column.
    pub fn head_m(&self, pressure_bar: f64) -> f64 {
        pressure_bar * self.head_per_bar
    }

    /// Hydraulic output power in kW
    ///
    /// Formula: P_h = ρ · g · (Q / 3600) · H / 1000
    ///
    /// # Arguments
    /// * `flow_m3h` - Volumetric flow (m³/h)
    /// * `head_m` - Head (m)
    pub fn hydraulic_power_kw(&self, flow_m3h: f64, head_m: f64) -> f64 {
        self.fluid_density * self.gravity * (flow_m3h / SECONDS_PER_HOUR) * head_m / WATTS_PER_KW
    }

    /// Hydraulic efficiency in percent: P_h / P_electric × 100
    ///
    /// Returns 0.0 when electrical power is not positive, and never a
    /// negative value.
    pub fn efficiency_percent(&self, flow_m3h: f64, head_m: f64, power_kw: f64) -> f64 {
        if power_kw <= 0.0 || !power_kw.is_finite() {
            return 0.0;
        }
        let efficiency = self.hydraulic_power_kw(flow_m3h, head_m) / power_kw * 100.0;
        if efficiency.is_finite() {
            efficiency.max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_from_pressure() {
        let h = Hydraulics::default();
        assert!((h.head_m(7.0) - 71.379).abs() < 1e-9);
    }

    #[test]
    fn test_hydraulic_power() {
        // 20 m³/h at 70 m: 1000 * 9.81 * (20/3600) * 70 / 1000 = 3.815 kW
        let h = Hydraulics::default();
        assert!((h.hydraulic_power_kw(20.0, 70.0) - 3.815).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency() {
        let h = Hydraulics::default();
        let eff = h.efficiency_percent(20.0, 70.0, 7.63);
        assert!((eff - 50.0).abs() < 1e-9, "got {eff}");
    }

    #[test]
    fn test_zero_power_efficiency_is_zero() {
        let h = Hydraulics::default();
        assert_eq!(h.efficiency_percent(20.0, 70.0, 0.0), 0.0);
        assert_eq!(h.efficiency_percent(20.0, 70.0, -1.0), 0.0);
    }

    #[test]
    fn test_efficiency_never_negative() {
        let h = Hydraulics::default();
        assert_eq!(h.efficiency_percent(-5.0, 70.0, 3.0), 0.0);
        assert_eq!(h.efficiency_percent(0.0, 70.0, 3.0), 0.0);
    }
}
