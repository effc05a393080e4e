//! System-wide default constants.
//!
//! Values match the rig's standard CSV export and the bench procedure used
//! for the valve stage tables. Grouped by pipeline stage.

// ============================================================================
// Record Loader
// ============================================================================

/// Zero-based column of `Main_Flow` (m³/h) in the rig export.
pub const FLOW_COLUMN: usize = 3;

/// Zero-based column of `OUT_PT050` discharge pressure (bar).
pub const PRESSURE_COLUMN: usize = 5;

/// Zero-based column of `Main_kW` electrical power (kW).
pub const POWER_COLUMN: usize = 13;

/// Field delimiter of the rig export.
pub const DELIMITER: char = ',';

/// Number of skipped rows logged individually per file before going quiet.
pub const MAX_LOGGED_SKIPS: usize = 10;

// ============================================================================
// Validity Filter
// ============================================================================

/// Pressure at or below this (bar) means the rig was not primed.
pub const PRESSURE_FLOOR_BAR: f64 = 5.0;

// ============================================================================
// Segment Detection
// ============================================================================

/// Allowed flow deviation from the segment reference (m³/h).
pub const FLOW_TOLERANCE: f64 = 0.3;

/// Minimum samples in a stable segment (10 s at 1 Hz).
pub const MIN_DURATION_SAMPLES: usize = 10;

// ============================================================================
// Merge / Setpoint Binning
// ============================================================================

/// Join-key granularity for merging points of one setpoint (nearest integer).
pub const MERGE_FLOW_GRANULARITY: f64 = 1.0;

/// Flow bin width for inverter setpoint tests (m³/h).
pub const SETPOINT_BIN_WIDTH: f64 = 5.0;

/// Minimum samples in a setpoint flow bin.
pub const SETPOINT_MIN_SAMPLES: usize = 10;

// ============================================================================
// Stages
// ============================================================================

/// Valve stage flow buckets `[low, high)` in m³/h, in declaration order.
///
/// (4, 7) and (6, 8) overlap; the first range claims 6.x flows.
pub const FLOW_RANGES: [(f64, f64); 10] = [
    (0.0, 1.0),   // no load
    (4.0, 7.0),   // 5-6 m³/h
    (6.0, 8.0),   // 6-7 m³/h
    (10.0, 13.0), // 11-12 m³/h
    (14.0, 16.0), // 15 m³/h
    (16.0, 17.0), // 16 m³/h
    (17.0, 19.0), // 18 m³/h
    (19.0, 21.0), // 20 m³/h, near rated
    (21.0, 23.0), // 22 m³/h
    (23.0, 26.0), // 24 m³/h, max
];

// ============================================================================
// Physics
// ============================================================================

/// Metres of water column per bar.
pub const HEAD_PER_BAR: f64 = 10.197;

/// Water density (kg/m³).
pub const FLUID_DENSITY: f64 = 1000.0;

/// Standard gravity (m/s²).
pub const GRAVITY: f64 = 9.81;

// ============================================================================
// Export
// ============================================================================

/// Name of the exported TypeScript constant.
pub const STAGE_CONST_NAME: &str = "VALVE_STAGES";
