//! Pipeline Configuration - every rig-specific constant as a TOML value
//!
//! Column offsets, detection tolerances, the flow-range table and unit
//! conversion factors all live here so a different rig or unit system only
//! needs a new config file. Each struct implements `Default` with the values
//! of the standard bench procedure.

use super::defaults;
use crate::types::FlowRange;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "VALVE_STAGES_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "valve_stages.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one pipeline instantiation.
///
/// Load with `PipelineConfig::load()` which searches:
/// 1. `$VALVE_STAGES_CONFIG`
/// 2. `./valve_stages.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input column layout
    #[serde(default)]
    pub columns: ColumnLayout,

    /// Validity filter
    #[serde(default)]
    pub filter: FilterConfig,

    /// Stable segment detection
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Multi-source merge
    #[serde(default)]
    pub merge: MergeConfig,

    /// Stage bucket table
    #[serde(default)]
    pub stages: StageConfig,

    /// Physical constants
    #[serde(default)]
    pub physics: PhysicsConfig,

    /// Output precision and naming
    #[serde(default)]
    pub export: ExportConfig,

    /// Inverter pressure-control test definitions
    #[serde(default)]
    pub setpoints: Vec<SetpointConfig>,
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$VALVE_STAGES_CONFIG` environment variable
    /// 2. `./valve_stages.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A file that exists but fails to parse or validate is an error; a
    /// dangling env var only warns.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                let config = Self::load_from_file(&p)?;
                info!(path = %p.display(), "Loaded pipeline config from {}", CONFIG_ENV_VAR);
                return Ok(config);
            }
            warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!("Loaded pipeline config from ./{}", LOCAL_CONFIG_FILE);
            return Ok(config);
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings; range violations are fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every parameter before any file I/O happens.
    ///
    /// Suspicious-but-usable values are logged as warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Column Layout
// ============================================================================

/// Positional layout of the raw rig export. Columns are never looked up by
/// header name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Flow column offset (m³/h)
    #[serde(default = "default_flow_column")]
    pub flow: usize,

    /// Pressure column offset (bar)
    #[serde(default = "default_pressure_column")]
    pub pressure: usize,

    /// Electrical power column offset (kW)
    #[serde(default = "default_power_column")]
    pub power: usize,

    /// Optional timestamp column offset
    #[serde(default)]
    pub timestamp: Option<usize>,

    /// Field delimiter (single ASCII character)
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_flow_column() -> usize { defaults::FLOW_COLUMN }
fn default_pressure_column() -> usize { defaults::PRESSURE_COLUMN }
fn default_power_column() -> usize { defaults::POWER_COLUMN }
fn default_delimiter() -> char { defaults::DELIMITER }

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            flow: default_flow_column(),
            pressure: default_pressure_column(),
            power: default_power_column(),
            timestamp: None,
            delimiter: default_delimiter(),
        }
    }
}

impl ColumnLayout {
    /// Delimiter as the byte the CSV reader expects.
    ///
    /// Validation guarantees ASCII; anything else falls back to a comma.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(b',')
    }

    /// Highest column offset a row must reach to yield a sample.
    pub fn max_required_column(&self) -> usize {
        self.flow.max(self.pressure).max(self.power)
    }
}

// ============================================================================
// Validity Filter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Samples with pressure at or below this floor (bar) are discarded
    #[serde(default = "default_pressure_floor")]
    pub pressure_floor: f64,
}

fn default_pressure_floor() -> f64 { defaults::PRESSURE_FLOOR_BAR }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pressure_floor: default_pressure_floor(),
        }
    }
}

// ============================================================================
// Segment Detection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Maximum |flow - reference| inside a segment (m³/h)
    #[serde(default = "default_flow_tolerance")]
    pub flow_tolerance: f64,

    /// Minimum samples for a run to count as stable
    #[serde(default = "default_min_duration")]
    pub min_duration: usize,
}

fn default_flow_tolerance() -> f64 { defaults::FLOW_TOLERANCE }
fn default_min_duration() -> usize { defaults::MIN_DURATION_SAMPLES }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            flow_tolerance: default_flow_tolerance(),
            min_duration: default_min_duration(),
        }
    }
}

// ============================================================================
// Merge
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Join key is `round(flow / flow_granularity)`
    #[serde(default = "default_flow_granularity")]
    pub flow_granularity: f64,
}

fn default_flow_granularity() -> f64 { defaults::MERGE_FLOW_GRANULARITY }

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            flow_granularity: default_flow_granularity(),
        }
    }
}

// ============================================================================
// Stages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Ordered bucket table; accepts `[low, high]` pairs or `{ low, high }` tables
    #[serde(default = "default_flow_ranges")]
    pub flow_ranges: Vec<FlowRange>,
}

fn default_flow_ranges() -> Vec<FlowRange> {
    defaults::FLOW_RANGES
        .iter()
        .map(|&(low, high)| FlowRange::new(low, high))
        .collect()
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            flow_ranges: default_flow_ranges(),
        }
    }
}

// ============================================================================
// Physics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Head in metres per bar of pressure
    #[serde(default = "default_head_per_bar")]
    pub head_per_bar: f64,

    /// Fluid density (kg/m³)
    #[serde(default = "default_fluid_density")]
    pub fluid_density: f64,

    /// Gravitational acceleration (m/s²)
    #[serde(default = "default_gravity")]
    pub gravity: f64,
}

fn default_head_per_bar() -> f64 { defaults::HEAD_PER_BAR }
fn default_fluid_density() -> f64 { defaults::FLUID_DENSITY }
fn default_gravity() -> f64 { defaults::GRAVITY }

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            head_per_bar: default_head_per_bar(),
            fluid_density: default_fluid_density(),
            gravity: default_gravity(),
        }
    }
}

// ============================================================================
// Export
// ============================================================================

/// Decimal places applied when values leave the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_one_decimal")]
    pub flow_decimals: u32,

    #[serde(default = "default_two_decimals")]
    pub power_decimals: u32,

    #[serde(default = "default_two_decimals")]
    pub pressure_decimals: u32,

    #[serde(default = "default_one_decimal")]
    pub head_decimals: u32,

    #[serde(default = "default_three_decimals")]
    pub std_decimals: u32,

    #[serde(default = "default_one_decimal")]
    pub target_pressure_decimals: u32,

    /// Identifier of the exported TypeScript constant
    #[serde(default = "default_const_name")]
    pub const_name: String,
}

fn default_one_decimal() -> u32 { 1 }
fn default_two_decimals() -> u32 { 2 }
fn default_three_decimals() -> u32 { 3 }
fn default_const_name() -> String { defaults::STAGE_CONST_NAME.to_string() }

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            flow_decimals: default_one_decimal(),
            power_decimals: default_two_decimals(),
            pressure_decimals: default_two_decimals(),
            head_decimals: default_one_decimal(),
            std_decimals: default_three_decimals(),
            target_pressure_decimals: default_one_decimal(),
            const_name: default_const_name(),
        }
    }
}

// ============================================================================
// Setpoints
// ============================================================================

/// One inverter pressure-control test: every file was recorded while the
/// inverter held `target_pressure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetpointConfig {
    /// Provenance label written to the `source` column
    pub label: String,

    /// Controller setpoint (bar)
    pub target_pressure: f64,

    /// Lower edge of the accepted pressure window (inclusive)
    pub pressure_min: f64,

    /// Upper edge of the accepted pressure window (inclusive)
    pub pressure_max: f64,

    /// Raw exports recorded at this setpoint
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Flow bin width (m³/h)
    #[serde(default = "default_bin_width")]
    pub bin_width: f64,

    /// Minimum samples for a bin to produce a point
    #[serde(default = "default_setpoint_min_samples")]
    pub min_samples: usize,
}

fn default_bin_width() -> f64 { defaults::SETPOINT_BIN_WIDTH }
fn default_setpoint_min_samples() -> usize { defaults::SETPOINT_MIN_SAMPLES }

impl SetpointConfig {
    /// Setpoint with the standard ±0.5 bar window and default binning.
    pub fn around(label: impl Into<String>, target_pressure: f64) -> Self {
        Self {
            label: label.into(),
            target_pressure,
            pressure_min: target_pressure - 0.5,
            pressure_max: target_pressure + 0.5,
            files: Vec::new(),
            bin_width: default_bin_width(),
            min_samples: default_setpoint_min_samples(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_flow_ranges_accept_pairs_and_tables() {
        let config = PipelineConfig::from_toml_str(
            r#"
[stages]
flow_ranges = [[0, 1], { low = 19.0, high = 21.0 }]
"#,
        )
        .unwrap();
        assert_eq!(
            config.stages.flow_ranges,
            vec![FlowRange::new(0.0, 1.0), FlowRange::new(19.0, 21.0)]
        );
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
[detection]
flow_tolerance = 0.5
"#,
        )
        .unwrap();
        assert!((config.detection.flow_tolerance - 0.5).abs() < 1e-12);
        assert_eq!(config.detection.min_duration, defaults::MIN_DURATION_SAMPLES);
        assert_eq!(config.columns, ColumnLayout::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = PipelineConfig::default();
        config.setpoints.push(SetpointConfig::around("7.5 bar Test", 7.5));
        let text = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_delimiter_byte() {
        let layout = ColumnLayout {
            delimiter: ';',
            ..ColumnLayout::default()
        };
        assert_eq!(layout.delimiter_byte(), b';');
        assert_eq!(layout.max_required_column(), defaults::POWER_COLUMN);
    }

    #[test]
    fn test_setpoint_window() {
        let sp = SetpointConfig::around("5 bar Test", 5.0);
        assert!((sp.pressure_min - 4.5).abs() < 1e-12);
        assert!((sp.pressure_max - 5.5).abs() < 1e-12);
    }
}
