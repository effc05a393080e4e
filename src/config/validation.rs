//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Unknown keys never break a config; range errors do.

use super::PipelineConfig;
use std::collections::HashSet;

/// Largest emitted precision; `10^d` stays exact in f64 up to here
const MAX_EXPORT_DECIMALS: u32 = 12;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `PipelineConfig`.
///
/// Maintained by hand to match pipeline_config.rs. Array-of-table entries
/// (`[[setpoints]]`) share the array's prefix.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [columns]
        "columns",
        "columns.flow",
        "columns.pressure",
        "columns.power",
        "columns.timestamp",
        "columns.delimiter",
        // [filter]
        "filter",
        "filter.pressure_floor",
        // [detection]
        "detection",
        "detection.flow_tolerance",
        "detection.min_duration",
        // [merge]
        "merge",
        "merge.flow_granularity",
        // [stages]
        "stages",
        "stages.flow_ranges",
        "stages.flow_ranges.low",
        "stages.flow_ranges.high",
        // [physics]
        "physics",
        "physics.head_per_bar",
        "physics.fluid_density",
        "physics.gravity",
        // [export]
        "export",
        "export.flow_decimals",
        "export.power_decimals",
        "export.pressure_decimals",
        "export.head_decimals",
        "export.std_decimals",
        "export.target_pressure_decimals",
        "export.const_name",
        // [[setpoints]]
        "setpoints",
        "setpoints.label",
        "setpoints.target_pressure",
        "setpoints.pressure_min",
        "setpoints.pressure_max",
        "setpoints.files",
        "setpoints.bin_width",
        "setpoints.min_samples",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`. Tables
/// inside arrays are walked under the array's own path, so
/// `[[setpoints]] label = ".."` yields `["setpoints", "setpoints.label"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            keys.extend(walk_nested(v, &path));
        }
    }
    keys
}

fn walk_nested(value: &toml::Value, path: &str) -> Vec<String> {
    match value {
        toml::Value::Table(_) => walk_toml_keys(value, path),
        toml::Value::Array(items) => {
            let mut keys: Vec<String> = items
                .iter()
                .flat_map(|item| walk_nested(item, path))
                .collect();
            keys.sort();
            keys.dedup();
            keys
        }
        _ => Vec::new(),
    }
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so output is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate parameter ranges on a parsed `PipelineConfig`.
///
/// Returns (errors, warnings). Errors are values the pipeline cannot run
/// with; warnings are legal but probably unintended.
pub fn validate_ranges(config: &PipelineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Columns
    let c = &config.columns;
    if !c.delimiter.is_ascii() {
        errors.push(format!(
            "columns.delimiter = {:?} must be a single ASCII character",
            c.delimiter
        ));
    }
    if c.flow == c.pressure || c.flow == c.power || c.pressure == c.power {
        warnings.push(ValidationWarning {
            field: "columns".to_string(),
            message: format!(
                "columns.flow/pressure/power ({}, {}, {}) share an offset",
                c.flow, c.pressure, c.power
            ),
            suggestion: None,
        });
    }

    // Filter
    if !config.filter.pressure_floor.is_finite() {
        errors.push(format!(
            "filter.pressure_floor = {} must be finite",
            config.filter.pressure_floor
        ));
    }

    // Detection
    let d = &config.detection;
    if !d.flow_tolerance.is_finite() || d.flow_tolerance < 0.0 {
        errors.push(format!(
            "detection.flow_tolerance = {} must be finite and >= 0",
            d.flow_tolerance
        ));
    }
    if d.min_duration == 0 {
        errors.push("detection.min_duration must be >= 1 sample".to_string());
    }

    // Merge
    check_positive(config.merge.flow_granularity, "merge.flow_granularity", &mut errors);

    // Stages
    validate_flow_ranges(config, &mut errors, &mut warnings);

    // Physics: all three are multiplicative constants
    let p = &config.physics;
    check_positive(p.head_per_bar, "physics.head_per_bar", &mut errors);
    check_positive(p.fluid_density, "physics.fluid_density", &mut errors);
    check_positive(p.gravity, "physics.gravity", &mut errors);

    // Export
    let e = &config.export;
    for (name, decimals) in [
        ("flow_decimals", e.flow_decimals),
        ("power_decimals", e.power_decimals),
        ("pressure_decimals", e.pressure_decimals),
        ("head_decimals", e.head_decimals),
        ("std_decimals", e.std_decimals),
        ("target_pressure_decimals", e.target_pressure_decimals),
    ] {
        if decimals > MAX_EXPORT_DECIMALS {
            errors.push(format!(
                "export.{name} = {decimals} exceeds {MAX_EXPORT_DECIMALS}"
            ));
        }
    }
    if config.export.const_name.trim().is_empty() {
        errors.push("export.const_name must not be empty".to_string());
    }

    // Setpoints
    for (i, sp) in config.setpoints.iter().enumerate() {
        let name = format!("setpoints[{i}] ({})", sp.label);
        if !sp.pressure_min.is_finite() || !sp.pressure_max.is_finite() {
            errors.push(format!("{name}: pressure window must be finite"));
        } else if sp.pressure_min > sp.pressure_max {
            errors.push(format!(
                "{name}: pressure_min ({:.2}) must be <= pressure_max ({:.2})",
                sp.pressure_min, sp.pressure_max
            ));
        }
        check_positive(sp.bin_width, &format!("{name}.bin_width"), &mut errors);
        if sp.min_samples == 0 {
            errors.push(format!("{name}.min_samples must be >= 1"));
        }
        if sp.files.is_empty() {
            warnings.push(ValidationWarning {
                field: format!("setpoints[{i}].files"),
                message: format!("{name} lists no files"),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

fn validate_flow_ranges(
    config: &PipelineConfig,
    errors: &mut Vec<String>,
    warnings: &mut Vec<ValidationWarning>,
) {
    let ranges = &config.stages.flow_ranges;
    if ranges.is_empty() {
        errors.push("stages.flow_ranges must declare at least one range".to_string());
        return;
    }

    for (i, r) in ranges.iter().enumerate() {
        if !r.low.is_finite() || !r.high.is_finite() {
            errors.push(format!("stages.flow_ranges[{i}] = {r}: bounds must be finite"));
            continue;
        }
        if r.low >= r.high {
            errors.push(format!(
                "stages.flow_ranges[{i}] = {r}: low must be < high"
            ));
        }
        if let Some(prev) = i.checked_sub(1).map(|j| &ranges[j]) {
            if r.low < prev.low {
                errors.push(format!(
                    "stages.flow_ranges[{i}] = {r}: ranges must be declared in ascending order of low bound (previous {prev})"
                ));
            }
        }
        if let Some(earlier) = ranges[..i].iter().find(|e| e.covers(r)) {
            warnings.push(ValidationWarning {
                field: format!("stages.flow_ranges[{i}]"),
                message: format!(
                    "stages.flow_ranges[{i}] = {r} is fully covered by earlier range {earlier} and will never receive points"
                ),
                suggestion: None,
            });
        }
    }
}

fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
    // NaN comparisons silently pass, catch them explicitly
    if !value.is_finite() || value <= 0.0 {
        errors.push(format!("{name} = {value} must be finite and > 0"));
    }
}
