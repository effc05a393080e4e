//! Intermediate operating-point CSV
//!
//! Two schemas share this module:
//!
//! | Schema     | Header                                                                 | Order                    |
//! |------------|------------------------------------------------------------------------|--------------------------|
//! | `Segment`  | `flow,power,pressure,head,duration,std_flow,std_power,source_file`     | flow                     |
//! | `Setpoint` | `target_pressure,flow,power,pressure,head,n_samples,source`            | target pressure, flow    |
//!
//! Readers detect the schema from the header row.

use super::{round_to, ReportError};
use crate::config::ExportConfig;
use crate::types::OperatingPoint;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Layout of an intermediate operating-point file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSchema {
    /// Stable-segment extraction output
    Segment,
    /// Inverter setpoint extraction output
    Setpoint,
}

impl PointSchema {
    /// Setpoint schema when every point carries a target pressure.
    pub fn for_points(points: &[OperatingPoint]) -> Self {
        if !points.is_empty() && points.iter().all(|p| p.target_pressure.is_some()) {
            Self::Setpoint
        } else {
            Self::Segment
        }
    }

    fn detect(headers: &csv::StringRecord) -> Option<Self> {
        let has = |name: &str| headers.iter().any(|h| h.trim() == name);
        if has("duration") {
            Some(Self::Segment)
        } else if has("n_samples") {
            Some(Self::Setpoint)
        } else {
            None
        }
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SegmentRow {
    flow: f64,
    power: f64,
    pressure: f64,
    head: f64,
    duration: u64,
    std_flow: Option<f64>,
    std_power: Option<f64>,
    source_file: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SetpointRow {
    target_pressure: f64,
    flow: f64,
    power: f64,
    pressure: f64,
    head: f64,
    n_samples: u64,
    source: String,
}

impl SegmentRow {
    fn from_point(p: &OperatingPoint, export: &ExportConfig) -> Self {
        Self {
            flow: round_to(p.flow, export.flow_decimals),
            power: round_to(p.power, export.power_decimals),
            pressure: round_to(p.pressure, export.pressure_decimals),
            head: round_to(p.head, export.head_decimals),
            duration: p.weight,
            std_flow: p.std_flow.map(|s| round_to(s, export.std_decimals)),
            std_power: p.std_power.map(|s| round_to(s, export.std_decimals)),
            source_file: p.source.clone(),
        }
    }

    fn into_point(self) -> OperatingPoint {
        OperatingPoint {
            flow: self.flow,
            power: self.power,
            pressure: self.pressure,
            head: self.head,
            weight: self.duration,
            std_flow: self.std_flow,
            std_power: self.std_power,
            target_pressure: None,
            source: self.source_file,
        }
    }
}

impl SetpointRow {
    fn from_point(p: &OperatingPoint, export: &ExportConfig) -> Self {
        Self {
            target_pressure: round_to(
                p.target_pressure.unwrap_or(p.pressure),
                export.target_pressure_decimals,
            ),
            flow: round_to(p.flow, export.flow_decimals),
            power: round_to(p.power, export.power_decimals),
            pressure: round_to(p.pressure, export.pressure_decimals),
            head: round_to(p.head, export.head_decimals),
            n_samples: p.weight,
            source: p.source.clone(),
        }
    }

    fn into_point(self) -> OperatingPoint {
        OperatingPoint {
            flow: self.flow,
            power: self.power,
            pressure: self.pressure,
            head: self.head,
            weight: self.n_samples,
            std_flow: None,
            std_power: None,
            target_pressure: Some(self.target_pressure),
            source: self.source,
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Sort in the schema's output order: flow, or (target pressure, flow).
pub fn sort_points(points: &mut [OperatingPoint], schema: PointSchema) {
    match schema {
        PointSchema::Segment => points.sort_by(|a, b| a.flow.total_cmp(&b.flow)),
        PointSchema::Setpoint => points.sort_by(|a, b| {
            let ta = a.target_pressure.unwrap_or(a.pressure);
            let tb = b.target_pressure.unwrap_or(b.pressure);
            ta.total_cmp(&tb).then(a.flow.total_cmp(&b.flow))
        }),
    }
}

/// Write points in `schema`, rounded to the export precision.
///
/// Points are written in the schema's sort order regardless of input order.
pub fn write_points<W: Write>(
    points: &[OperatingPoint],
    schema: PointSchema,
    export: &ExportConfig,
    writer: W,
) -> Result<(), ReportError> {
    let mut sorted = points.to_vec();
    sort_points(&mut sorted, schema);

    let mut writer = csv::Writer::from_writer(writer);
    match schema {
        PointSchema::Segment => {
            if sorted.is_empty() {
                writer.write_record([
                    "flow", "power", "pressure", "head", "duration", "std_flow", "std_power",
                    "source_file",
                ])?;
            }
            for p in &sorted {
                writer.serialize(SegmentRow::from_point(p, export))?;
            }
        }
        PointSchema::Setpoint => {
            if sorted.is_empty() {
                writer.write_record([
                    "target_pressure", "flow", "power", "pressure", "head", "n_samples", "source",
                ])?;
            }
            for p in &sorted {
                writer.serialize(SetpointRow::from_point(p, export))?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Create `path` and write points to it.
pub fn write_points_file(
    points: &[OperatingPoint],
    schema: PointSchema,
    export: &ExportConfig,
    path: &Path,
) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_points(points, schema, export, file)?;
    info!(path = %path.display(), points = points.len(), ?schema, "Wrote operating points");
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

/// Points read back from an intermediate file
#[derive(Debug, Clone)]
pub struct LoadedPoints {
    pub schema: PointSchema,
    pub points: Vec<OperatingPoint>,
    /// Rows that failed to deserialize
    pub skipped: usize,
}

/// Read either intermediate schema, detected from the header.
///
/// Rows that fail to deserialize are skipped with a warning; a read error
/// on the underlying stream is returned.
pub fn read_points<R: Read>(reader: R) -> Result<LoadedPoints, ReportError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();
    let schema = PointSchema::detect(&headers)
        .ok_or_else(|| ReportError::UnknownSchema(headers.iter().collect::<Vec<_>>().join(",")))?;

    let mut points = Vec::new();
    let mut skipped = 0;

    match schema {
        PointSchema::Segment => {
            for row in reader.deserialize::<SegmentRow>() {
                match row {
                    Ok(row) => points.push(row.into_point()),
                    Err(e) => skip_row(e, &mut skipped)?,
                }
            }
        }
        PointSchema::Setpoint => {
            for row in reader.deserialize::<SetpointRow>() {
                match row {
                    Ok(row) => points.push(row.into_point()),
                    Err(e) => skip_row(e, &mut skipped)?,
                }
            }
        }
    }

    Ok(LoadedPoints {
        schema,
        points,
        skipped,
    })
}

fn skip_row(err: csv::Error, skipped: &mut usize) -> Result<(), ReportError> {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        return Err(err.into());
    }
    let line = err.position().map(csv::Position::line);
    warn!(?line, error = %err, "Skipping unreadable operating point row");
    *skipped += 1;
    Ok(())
}

/// Open `path` and read operating points from it.
pub fn read_points_file(path: &Path) -> Result<LoadedPoints, ReportError> {
    let file = File::open(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_points(file)?;
    info!(
        path = %path.display(),
        schema = ?loaded.schema,
        points = loaded.points.len(),
        skipped = loaded.skipped,
        "Read operating points"
    );
    Ok(loaded)
}
