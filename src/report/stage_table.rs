//! Stage table output: CSV, JSON, or a TypeScript constant

use super::{round_to, ReportError};
use crate::config::ExportConfig;
use crate::types::Stage;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Stage table encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StageFormat {
    #[default]
    Csv,
    Json,
    /// `export const NAME = [ ... ];`
    Ts,
}

#[derive(Debug, Serialize)]
struct StageRow {
    stage: usize,
    flow: f64,
    power: f64,
    pressure: f64,
    head: f64,
    /// Whole percent
    efficiency: u32,
    n_points: usize,
    total_weight: u64,
    range_low: f64,
    range_high: f64,
}

impl StageRow {
    fn from_stage(s: &Stage, export: &ExportConfig) -> Self {
        Self {
            stage: s.stage,
            flow: round_to(s.flow, export.flow_decimals),
            power: round_to(s.power, export.power_decimals),
            pressure: round_to(s.pressure, export.pressure_decimals),
            head: round_to(s.head, export.head_decimals),
            efficiency: s.efficiency_percent(),
            n_points: s.n_points,
            total_weight: s.total_weight,
            range_low: s.flow_range.low,
            range_high: s.flow_range.high,
        }
    }
}

/// Write `stages` in `format`, rounded to the export precision.
pub fn write_stages<W: Write>(
    stages: &[Stage],
    format: StageFormat,
    export: &ExportConfig,
    mut writer: W,
) -> Result<(), ReportError> {
    let rows: Vec<StageRow> = stages.iter().map(|s| StageRow::from_stage(s, export)).collect();

    match format {
        StageFormat::Csv => {
            let mut writer = csv::Writer::from_writer(writer);
            if rows.is_empty() {
                writer.write_record([
                    "stage", "flow", "power", "pressure", "head", "efficiency", "n_points",
                    "total_weight", "range_low", "range_high",
                ])?;
            }
            for row in &rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        StageFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &rows)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        StageFormat::Ts => write_typescript(&rows, export, &mut writer)?,
    }
    Ok(())
}

fn write_typescript<W: Write>(
    rows: &[StageRow],
    export: &ExportConfig,
    writer: &mut W,
) -> Result<(), ReportError> {
    let fixed = |value: f64, decimals: u32| format!("{:.prec$}", value, prec = decimals as usize);

    writeln!(writer, "export const {} = [", export.const_name)?;
    for row in rows {
        writeln!(
            writer,
            "  {{ stage: {}, flow: {}, power: {}, pressure: {}, head: {}, efficiency: {} }},",
            row.stage,
            fixed(row.flow, export.flow_decimals),
            fixed(row.power, export.power_decimals),
            fixed(row.pressure, export.pressure_decimals),
            fixed(row.head, export.head_decimals),
            row.efficiency,
        )?;
    }
    writeln!(writer, "];")?;
    writer.flush()?;
    Ok(())
}

/// Create `path` and write the stage table to it.
pub fn write_stages_file(
    stages: &[Stage],
    format: StageFormat,
    export: &ExportConfig,
    path: &Path,
) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_stages(stages, format, export, BufWriter::new(file))?;
    tracing::info!(path = %path.display(), stages = stages.len(), ?format, "Wrote stage table");
    Ok(())
}
