//! Report emission: intermediate operating-point CSVs and the stage table
//!
//! All rounding happens here. In-memory values stay at full precision until
//! they are written.

pub mod operating_points;
pub mod stage_table;

pub use operating_points::{
    read_points, read_points_file, sort_points, write_points, write_points_file, LoadedPoints,
    PointSchema,
};
pub use stage_table::{write_stages, write_stages_file, StageFormat};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("Unrecognized operating point header: {0}")]
    UnknownSchema(String),
}

/// Round half away from zero to `decimals` places.
#[allow(clippy::cast_possible_wrap)]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    // Keep -0.0 out of the output
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
