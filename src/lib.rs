//! valve-stages: Pump Test-Rig Stage Characterization
//!
//! Turns raw test-rig CSV exports into a per-stage table of pump operating
//! characteristics (flow, power, pressure, head, efficiency) for a simulator.
//!
//! ## Architecture
//!
//! - **Acquisition**: positional CSV parsing with per-row skip accounting
//! - **Analysis**: validity filter, stable segment detection, summarizing,
//!   setpoint binning, merging, stage bucketing and weighted aggregation
//! - **Physics Engine**: head and hydraulic efficiency
//! - **Report**: intermediate operating-point CSVs and the stage table
//! - **Pipeline**: wires the above together from a validated config

pub mod config;
pub mod types;
pub mod acquisition;
pub mod analysis;
pub mod physics_engine;
pub mod report;
pub mod pipeline;

// Re-export configuration
pub use config::{ConfigError, PipelineConfig};

// Re-export commonly used types
pub use types::{FlowRange, OperatingPoint, RowOutcome, Sample, Segment, SkipReason, Stage};

// Re-export pipeline entry points
pub use pipeline::{FileExtraction, Pipeline, StageReport};

// Re-export report formats
pub use report::{PointSchema, ReportError, StageFormat};
