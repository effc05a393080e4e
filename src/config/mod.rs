//! Pipeline Configuration Module
//!
//! Per-rig configuration loaded from TOML files, replacing the column
//! offsets, tolerances, flow-range table and unit factors that would
//! otherwise be hardcoded.
//!
//! ## Loading Order
//!
//! 1. `VALVE_STAGES_CONFIG` environment variable (path to TOML file)
//! 2. `valve_stages.toml` in the current working directory
//! 3. Built-in defaults (standard bench procedure)
//!
//! ## Usage
//!
//! ```ignore
//! let config = PipelineConfig::load()?;
//! let pipeline = Pipeline::new(config)?;
//! ```
//!
//! Configuration is passed by value into the pipeline; there is no global
//! instance, so concurrent runs with different parameters never interfere.

mod pipeline_config;
pub mod defaults;
pub mod validation;

pub use pipeline_config::*;
