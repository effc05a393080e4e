//! Data acquisition from rig CSV exports
//!
//! - `record_loader`: positional CSV parsing into `Sample`s with explicit
//!   per-row skip accounting

pub mod record_loader;

pub use record_loader::{LoadError, LoadReport, LoadedSamples, RecordLoader, SampleReader};
