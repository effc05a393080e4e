//! Physics Engine Module
//!
//! Deterministic pump calculations. All math here is pure physics with
//! constants taken from `[physics]` in the pipeline config.
//!
//! - `Hydraulics::head_m()` - pressure to metres of water column
//! - `Hydraulics::hydraulic_power_kw()` - ρ·g·Q·H output power
//! - `Hydraulics::efficiency_percent()` - hydraulic / electrical power

pub mod hydraulics;

pub use hydraulics::Hydraulics;
