//! Shared data structures for the stage extraction pipeline
//!
//! - `Sample` / `RowOutcome`: raw rig readings (record loader output)
//! - `Segment` / `OperatingPoint`: stable runs and their summaries
//! - `FlowRange` / `Stage`: bucket definitions and final aggregates

mod sample;
mod operating_point;
mod stage;

pub use sample::*;
pub use operating_point::*;
pub use stage::*;
