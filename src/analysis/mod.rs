//! Operating-point extraction and stage aggregation
//!
//! Turns filtered instrument samples into steady-state operating points and
//! then into per-stage valve characteristics.
//!
//! ## Architecture
//! - `validity_filter`: drop unpressurized samples (pressure <= floor)
//! - `segment_detector`: stable-flow runs within a tolerance band
//! - `summarizer`: segment means, head and population spread
//! - `setpoint_binner`: fixed-width flow bins inside a pressure window
//! - `merger`: provenance tagging and join-by-flow across runs
//! - `stage_bucketer`: first-match-wins flow range assignment
//! - `weighted_aggregator`: weighted stage means and efficiency

pub mod validity_filter;
pub mod segment_detector;
pub mod summarizer;
pub mod setpoint_binner;
pub mod merger;
pub mod stage_bucketer;
pub mod weighted_aggregator;

// Re-export public types
pub use validity_filter::{FilterOutcome, ValidityFilter};
pub use segment_detector::SegmentDetector;
pub use summarizer::SegmentSummarizer;
pub use setpoint_binner::SetpointBinner;
pub use merger::{tag_source, SetpointMerger};
pub use stage_bucketer::{Bucket, BucketAssignment, FlowRangeTable, StageBucketer};
pub use weighted_aggregator::{weighted_mean, WeightedAggregator};
