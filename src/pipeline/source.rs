//! Raw export sources: provenance labels and capture-time ordering.
//!
//! The rig's logger names exports after the capture start, e.g.
//! `20260105_093012.csv` or `pump_20260105_093012.csv`. Day-only stamps
//! (`20260105.csv`) also occur.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CAPTURE_STAMP: OnceLock<Option<Regex>> = OnceLock::new();

fn capture_stamp_re() -> Option<&'static Regex> {
    CAPTURE_STAMP
        .get_or_init(|| Regex::new(r"(?:^|\D)(\d{8})(?:_(\d{6}))?(?:\D|$)").ok())
        .as_ref()
}

/// Provenance label of a raw export: its file name.
pub fn source_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Capture start parsed from the file name, if it carries a valid stamp.
///
/// A day-only stamp resolves to midnight.
pub fn capture_stamp(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_stem()?.to_str()?;
    let caps = capture_stamp_re()?.captures(name)?;
    let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y%m%d").ok()?;
    let time = match caps.get(2) {
        Some(t) => NaiveTime::parse_from_str(t.as_str(), "%H%M%S").ok()?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

/// Order files by capture stamp, then by name. Unstamped files go last.
pub fn order_by_capture(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut keyed: Vec<_> = paths
        .iter()
        .map(|p| (capture_stamp(p).is_none(), capture_stamp(p), source_label(p), p.clone()))
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(.., p)| p).collect()
}
