//! Rig CSV Record Loader
//!
//! Parses the test rig's CSV export into `Sample`s. Columns are addressed
//! positionally through `ColumnLayout`; the header row is always skipped.
//!
//! Rows that cannot be parsed are not errors: each one becomes a
//! `RowOutcome::Skipped` carrying the reason, and `LoadReport` counts them.
//! Only failing to open the file is fatal.
//!
//! # Usage
//!
//! ```ignore
//! use valve_stages::acquisition::RecordLoader;
//!
//! let loader = RecordLoader::new(config.columns.clone());
//! let loaded = loader.load("downloads/20260105_0930.csv")?;
//! println!("{} samples, {} skipped", loaded.samples.len(), loaded.report.skipped());
//! ```

use crate::config::{defaults::MAX_LOGGED_SKIPS, ColumnLayout};
use crate::types::{RowOutcome, Sample, SkipReason};
use chrono::{DateTime, NaiveDateTime};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp layouts seen in rig exports, tried in order.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y%m%d_%H%M%S",
];

// ============================================================================
// Errors and Reports
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Row accounting for one loaded file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Data rows seen (header excluded)
    pub rows_read: usize,
    /// Rows that produced a sample
    pub loaded: usize,
    /// Dropped rows per reason
    pub skipped_by_reason: HashMap<SkipReason, usize>,
}

impl LoadReport {
    /// Total dropped rows
    pub fn skipped(&self) -> usize {
        self.skipped_by_reason.values().sum()
    }

    fn record(&mut self, outcome: &RowOutcome) {
        self.rows_read += 1;
        match outcome {
            RowOutcome::Sample(_) => self.loaded += 1,
            RowOutcome::Skipped { reason, .. } => {
                *self.skipped_by_reason.entry(*reason).or_insert(0) += 1;
            }
        }
    }
}

/// Fully drained file: samples in row order plus accounting
#[derive(Debug, Clone, Default)]
pub struct LoadedSamples {
    pub samples: Vec<Sample>,
    pub report: LoadReport,
}

// ============================================================================
// Loader
// ============================================================================

/// Builds sample readers for one column layout
#[derive(Debug, Clone, Default)]
pub struct RecordLoader {
    layout: ColumnLayout,
}

impl RecordLoader {
    pub fn new(layout: ColumnLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Open a file for lazy row-by-row parsing.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<SampleReader<File>, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse_reader(file))
    }

    /// Parse from any byte source (in-memory buffers in tests).
    pub fn parse_reader<R: Read>(&self, reader: R) -> SampleReader<R> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.layout.delimiter_byte())
            .from_reader(reader);

        // Every row would be skipped; say so once instead of per row
        if let Ok(header) = reader.headers() {
            let needed = self.layout.max_required_column();
            if !header.is_empty() && header.len() <= needed {
                tracing::warn!(
                    columns = header.len(),
                    needed = needed + 1,
                    "Header is narrower than the column layout"
                );
            }
        }
        let records = reader.into_records();

        SampleReader {
            records,
            layout: self.layout.clone(),
            next_index: 0,
            finished: false,
        }
    }

    /// Open, drain and close a file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedSamples, LoadError> {
        let path = path.as_ref();
        let loaded = self.open(path)?.collect_samples();

        tracing::info!(
            file = %path.display(),
            rows = loaded.report.rows_read,
            samples = loaded.report.loaded,
            skipped = loaded.report.skipped(),
            "Rig export loaded"
        );

        Ok(loaded)
    }
}

// ============================================================================
// Lazy Reader
// ============================================================================

/// Iterator over the data rows of one export
pub struct SampleReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    layout: ColumnLayout,
    next_index: usize,
    finished: bool,
}

impl<R: Read> SampleReader<R> {
    /// Drain the reader, logging the first few skipped rows.
    pub fn collect_samples(self) -> LoadedSamples {
        let mut loaded = LoadedSamples::default();

        for outcome in self {
            loaded.report.record(&outcome);
            match outcome {
                RowOutcome::Sample(sample) => loaded.samples.push(sample),
                RowOutcome::Skipped { line, reason } => {
                    if loaded.report.skipped() <= MAX_LOGGED_SKIPS {
                        tracing::debug!(line, %reason, "Skipping row");
                    }
                }
            }
        }

        loaded
    }
}

impl<R: Read> Iterator for SampleReader<R> {
    type Item = RowOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.records.next()?;
        let index = self.next_index;
        self.next_index += 1;

        match result {
            Ok(record) => {
                let line = record.position().map_or(0, csv::Position::line);
                Some(match parse_record(&record, &self.layout, index) {
                    Ok(sample) => RowOutcome::Sample(sample),
                    Err(reason) => RowOutcome::Skipped { line, reason },
                })
            }
            Err(err) => {
                let line = err.position().map_or(0, csv::Position::line);
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    // The underlying stream is broken; further reads repeat the failure
                    tracing::warn!(line, error = %err, "Read error, stopping");
                    self.finished = true;
                }
                Some(RowOutcome::Skipped {
                    line,
                    reason: SkipReason::Malformed,
                })
            }
        }
    }
}

// ============================================================================
// Row Parsing
// ============================================================================

/// Parse one record into a sample; the first failing field decides the reason.
fn parse_record(
    record: &csv::StringRecord,
    layout: &ColumnLayout,
    index: usize,
) -> Result<Sample, SkipReason> {
    let flow = get_f64(record, layout.flow)?;
    let pressure = get_f64(record, layout.pressure)?;
    let power = get_f64(record, layout.power)?;
    let timestamp = layout
        .timestamp
        .and_then(|col| record.get(col))
        .and_then(parse_timestamp);

    Ok(Sample {
        index,
        timestamp,
        flow,
        pressure,
        power,
    })
}

fn get_f64(record: &csv::StringRecord, column: usize) -> Result<f64, SkipReason> {
    let raw = record
        .get(column)
        .ok_or(SkipReason::MissingField { column })?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| SkipReason::InvalidNumber { column })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SkipReason::NonFinite { column })
    }
}

/// Parse a timestamp field; unparseable values yield `None`, never a skip.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a 14-column rig row with flow/pressure/power at the default offsets.
    fn row(flow: &str, pressure: &str, power: &str) -> String {
        let mut fields = vec!["0"; 14];
        fields[3] = flow;
        fields[5] = pressure;
        fields[13] = power;
        fields.join(",")
    }

    fn header() -> String {
        (0..14).map(|i| format!("col{i}")).collect::<Vec<_>>().join(",")
    }

    fn load_str(text: &str) -> LoadedSamples {
        RecordLoader::default()
            .parse_reader(text.as_bytes())
            .collect_samples()
    }

    #[test]
    fn test_header_is_skipped() {
        let text = format!("{}\n{}\n", header(), row("20.1", "7.2", "3.4"));
        let loaded = load_str(&text);
        assert_eq!(loaded.samples.len(), 1);
        let s = loaded.samples[0];
        assert_eq!(s.index, 0);
        assert!((s.flow - 20.1).abs() < 1e-12);
        assert!((s.pressure - 7.2).abs() < 1e-12);
        assert!((s.power - 3.4).abs() < 1e-12);
        assert!(s.timestamp.is_none());
    }

    #[test]
    fn test_malformed_rows_are_counted_by_reason() {
        let text = format!(
            "{}\n{}\n{}\n{}\n0,1,2\n{}\n",
            header(),
            row("20.1", "7.2", "3.4"),
            row("abc", "7.2", "3.4"),
            row("20.1", "NaN", "3.4"),
            row("20.3", "7.1", "3.5"),
        );
        let loaded = load_str(&text);

        assert_eq!(loaded.samples.len(), 2);
        assert_eq!(loaded.report.rows_read, 5);
        assert_eq!(loaded.report.loaded, 2);
        assert_eq!(loaded.report.skipped(), 3);
        let by = &loaded.report.skipped_by_reason;
        assert_eq!(by.get(&SkipReason::InvalidNumber { column: 3 }), Some(&1));
        assert_eq!(by.get(&SkipReason::NonFinite { column: 5 }), Some(&1));
        assert_eq!(by.get(&SkipReason::MissingField { column: 3 }), Some(&1));

        // Indices track data-row position, including dropped rows
        assert_eq!(loaded.samples[1].index, 4);
    }

    #[test]
    fn test_lazy_iteration_yields_outcomes_in_order() {
        let text = format!("{}\n{}\n{}\n", header(), row("x", "7", "3"), row("1", "7", "3"));
        let outcomes: Vec<_> = RecordLoader::default().parse_reader(text.as_bytes()).collect();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0],
            RowOutcome::Skipped { line: 2, reason: SkipReason::InvalidNumber { column: 3 } }
        ));
        assert!(outcomes[1].sample().is_some());
    }

    #[test]
    fn test_custom_layout_and_timestamp() {
        let layout = ColumnLayout {
            flow: 1,
            pressure: 2,
            power: 3,
            timestamp: Some(0),
            delimiter: ';',
        };
        let text = "time;q;p;kw\n2026-01-05 09:30:00;12.5;6.1;2.2\nbad-time;12.6;6.1;2.2\n";
        let loaded = RecordLoader::new(layout).parse_reader(text.as_bytes()).collect_samples();

        assert_eq!(loaded.samples.len(), 2);
        let ts = loaded.samples[0].timestamp.expect("timestamp parsed");
        assert_eq!(ts.to_string(), "2026-01-05 09:30:00");
        assert!(loaded.samples[1].timestamp.is_none());
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let loaded = load_str("");
        assert!(loaded.samples.is_empty());
        assert_eq!(loaded.report, LoadReport::default());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = RecordLoader::default()
            .load("/definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2026-02-13T17:15:25.500").is_some());
        assert!(parse_timestamp("2026/02/13 17:15:25").is_some());
        assert!(parse_timestamp("20260213_171525").is_some());
        assert!(parse_timestamp("2026-02-13T17:15:25+09:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
