//! Extraction Pipeline
//!
//! ```text
//! Segment strategy:   loader -> validity filter -> segment detector -> summarizer
//! Setpoint strategy:  loader -> setpoint binner -> merge by flow (multi-file)
//! Stage table:        points -> stage bucketer -> weighted aggregator
//! ```
//!
//! `Pipeline` owns only the validated configuration and the stateless
//! components derived from it, so one instance can serve many files
//! concurrently. Writing results is left to the caller (see `report`).

pub mod source;

pub use source::{capture_stamp, order_by_capture, source_label};

use crate::acquisition::{LoadError, LoadReport, RecordLoader};
use crate::analysis::{
    tag_source, FlowRangeTable, SegmentDetector, SegmentSummarizer, SetpointBinner,
    SetpointMerger, StageBucketer, ValidityFilter, WeightedAggregator,
};
use crate::config::{ConfigError, PipelineConfig, SetpointConfig};
use crate::physics_engine::Hydraulics;
use crate::report::{sort_points, PointSchema};
use crate::types::{OperatingPoint, Segment, Stage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything extracted from one raw export
#[derive(Debug, Clone)]
pub struct FileExtraction {
    /// Provenance label (file name)
    pub source: String,
    pub points: Vec<OperatingPoint>,
    pub load: LoadReport,
    /// Samples dropped by the validity filter
    pub filtered: usize,
    /// Stable segments, indices into the filtered sample sequence
    pub segments: Vec<Segment>,
}

/// Stage table plus the points no flow range claimed
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stages: Vec<Stage>,
    pub unmatched: usize,
}

/// Configured extraction and aggregation pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    loader: RecordLoader,
    filter: ValidityFilter,
    detector: SegmentDetector,
    summarizer: SegmentSummarizer,
    merger: SetpointMerger,
    bucketer: StageBucketer,
    aggregator: WeightedAggregator,
    hydraulics: Hydraulics,
}

impl Pipeline {
    /// Validate `config` and build the pipeline. No file is touched.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let hydraulics = Hydraulics::from(&config.physics);
        let table = FlowRangeTable::try_from(&config.stages)?;

        Ok(Self {
            loader: RecordLoader::new(config.columns.clone()),
            filter: ValidityFilter::from(&config.filter),
            detector: SegmentDetector::from(&config.detection),
            summarizer: SegmentSummarizer::new(hydraulics),
            merger: SetpointMerger::new(&config.merge, hydraulics),
            bucketer: StageBucketer::new(table),
            aggregator: WeightedAggregator::new(hydraulics),
            hydraulics,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn hydraulics(&self) -> Hydraulics {
        self.hydraulics
    }

    // ========================================================================
    // Segment strategy
    // ========================================================================

    /// Load one export and summarize its stable segments.
    pub fn extract_file(&self, path: &Path) -> Result<FileExtraction, LoadError> {
        let source = source_label(path);
        let loaded = self.loader.load(path)?;
        let outcome = self.filter.filter(loaded.samples);

        if outcome.samples.is_empty() {
            warn!(
                file = %source,
                rejected = outcome.rejected,
                "No valid samples after pressure filter"
            );
        }

        let segments = self.detector.detect(&outcome.samples);
        let points = self.summarizer.summarize_all(&outcome.samples, &segments, &source);

        if points.is_empty() {
            info!(file = %source, samples = outcome.samples.len(), "No stable segments");
        } else {
            info!(
                file = %source,
                samples = outcome.samples.len(),
                segments = segments.len(),
                points = points.len(),
                "Stable segments extracted"
            );
        }

        Ok(FileExtraction {
            source,
            points,
            load: loaded.report,
            filtered: outcome.rejected,
            segments,
        })
    }

    /// Extract every file in parallel.
    ///
    /// Files are processed in capture order; results keep that order.
    pub fn extract_all(&self, paths: &[PathBuf]) -> Result<Vec<FileExtraction>, LoadError> {
        order_by_capture(paths)
            .par_iter()
            .map(|path| self.extract_file(path))
            .collect()
    }

    /// Extract every file and flatten to one provenance-tagged list sorted by flow.
    pub fn extract_files(&self, paths: &[PathBuf]) -> Result<Vec<OperatingPoint>, LoadError> {
        let extractions = self.extract_all(paths)?;
        let mut points = tag_source(extractions.into_iter().map(|e| (e.source, e.points)));
        sort_points(&mut points, PointSchema::Segment);

        info!(files = paths.len(), points = points.len(), "Extraction complete");
        Ok(points)
    }

    // ========================================================================
    // Setpoint strategy
    // ========================================================================

    /// Bin every file of one setpoint. Runs spread over several files are
    /// merged by flow; a single file keeps its bins as they are.
    pub fn extract_setpoint(&self, setpoint: &SetpointConfig) -> Result<Vec<OperatingPoint>, LoadError> {
        let binner = SetpointBinner::new(setpoint, self.hydraulics);
        let per_file: Vec<Vec<OperatingPoint>> = order_by_capture(&setpoint.files)
            .par_iter()
            .map(|path| -> Result<Vec<OperatingPoint>, LoadError> {
                let loaded = self.loader.load(path)?;
                Ok(binner.bin(&loaded.samples, &setpoint.label))
            })
            .collect::<Result<_, _>>()?;

        let runs: Vec<OperatingPoint> = per_file.into_iter().flatten().collect();
        let bins = runs.len();
        let merged = if setpoint.files.len() > 1 {
            self.merger.merge_by_flow(&runs, &setpoint.label)
        } else {
            runs
        };

        if merged.is_empty() {
            warn!(
                setpoint = %setpoint.label,
                target_pressure = setpoint.target_pressure,
                "No flow bins reached the sample minimum"
            );
        } else {
            info!(
                setpoint = %setpoint.label,
                files = setpoint.files.len(),
                bins,
                points = merged.len(),
                "Setpoint extracted"
            );
        }
        Ok(merged)
    }

    /// Every configured setpoint, sorted by (target pressure, flow).
    pub fn extract_setpoints(&self) -> Result<Vec<OperatingPoint>, LoadError> {
        let mut points = Vec::new();
        for setpoint in &self.config.setpoints {
            points.extend(self.extract_setpoint(setpoint)?);
        }
        sort_points(&mut points, PointSchema::Setpoint);
        Ok(points)
    }

    // ========================================================================
    // Stage table
    // ========================================================================

    /// Bucket points by flow range and aggregate each bucket into a stage.
    pub fn build_stages<I>(&self, points: I) -> StageReport
    where
        I: IntoIterator<Item = OperatingPoint>,
    {
        let assignment = self.bucketer.assign(points);
        let stages = self.aggregator.aggregate(&assignment);

        if assignment.unmatched > 0 {
            warn!(
                unmatched = assignment.unmatched,
                "Operating points outside every flow range were dropped"
            );
        }
        info!(
            stages = stages.len(),
            ranges = self.bucketer.table().len(),
            "Stage table built"
        );

        StageReport {
            stages,
            unmatched: assignment.unmatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlowRange;

    fn point(flow: f64, weight: u64) -> OperatingPoint {
        OperatingPoint {
            flow,
            power: 2.0,
            pressure: 7.0,
            head: 7.0 * 10.197,
            weight,
            std_flow: None,
            std_power: None,
            target_pressure: None,
            source: "t".to_string(),
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_io() {
        let mut config = PipelineConfig::default();
        config.stages.flow_ranges = vec![FlowRange::new(5.0, 1.0)];
        assert!(matches!(Pipeline::new(config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_build_stages_counts_unmatched() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let report = pipeline.build_stages(vec![point(20.0, 10), point(9.0, 10), point(30.0, 5)]);
        assert_eq!(report.unmatched, 2);
        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.stages[0].stage, 0);
        assert_eq!(report.stages[0].flow_range, FlowRange::new(19.0, 21.0));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline.extract_file(Path::new("/nonexistent/run.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}
