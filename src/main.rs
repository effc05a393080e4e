//! valve-stages - pump test-rig stage characterization
//!
//! # Usage
//!
//! ```bash
//! # Stable operating points from raw exports
//! valve-stages extract downloads/2026*.csv -o stable_operating_points.csv
//!
//! # Stage table from an intermediate file
//! valve-stages stages -i stable_operating_points.csv --format ts
//!
//! # Both in one pass, full precision in memory
//! valve-stages run downloads/2026*.csv --points points.csv -o stages.json --format json
//!
//! # Inverter pressure-control tests declared under [[setpoints]]
//! valve-stages --config rig.toml setpoints -o inverter_points.csv
//! ```
//!
//! # Environment Variables
//!
//! - `VALVE_STAGES_CONFIG`: config file used when `--config` is absent
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use valve_stages::report::{self, PointSchema, StageFormat};
use valve_stages::{OperatingPoint, Pipeline, PipelineConfig, Stage};

/// Flow band of the pump's rated operating point (m³/h)
const RATED_FLOW_BAND: (f64, f64) = (19.0, 21.0);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "valve-stages")]
#[command(about = "Pump test-rig operating point extraction and valve stage table")]
#[command(version)]
struct CliArgs {
    /// Pipeline config (TOML). Without it: $VALVE_STAGES_CONFIG, ./valve_stages.toml, defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Extract stable operating points from raw rig exports
    Extract {
        /// Raw rig CSV exports
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Intermediate operating-point CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build the stage table from an intermediate operating-point CSV
    Stages {
        /// Operating points (either schema)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = StageFormat::Csv)]
        format: StageFormat,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract and build stages in one pass without rounding in between
    Run {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write the intermediate operating points here
        #[arg(long)]
        points: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = StageFormat::Csv)]
        format: StageFormat,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract inverter setpoint tests declared under [[setpoints]]
    Setpoints {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.json_logs);

    let config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::load().context("Failed to load pipeline config")?,
    };

    if let SubCommand::Config = args.command {
        print!("{}", config.to_toml().context("Failed to serialize config")?);
        return Ok(());
    }

    let pipeline = Pipeline::new(config).context("Invalid pipeline config")?;

    match args.command {
        SubCommand::Extract { files, output } => {
            let points = pipeline.extract_files(&files).context("Extraction failed")?;
            log_point_summary(&points);
            report::write_points_file(&points, PointSchema::Segment, &pipeline.config().export, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }
        SubCommand::Stages { input, format, output } => {
            let loaded = report::read_points_file(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            if loaded.skipped > 0 {
                warn!(skipped = loaded.skipped, "Some operating point rows were unreadable");
            }
            let stage_report = pipeline.build_stages(loaded.points);
            emit_stages(&pipeline, &stage_report.stages, format, output.as_deref())?;
        }
        SubCommand::Run { files, points: points_out, format, output } => {
            let points = pipeline.extract_files(&files).context("Extraction failed")?;
            log_point_summary(&points);
            if let Some(path) = &points_out {
                report::write_points_file(&points, PointSchema::Segment, &pipeline.config().export, path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            let stage_report = pipeline.build_stages(points);
            emit_stages(&pipeline, &stage_report.stages, format, output.as_deref())?;
        }
        SubCommand::Setpoints { output } => {
            if pipeline.config().setpoints.is_empty() {
                bail!("No [[setpoints]] declared in the pipeline config");
            }
            let points = pipeline.extract_setpoints().context("Setpoint extraction failed")?;
            log_point_summary(&points);
            report::write_points_file(&points, PointSchema::Setpoint, &pipeline.config().export, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }
        SubCommand::Config => {}
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Logs go to stderr so stdout stays clean for table output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Output
// ============================================================================

fn emit_stages(
    pipeline: &Pipeline,
    stages: &[Stage],
    format: StageFormat,
    output: Option<&Path>,
) -> Result<()> {
    log_stage_summary(stages);
    let export = &pipeline.config().export;
    match output {
        Some(path) => report::write_stages_file(stages, format, export, path)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => report::write_stages(stages, format, export, BufWriter::new(io::stdout().lock()))
            .context("Failed to write stage table to stdout")?,
    }
    Ok(())
}

fn log_point_summary(points: &[OperatingPoint]) {
    let range = |f: fn(&OperatingPoint) -> f64| {
        points.iter().map(f).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    };
    if points.is_empty() {
        warn!("No operating points extracted");
        return;
    }
    let (flow_min, flow_max) = range(|p| p.flow);
    let (power_min, power_max) = range(|p| p.power);
    let (pressure_min, pressure_max) = range(|p| p.pressure);
    info!(
        points = points.len(),
        flow_min, flow_max, power_min, power_max, pressure_min, pressure_max,
        "Operating point summary"
    );
}

fn log_stage_summary(stages: &[Stage]) {
    for s in stages {
        info!(
            stage = s.stage,
            range = %s.flow_range,
            flow = s.flow,
            power = s.power,
            pressure = s.pressure,
            head = s.head,
            points = s.n_points,
            weight = s.total_weight,
            "Stage"
        );
    }

    let (low, high) = RATED_FLOW_BAND;
    match stages.iter().find(|s| (low..=high).contains(&s.flow)) {
        Some(s) => info!(
            stage = s.stage,
            flow = s.flow,
            power = s.power,
            pressure = s.pressure,
            head = s.head,
            efficiency = s.efficiency_percent(),
            "Rated-flow stage"
        ),
        None => warn!("No stage near rated flow {low}-{high} m³/h"),
    }
}
