//! Trackgeff: cell-tracking graphs to GEFF stores and back.
//!
//! Trackgeff writes a tracking result (detections, links, tracks, and
//! their features) into a GEFF graph store laid out as chunked columnar
//! arrays, and rebuilds a tracking model from such a store. Tracks are
//! reconstructed from connected components on the way back in.
//!
//! # Modules
//!
//! - [`model`]: Tracking graph types (TrackingModel, Detection, Link, Track, features)
//! - [`store`]: Chunked columnar store boundary and its engines
//! - [`geff`]: The codec itself (export, import, inspect)
//! - [`report`]: What an export or import did, with aggregated issues
//! - [`validation`]: Model validation and error reporting
//! - [`error`]: Error types for trackgeff operations

pub mod error;
pub mod geff;
pub mod model;
pub mod report;
pub mod store;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub use error::GeffError;

/// The trackgeff CLI application.
#[derive(Parser)]
#[command(name = "trackgeff")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Write a model JSON file into a GEFF store.
    Export(ExportArgs),
    /// Rebuild a model JSON file from a GEFF store.
    Import(ImportArgs),
    /// Summarize a GEFF store without building a model.
    Inspect(InspectArgs),
    /// Validate a model JSON file for errors and warnings.
    Validate(ValidateArgs),
}

/// Rendering of reports and summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    /// Model JSON file to export.
    input: PathBuf,

    /// Store directory to write.
    output: PathBuf,

    /// Write a 2D store (drop z) even if some detection has non-zero z.
    #[arg(long = "2d", conflicts_with = "force_3d")]
    force_2d: bool,

    /// Write a 3D store even if every detection lies in z = 0.
    #[arg(long = "3d")]
    force_3d: bool,

    /// Rows per chunk.
    #[arg(long, default_value_t = store::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Group inside the store.
    #[arg(long, default_value = geff::DEFAULT_GROUP)]
    group: String,

    /// Export even if validation finds errors.
    #[arg(long)]
    no_validate: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    report: OutputFormat,
}

/// Arguments for the import subcommand.
#[derive(clap::Args)]
struct ImportArgs {
    /// Store directory to read.
    input: PathBuf,

    /// Model JSON file to write.
    output: PathBuf,

    /// Restore visibility and names of exported tracks.
    #[arg(long)]
    restore_track_attributes: bool,

    /// Id of the first rebuilt track.
    #[arg(long, default_value_t = geff::DEFAULT_TRACK_ID_BASE)]
    track_id_base: u32,

    /// Group inside the store.
    #[arg(long, default_value = geff::DEFAULT_GROUP)]
    group: String,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    report: OutputFormat,
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// Store directory to summarize.
    input: PathBuf,

    /// Group inside the store.
    #[arg(long, default_value = geff::DEFAULT_GROUP)]
    group: String,

    /// Output format for the summary.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Model JSON file to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Run the trackgeff CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), GeffError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Export(args)) => run_export(args),
        Some(Commands::Import(args)) => run_import(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("trackgeff {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Cell-tracking graphs to GEFF stores and back.");
            println!();
            println!("Run 'trackgeff --help' for usage information.");
            Ok(())
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<(), GeffError> {
    let json = serde_json::to_string_pretty(value).map_err(GeffError::ReportJson)?;
    println!("{}", json);
    Ok(())
}

/// Fails with [`GeffError::ValidationFailed`] if `report` has errors, or
/// warnings under `strict`.
fn check_validation(
    report: validation::ValidationReport,
    strict: bool,
) -> Result<(), GeffError> {
    if !report.is_ok() || (strict && report.warning_count() > 0) {
        return Err(GeffError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        });
    }
    Ok(())
}

/// Execute the export subcommand.
fn run_export(args: ExportArgs) -> Result<(), GeffError> {
    let model = model::io_json::read_model_json(&args.input)?;

    if !args.no_validate {
        let report = validation::validate_model(&model, &validation::ValidateOptions::default());
        if !report.is_clean() {
            eprint!("{}", report);
        }
        check_validation(report, false)?;
    }

    let is_2d = if args.force_2d {
        true
    } else if args.force_3d {
        false
    } else {
        model.is_planar()
    };
    let options = geff::ExportOptions {
        is_2d,
        chunk_size: args.chunk_size,
        group: args.group,
    };
    let report = geff::export_to_path(&model, &args.output, &options)?;

    match args.report {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!(
                "Exported {} -> {} ({})",
                args.input.display(),
                args.output.display(),
                if is_2d { "2D" } else { "3D" }
            );
            print!("{}", report);
        }
    }
    Ok(())
}

/// Execute the import subcommand.
fn run_import(args: ImportArgs) -> Result<(), GeffError> {
    let options = geff::ImportOptions {
        track_id_base: args.track_id_base,
        restore_track_attributes: args.restore_track_attributes,
        group: args.group,
    };
    let (model, report) = geff::import_from_path(&args.input, &options)?;
    model::io_json::write_model_json(&args.output, &model)?;

    match args.report {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!(
                "Imported {} -> {}",
                args.input.display(),
                args.output.display()
            );
            print!("{}", report);
        }
    }
    Ok(())
}

/// Execute the inspect subcommand.
fn run_inspect(args: InspectArgs) -> Result<(), GeffError> {
    let summary = geff::inspect_path(&args.input, &args.group)?;

    match args.output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            print!("{}", summary);
            Ok(())
        }
    }
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), GeffError> {
    let model = model::io_json::read_model_json(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_model(&model, &opts);

    match args.output {
        OutputFormat::Json => print_json(&ValidationSummary::from(&report))?,
        OutputFormat::Text => print!("{}", report),
    }

    check_validation(report, args.strict)
}

/// JSON shape of a validation report on the command line.
#[derive(Serialize)]
struct ValidationSummary<'a> {
    error_count: usize,
    warning_count: usize,
    issues: &'a [validation::ValidationIssue],
}

impl<'a> From<&'a validation::ValidationReport> for ValidationSummary<'a> {
    fn from(report: &'a validation::ValidationReport) -> Self {
        Self {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            issues: &report.issues,
        }
    }
}
