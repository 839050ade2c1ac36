//! Data-quality assessment tool.
//!
//! Reads an assessment document (dataset, rule configuration and engine
//! settings), runs every rule plus duplicate detection, and writes the
//! validated assessment report as JSON.
//!
//! # Guarantees
//! - Input documents are schema-checked before any rule runs
//! - The input is never modified; the clean dataset is a separate output
//! - Reports are only written after the annexure consistency check passes

use clap::{Args, Parser, Subcommand};
use dqaudit_core::{
    AssessmentReport, Dataset, DimensionScore, QualityAnalyzer, Result,
    error::DqError,
    logging::init_logging,
    quality::{Dimension, catalog},
    validate_and_parse_document,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "dqaudit")]
#[command(about = "Data-quality rule execution and duplicate detection")]
#[command(version)]
#[command(long_about = "
dqaudit - Data-quality assessment and duplicate detection

Evaluates column-level rules over a tabular dataset and reports:
- Completeness, validity, standardization and uniqueness scores
- Exact and fuzzy duplicate groups
- Per-rule annexure sections and column risk

EXAMPLES:
  dqaudit assess --input customers.json
  dqaudit assess --input customers.json --output report.json --pretty
  dqaudit assess --input customers.json --clean-output cleaned.json
  dqaudit rules
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run an assessment document
    Assess(AssessArgs),
    /// Print the rule catalog as JSON
    Rules,
}

#[derive(Args)]
pub struct AssessArgs {
    /// Assessment document path
    #[arg(short, long, help = "Assessment document (.json)")]
    pub input: PathBuf,

    /// Report output path
    #[arg(short, long, help = "Report output path (stdout when omitted)")]
    pub output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, help = "Pretty-print JSON output")]
    pub pretty: bool,

    /// Clean dataset output path
    #[arg(
        long,
        help = "Write the standardized, de-duplicated dataset to this path"
    )]
    pub clean_output: Option<PathBuf>,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Suppress all output except errors"
    )]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    dqaudit_core::initialize_schema_validator().map_err(|e| {
        DqError::configuration(format!("Failed to initialize schema validator: {}", e))
    })?;

    match &cli.command {
        Command::Assess(args) => run_assessment(args).await,
        Command::Rules => print_catalog(),
    }
}

/// Loads a document, assesses it and writes the report.
async fn run_assessment(args: &AssessArgs) -> Result<()> {
    info!("Input: {}", args.input.display());

    let text = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|e| DqError::io(format!("Failed to read {}", args.input.display()), e))?;

    let document = validate_and_parse_document(&text).map_err(|e| {
        error!("Document rejected: {}", e);
        DqError::configuration(format!("Invalid assessment document: {}", e))
    })?;

    info!(
        "Loaded {} rows x {} columns with {} rules",
        document.dataset.row_count(),
        document.dataset.column_count(),
        document.rules.len()
    );

    let cancel = Arc::new(AtomicBool::new(false));
    spawn_interrupt_handler(Arc::clone(&cancel));

    let analyzer = QualityAnalyzer::new(document.engine).with_cancellation(Arc::clone(&cancel));

    // Scoring is CPU-bound; keep it off the async workers
    let (report, clean) = {
        let dataset = document.dataset;
        let rules = document.rules;
        let want_clean = args.clean_output.is_some();
        tokio::task::spawn_blocking(move || -> Result<(AssessmentReport, Option<Dataset>)> {
            let report = analyzer.assess(&dataset, &rules)?;
            let clean = if want_clean {
                Some(analyzer.clean_dataset(&dataset, &rules, &report)?)
            } else {
                None
            };
            Ok((report, clean))
        })
        .await
        .map_err(|e| DqError::configuration(format!("Assessment task failed: {}", e)))??
    };

    log_scores(&report);

    let json = to_json(&report, args.pretty, "assessment report")?;
    match &args.output {
        Some(path) => {
            write_output(path, &json).await?;
            info!("✓ Report saved to {}", path.display());
        }
        None => println!("{}", json),
    }

    if let (Some(path), Some(clean)) = (&args.clean_output, clean) {
        let json = to_json(&clean, args.pretty, "clean dataset")?;
        write_output(path, &json).await?;
        info!(
            "✓ Clean dataset ({} rows) saved to {}",
            clean.row_count(),
            path.display()
        );
    }

    Ok(())
}

/// Sets the cancellation flag on Ctrl-C.
fn spawn_interrupt_handler(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling assessment");
            cancel.store(true, Ordering::Relaxed);
        }
    });
}

fn log_scores(report: &AssessmentReport) {
    for dimension in Dimension::ALL {
        match report.score(dimension) {
            DimensionScore::Evaluated(score) => info!("{}: {:.2}", dimension, score),
            DimensionScore::NotEvaluated => info!("{}: not evaluated", dimension),
        }
    }
    if let DimensionScore::Evaluated(score) = report.overall_score {
        info!("Overall: {:.2}", score);
    }
    info!(
        "{} issues, {} duplicate groups",
        report.issues.len(),
        report.duplicate_groups.len()
    );
}

fn print_catalog() -> Result<()> {
    let json = to_json(&catalog(), true, "rule catalog")?;
    println!("{}", json);
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool, context: &str) -> Result<String> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.map_err(|e| DqError::serialization(format!("Failed to serialize {}", context), e))
}

async fn write_output(path: &Path, json: &str) -> Result<()> {
    tokio::fs::write(path, json)
        .await
        .map_err(|e| DqError::io(format!("Failed to write to {}", path.display()), e))
}
