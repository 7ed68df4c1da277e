//! Corrsight - automated exploratory analysis for CSV datasets
//!
//! A CLI tool that ranks the most correlated numeric column pairs,
//! asks a reasoning service to interpret them, renders scatter charts,
//! and writes a Markdown report.
//!
//! Exit codes:
//!   0 - Success (including runs that degraded past a failed request)
//!   1 - Runtime error (unreadable dataset, too few numeric columns, abort policy, etc.)
//!   130 - Cancelled by interrupt

mod analysis;
mod chart;
mod cli;
mod config;
mod dataset;
mod insight;
mod layout;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use models::InsightSection;
use pipeline::{Pipeline, PipelineError};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let Some(dataset) = args.dataset_path().map(Path::to_path_buf) else {
        println!("{}", Args::usage());
        return Ok(());
    };

    // Config is loaded before logging so its `verbose` setting applies
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("Corrsight v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {}", config_source);
    debug!("Dataset: {}", dataset.display());

    match run_analysis(&args, config, &dataset).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .corrsight.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, endpoint, retries, and charts.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete analysis workflow. Returns the process exit code.
async fn run_analysis(args: &Args, config: Config, dataset: &Path) -> Result<i32> {
    let start_time = Instant::now();

    if args.dry_run {
        return handle_dry_run(dataset);
    }

    if config.service.api_token.is_none() {
        warn!("No API token configured; requests will be sent without authorization");
    }

    println!("📊 Analyzing dataset: {}", dataset.display());
    println!("   Model: {}", config.service.model);
    println!("   Endpoint: {}", config.service.endpoint);
    println!("   Attempts per request: {}", config.service.retries.max(1));

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let pipeline = Pipeline::new(config, cancel)?.with_progress(!args.quiet);

    let outcome = match pipeline.run(dataset).await {
        Ok(outcome) => outcome,
        Err(PipelineError::Cancelled { stage }) => {
            eprintln!("\n⛔ Cancelled before {}. No report was written.", stage);
            return Ok(EXIT_CANCELLED);
        }
        Err(e) => return Err(e.into()),
    };

    let report = &outcome.report;
    let selection = &report.selection;

    println!("\n📈 Selected column pairs:");
    for pair in selection.pairs() {
        println!("   {}", pair);
    }
    if selection.second_max_corr_pair.is_none() {
        println!("   (no second pair with a distinct correlation)");
    }

    for chart in &report.charts {
        println!("   🖼  {}", chart.path.display());
    }
    for failure in &report.chart_failures {
        println!("   ⚠️  Chart for {} failed: {}", failure.pair, failure.error);
    }

    for section in [&report.judgment, &report.narrative] {
        if let InsightSection::Failed {
            operation,
            attempts,
            detail,
        } = section
        {
            println!(
                "   ⚠️  {} failed after {} attempt(s): {}",
                operation, attempts, detail
            );
        }
    }

    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());

    if outcome.is_degraded() {
        println!(
            "\n⚠️  Report saved with missing sections to: {}",
            outcome.report_path.display()
        );
    } else {
        println!(
            "\n✅ Analysis complete! Report saved to: {}",
            outcome.report_path.display()
        );
    }

    Ok(0)
}

/// Cancel the run on the first interrupt.
fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

/// Handle --dry-run: rank column pairs and print them, no service call or file write.
fn handle_dry_run(dataset: &Path) -> Result<i32> {
    println!("\n🔍 Dry run: ranking column pairs (no service call)...\n");

    let (data, selection) = pipeline::rank_dataset(dataset)?;

    println!("   Source: {}", data.source.display());
    println!(
        "   {} rows analyzed, {} dropped for missing values",
        data.row_count, data.dropped_rows
    );
    println!(
        "   Numeric columns: {}",
        data.numeric_column_names().join(", ")
    );

    println!("\n   Selected pairs:");
    for pair in selection.pairs() {
        println!("     {}", pair);
    }

    let summaries = serde_json::to_string_pretty(&selection.summaries)
        .context("Failed to serialize column summaries")?;
    println!(
        "\n   Column summaries ({}):\n{}",
        selection.summaries.column_names().join(", "),
        summaries
    );

    println!("\n✅ Dry run complete. No service calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is installed, so problems go straight to stderr.
/// Returns the config and a description of where it came from.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("loaded from {}", config_path.display())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, format!("loaded from {}", CONFIG_FILE_NAME))),
        Ok(None) => Ok((Config::default(), "no config file, using defaults".to_string())),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}. Using defaults.", e);
            Ok((Config::default(), "defaults after a config error".to_string()))
        }
    }
}
