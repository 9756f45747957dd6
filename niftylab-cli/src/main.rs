//! NiftyLab CLI: consolidate, summarize and inspect the daily index series.
//!
//! Commands:
//! - `update` fetches archive, live and volatility data, then publishes the
//!   daily and yearly files
//! - `yearly` recomputes the yearly summary from a published daily file
//! - `status` reports on a published daily file
//! - `vix` runs the volatility chain on its own

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use niftylab_core::analytics::{aggregate_yearly, YearlyReport};
use niftylab_core::data::{CircuitBreaker, CsvArchive, SourceProvider};
use niftylab_runner::export::{format_tail, write_yearly_csv};
use niftylab_runner::{
    live_provider, read_daily_csv, run_pipeline, volatility_chain, Manifest, PipelineConfig,
    Publisher, Sources,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "niftylab.toml";

#[derive(Parser)]
#[command(
    name = "niftylab",
    about = "NiftyLab: NIFTY 50 daily series consolidation and yearly statistics"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./niftylab.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all sources, consolidate, and publish daily and yearly files.
    Update {
        /// Archive CSV path (overrides the config file).
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Output directory (overrides the config file).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Offline mode: skip the live feed and the volatility page.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Skip volatility retrieval; the column is still written, empty.
        #[arg(long, default_value_t = false)]
        no_volatility: bool,

        /// Also write a Parquet mirror of the daily file.
        #[arg(long, default_value_t = false)]
        parquet: bool,
    },
    /// Recompute the yearly summary from a published daily file.
    Yearly {
        /// Daily CSV to read. Defaults to the configured daily file.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Yearly CSV to write. Defaults to the configured yearly file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print row count, date range, volatility coverage and yearly table.
    Status {
        /// Daily CSV to read. Defaults to the configured daily file.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run the volatility chain alone and report which stage resolved it.
    Vix {
        /// Only consult the local fallback file.
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
}

/// `RUST_LOG` when set, otherwise info-level output from the niftylab crates.
fn log_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
}

const DEFAULT_LOG_FILTER: &str = "niftylab=info";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Update {
            archive,
            output_dir,
            offline,
            no_volatility,
            parquet,
        } => run_update(config, archive, output_dir, offline, no_volatility, parquet),
        Commands::Yearly { input, output } => run_yearly(&config, input, output),
        Commands::Status { input } => run_status(&config, input),
        Commands::Vix { offline } => run_vix(&config, offline),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            Ok(PipelineConfig::from_file(Path::new(DEFAULT_CONFIG))?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn run_update(
    mut config: PipelineConfig,
    archive: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    offline: bool,
    no_volatility: bool,
    parquet: bool,
) -> Result<()> {
    if let Some(path) = archive {
        config.archive.path = path;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    if no_volatility {
        config.volatility.enabled = false;
    }
    config.output.parquet |= parquet;
    config.validate()?;
    tracing::info!(archive = %config.archive.path.display(), offline, "starting update");

    let archive = CsvArchive::new(&config.archive.path);
    if !archive.is_available() {
        bail!("archive file not found: {}", config.archive.path.display());
    }

    let live = if offline || !config.live.enabled {
        None
    } else {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        Some(live_provider(&config, breaker)?)
    };

    let today = chrono::Local::now().date_naive();
    let chain = config
        .volatility
        .enabled
        .then(|| volatility_chain(&config.volatility, offline, today));

    let run = run_pipeline(
        &config,
        Sources {
            archive: &archive,
            live: live.as_ref().map(|p| p as &dyn SourceProvider),
            volatility: chain.as_ref(),
        },
    )?;

    let published = Publisher::from_config(&config).publish(&run)?;

    println!("{}", format_tail(&run.series, 5, &config.volatility.column));
    println!(
        "Rows: {} ({} archive, {} live, {} duplicates removed, {} dropped)",
        run.series.len(),
        run.archive_rows,
        run.live_rows,
        run.merge.duplicates_removed,
        run.merge.coercion_drops.len()
    );
    match &run.volatility.resolved_by {
        Some(stage) => println!(
            "Volatility: {} via {stage} ({} rows matched)",
            config.volatility.column,
            run.series.volatility_coverage()
        ),
        None => println!("Volatility: unavailable, column left empty"),
    }
    for skipped in &run.yearly.skipped {
        println!("Skipped year {}: {}", skipped.year, skipped.reason);
    }
    for path in &published.paths {
        println!("Wrote {}", path.display());
    }
    if published.hook_failures > 0 {
        eprintln!("{} publish command(s) failed", published.hook_failures);
    }

    Ok(())
}

fn run_yearly(config: &PipelineConfig, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| config.output.daily_path());
    let output = output.unwrap_or_else(|| config.output.yearly_path());

    let daily = read_daily_csv(&input).with_context(|| format!("reading {}", input.display()))?;
    let report = aggregate_yearly(&daily.series)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&output)
        .with_context(|| format!("creating {}", output.display()))?;
    write_yearly_csv(std::io::BufWriter::new(file), &report)?;

    print_yearly(&report);
    println!("Wrote {} years to {}", report.metrics.len(), output.display());
    Ok(())
}

fn run_status(config: &PipelineConfig, input: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| config.output.daily_path());
    if !input.is_file() {
        println!("Daily file does not exist: {}", input.display());
        return Ok(());
    }

    let daily = read_daily_csv(&input).with_context(|| format!("reading {}", input.display()))?;
    let series = &daily.series;
    let column = daily.volatility_column.as_deref().unwrap_or("-");

    println!("File:       {}", input.display());
    println!("Rows:       {}", series.len());
    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        println!("Range:      {first} to {last}");
    }
    println!("Volume:     {}", if series.has_volume() { "yes" } else { "no" });
    println!(
        "Volatility: {column}, {} of {} rows",
        series.volatility_coverage(),
        series.len()
    );

    let manifest_path = input.with_file_name("manifest.json");
    if manifest_path.is_file() {
        let manifest = Manifest::from_file(&manifest_path)?;
        println!("Published:  {}", manifest.generated_at.format("%Y-%m-%d %H:%M:%S"));
        for file in &manifest.files {
            println!("            {} blake3:{}", file.name, &file.blake3[..16.min(file.blake3.len())]);
        }
    }

    println!();
    print_yearly(&aggregate_yearly(series)?);
    Ok(())
}

fn run_vix(config: &PipelineConfig, offline: bool) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let chain = volatility_chain(&config.volatility, offline, today);
    println!("Strategies: {}", chain.strategy_names().join(" -> "));

    let outcome = chain.resolve();
    for (stage, err) in &outcome.failures {
        println!("  {stage}: {err}");
    }
    match (&outcome.resolved_by, outcome.points.last()) {
        (Some(stage), Some(point)) => println!(
            "Resolved by {stage}: {} points, latest {} = {:.2}",
            outcome.points.len(),
            point.date,
            point.index_value
        ),
        _ => println!("Volatility unavailable"),
    }
    Ok(())
}

fn print_yearly(report: &YearlyReport) {
    println!(
        "{:>6} {:>10} {:>10} {:>10} {:>10} {:>9} {:>10} {:>9}",
        "Year", "Start", "End", "High", "Low", "Return%", "Points", "Mid%"
    );
    for m in &report.metrics {
        println!(
            "{:>6} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>9.2} {:>10.2} {:>9.2}",
            m.year,
            m.start_close,
            m.end_close,
            m.high,
            m.low,
            m.return_pct,
            m.points_change,
            m.start_mid_pct
        );
    }
    for skipped in &report.skipped {
        println!("{:>6} skipped: {}", skipped.year, skipped.reason);
    }
}
