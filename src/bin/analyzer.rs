use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use dock_balance::ingest::{IngestError, JsonFileSource, WarehouseClient};
use dock_balance::utils::config::SourceKind;
use dock_balance::utils::{init_from_config, PipelineMetrics};
use dock_balance::{
    analyze_source, AnalysisFailure, AnalysisOutcome, Config, Diagnostics, Granularity, SnapshotMode,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Find docking stations that run empty or full and plan bike transfers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to $CONFIG_FILE or config/analysis.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start date (YYYY-MM-DD)
    #[arg(short, long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), exclusive
    #[arg(short, long)]
    end: Option<NaiveDate>,

    #[arg(short, long, value_enum)]
    interval: Option<Granularity>,

    #[arg(long)]
    stress_threshold: Option<f64>,

    #[arg(long)]
    top_n: Option<usize>,

    #[arg(long, value_enum)]
    snapshot: Option<SnapshotMode>,

    /// Hire events file, overrides [source]
    #[arg(long)]
    events: Option<PathBuf>,

    /// Stations file, overrides [source]
    #[arg(long)]
    stations: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "analysis_report.json")]
    output: PathBuf,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Using built-in defaults: {e}");
            Config::default()
        }),
    };
    apply_overrides(&mut config, &args);

    init_from_config(&config.logging)?;
    info!(
        range = %config.analysis.date_range,
        interval = %config.analysis.interval,
        "Starting dock balance analysis"
    );

    let started = Instant::now();
    let outcome = if let Err(e) = config.analysis.validate() {
        AnalysisOutcome::failed(e.into(), Diagnostics::default())
    } else {
        fetch_and_analyze(&config).await?
    };
    let elapsed = started.elapsed();

    outcome.print_summary();

    let json = serde_json::to_string_pretty(&outcome)?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Report saved to: {}", args.output.display());

    if args.metrics || config.metrics.enabled {
        let metrics = PipelineMetrics::new()?;
        metrics.observe(&outcome, elapsed);
        println!("{}", metrics.render()?);
    }

    if let Some(failure) = outcome.failure {
        anyhow::bail!(failure);
    }
    Ok(())
}

async fn fetch_and_analyze(config: &Config) -> anyhow::Result<AnalysisOutcome> {
    let outcome = match config.source.kind {
        SourceKind::Files => {
            let source = JsonFileSource::new(&config.source.events_path, &config.source.stations_path);
            analyze_source(&source, &config.analysis)
        }
        SourceKind::Warehouse => {
            let client = WarehouseClient::new(
                &config.source.warehouse_url,
                Duration::from_secs(config.source.timeout_secs),
            )?;
            match client.snapshot(&config.analysis.date_range).await {
                Ok(snapshot) => analyze_source(&snapshot, &config.analysis),
                Err(e) => unavailable(e),
            }
        }
    };
    Ok(outcome)
}

fn unavailable(e: IngestError) -> AnalysisOutcome {
    warn!(error = %e, "Hire data unavailable");
    AnalysisOutcome::failed(AnalysisFailure::DataUnavailable(e.to_string()), Diagnostics::default())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    let analysis = &mut config.analysis;
    if let Some(start) = args.start {
        analysis.date_range.start = start;
    }
    if let Some(end) = args.end {
        analysis.date_range.end = end;
    }
    if let Some(interval) = args.interval {
        analysis.interval = interval;
    }
    if let Some(threshold) = args.stress_threshold {
        analysis.stress_threshold = threshold;
    }
    if let Some(top_n) = args.top_n {
        analysis.top_n = top_n;
    }
    if let Some(snapshot) = args.snapshot {
        analysis.planner.snapshot = snapshot;
    }
    if let Some(events) = &args.events {
        config.source.kind = SourceKind::Files;
        config.source.events_path = events.clone();
    }
    if let Some(stations) = &args.stations {
        config.source.kind = SourceKind::Files;
        config.source.stations_path = stations.clone();
    }
}
