use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use dock_balance::data::synthetic::{generate, SyntheticSpec};
use dock_balance::DateRange;
use std::path::{Path, PathBuf};

/// Generate a synthetic station and hire data set as JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Start date (YYYY-MM-DD)
    #[arg(short, long, default_value = "2016-06-06")]
    start: NaiveDate,

    /// End date (YYYY-MM-DD), exclusive
    #[arg(short, long, default_value = "2016-06-20")]
    end: NaiveDate,

    #[arg(long, default_value = "60")]
    stations: u32,

    #[arg(long, default_value = "2000")]
    hires_per_day: u32,

    /// Share of hires pointing at a station that does not exist
    #[arg(long, default_value = "0.001")]
    malformed_ratio: f64,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Directory receiving events.json and stations.json
    #[arg(short, long, default_value = "data")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let range = DateRange::new(args.start, args.end);
    anyhow::ensure!(range.is_ordered(), "start {} is after end {}", args.start, args.end);
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.malformed_ratio),
        "malformed ratio must be within [0, 1], got {}",
        args.malformed_ratio
    );

    let data = generate(&SyntheticSpec {
        station_count: args.stations,
        range,
        hires_per_day: args.hires_per_day,
        malformed_ratio: args.malformed_ratio,
        seed: args.seed,
    });

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    write_json(&args.out_dir.join("stations.json"), &data.stations)?;
    write_json(&args.out_dir.join("events.json"), &data.events)?;

    println!(
        "Wrote {} stations and {} hires for {} to {}",
        data.stations.len(),
        data.events.len(),
        range,
        args.out_dir.display()
    );
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
