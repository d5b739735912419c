//! Timeseries Precompute - Batch Sweep
//!
//! Walks the historical schedule (default: 10 years back, one assessment
//! every 30 days) and persists the flood-extent timeseries to a JSON cache
//! consumed by the correlation tool. Windows that fail against the backend
//! are skipped and reported; the sweep itself keeps going.
//!
//! Usage:
//!   cargo run --release --bin precompute_timeseries
//!   cargo run --release --bin precompute_timeseries -- --years 5 --step-days 15
//!
//! Environment:
//!   FLOODMAP_TILE_URL - radar tile service base URL

use chrono::Utc;
use std::env;
use std::path::Path;
use std::sync::Arc;

use floodmap_service::catalog::SceneCatalog;
use floodmap_service::config;
use floodmap_service::ingest::scenes::TileServiceClient;
use floodmap_service::model::FloodParams;
use floodmap_service::timeseries::{self, TimeseriesOptions, WindowOutcome};

fn main() {
    println!("🌊 Flood Timeseries Precompute");
    println!("==============================\n");

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let mut opts = TimeseriesOptions::new(Utc::now().date_naive());
    let mut region_id = "merged".to_string();
    let mut out_path = "timeseries.json".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--years" => {
                opts.years = required_num(&args, i, "--years") as u32;
                i += 2;
            }
            "--step-days" => {
                opts.step_days = required_num(&args, i, "--step-days") as u32;
                i += 2;
            }
            "--workers" => {
                opts.workers = required_num(&args, i, "--workers") as usize;
                i += 2;
            }
            "--region" => {
                region_id = required_arg(&args, i, "--region");
                i += 2;
            }
            "--out" => {
                out_path = required_arg(&args, i, "--out");
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!(
                    "Usage: {} [--years N] [--step-days S] [--workers W] [--region ID] [--out PATH]",
                    args[0]
                );
                std::process::exit(1);
            }
        }
    }

    let registry = config::load_regions();
    let region = match registry.find(&region_id) {
        Some(r) => r.clone(),
        None => {
            eprintln!("❌ Unknown region '{}'", region_id);
            std::process::exit(1);
        }
    };

    let catalog: Arc<dyn SceneCatalog> = match TileServiceClient::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("❌ Tile service configuration error: {}", e);
            std::process::exit(2);
        }
    };

    let schedule = timeseries::schedule(&opts);
    println!(
        "📅 Sweeping {} windows over '{}' ({} years, {}-day step, {} workers)\n",
        schedule.len(),
        region.name,
        opts.years,
        opts.step_days,
        opts.workers
    );

    let outcomes = timeseries::generate(catalog, &region, &FloodParams::default(), &opts);

    let mut skipped = 0usize;
    for outcome in &outcomes {
        match outcome {
            WindowOutcome::Computed(rec) => {
                println!("   ✓ {}  {:>10.2} km²  ({} px)", rec.date, rec.area_km2, rec.pixel_count);
            }
            WindowOutcome::Skipped { date, reason } => {
                skipped += 1;
                eprintln!("   ✗ {}  skipped: {}", date, reason);
            }
        }
    }

    let records = timeseries::computed(outcomes);
    println!(
        "\n📊 Computed {} of {} windows ({} skipped)",
        records.len(),
        schedule.len(),
        skipped
    );

    if let Err(e) = timeseries::write_cache(Path::new(&out_path), &records) {
        eprintln!("❌ Failed to write {}: {}", out_path, e);
        std::process::exit(1);
    }
    println!("✓ Wrote timeseries cache to {}", out_path);
}

fn required_arg(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn required_num(args: &[String], i: usize, flag: &str) -> f64 {
    let raw = required_arg(args, i, flag);
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Error: {} expects a number, got '{}'", flag, raw);
            std::process::exit(1);
        }
    }
}
