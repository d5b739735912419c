//! Flood / Rainfall Correlation
//!
//! Loads the precomputed flood-extent cache, joins it with mean daily
//! precipitation over the merged AOI, and reports the Pearson coefficient
//! of the aligned series. A missing coefficient (too few aligned dates, or
//! a constant series) is reported as such, not as zero.
//!
//! Usage:
//!   cargo run --release --bin flood_rain_correlation
//!   cargo run --release --bin flood_rain_correlation -- --years 3 --out corr.json
//!
//! Environment:
//!   FLOODMAP_RAIN_URL - precipitation service base URL

use std::env;
use std::path::Path;

use floodmap_service::config;
use floodmap_service::correlate::{correlate, filter_last_years};
use floodmap_service::ingest::chirps::RainServiceClient;
use floodmap_service::timeseries::load_cache;

fn main() {
    println!("🌧️  Flood / Rainfall Correlation");
    println!("================================\n");

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let mut cache_path = "timeseries.json".to_string();
    let mut years: u32 = 0; // 0 = keep the full cache
    let mut out_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--cache" => {
                cache_path = required_arg(&args, i, "--cache");
                i += 2;
            }
            "--years" => {
                let raw = required_arg(&args, i, "--years");
                years = match raw.parse() {
                    Ok(v) => v,
                    Err(_) => {
                        eprintln!("Error: --years expects an integer, got '{}'", raw);
                        std::process::exit(1);
                    }
                };
                i += 2;
            }
            "--out" => {
                out_path = Some(required_arg(&args, i, "--out"));
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--cache PATH] [--years N] [--out PATH]", args[0]);
                std::process::exit(1);
            }
        }
    }

    let records = match load_cache(Path::new(&cache_path)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Failed to load cache {}: {}", cache_path, e);
            eprintln!("   Run the precompute_timeseries binary first");
            std::process::exit(1);
        }
    };
    println!("📂 Loaded {} flood records from {}", records.len(), cache_path);

    let records = filter_last_years(&records, years);
    if years > 0 {
        println!("   {} records within the last {} years", records.len(), years);
    }

    let registry = config::load_regions();
    let source = match RainServiceClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Precipitation service configuration error: {}", e);
            std::process::exit(2);
        }
    };

    let result = match correlate(&records, &source, &registry.merged) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Precipitation service error: {}", e);
            std::process::exit(2);
        }
    };

    println!("\n📊 Aligned {} flood/rain pairs", result.pairs.len());
    match result.coefficient {
        Some(r) => println!("   Pearson r = {:.4}", r),
        None => println!("   No correlation coefficient (need ≥ 2 pairs with variance)"),
    }

    if let Some(path) = out_path {
        match serde_json::to_string_pretty(&result)
            .map_err(|e| e.to_string())
            .and_then(|body| std::fs::write(&path, body).map_err(|e| e.to_string()))
        {
            Ok(()) => println!("✓ Wrote correlation result to {}", path),
            Err(e) => {
                eprintln!("❌ Failed to write {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }
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
