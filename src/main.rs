//! Flood Mapping Service - On-Demand Assessment
//!
//! Runs one flood assessment for a chosen date:
//! 1. Builds pre-event and event radar composites over the merged AOI
//! 2. Classifies flooded cells with the adaptive change-detection rules
//! 3. Aggregates pixel counts and areas for the AOI and every sub-region
//! 4. Optionally vectorizes the flood extent to a GeoJSON file
//!
//! Usage:
//!   cargo run --release -- --date 2024-09-12
//!   cargo run --release -- --date 2024-09-12 --region hcm --geojson flood.json
//!
//! Environment:
//!   FLOODMAP_TILE_URL - radar tile service base URL

use chrono::{NaiveDate, Utc};
use std::env;

use floodmap_service::aggregate;
use floodmap_service::config;
use floodmap_service::detect::detect_flood;
use floodmap_service::ingest::scenes::TileServiceClient;
use floodmap_service::model::{CatalogError, FloodParams};
use floodmap_service::timeseries::windows_for;

fn main() {
    println!("🌊 Flood Mapping Service");
    println!("========================\n");

    dotenv::dotenv().ok();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut date: Option<NaiveDate> = None;
    let mut region_id = "merged".to_string();
    let mut params = FloodParams::default();
    let mut geojson_path: Option<String> = None;
    let mut max_features = aggregate::DEFAULT_MAX_FEATURES;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--date" => {
                date = next_arg(&args, i, "--date")
                    .and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok());
                if date.is_none() {
                    eprintln!("Error: --date requires a YYYY-MM-DD value");
                    std::process::exit(1);
                }
                i += 2;
            }
            "--region" => {
                region_id = required_arg(&args, i, "--region");
                i += 2;
            }
            "--min-diff-db" => {
                params.min_diff_db = parse_num(&required_arg(&args, i, "--min-diff-db"));
                i += 2;
            }
            "--elev-max" => {
                params.elev_max_m = Some(parse_num(&required_arg(&args, i, "--elev-max")));
                i += 2;
            }
            "--no-elev-mask" => {
                params.elev_max_m = None;
                i += 1;
            }
            "--scale" => {
                params.scale_m = parse_num(&required_arg(&args, i, "--scale"));
                i += 2;
            }
            "--geojson" => {
                geojson_path = Some(required_arg(&args, i, "--geojson"));
                i += 2;
            }
            "--max-features" => {
                max_features = parse_num(&required_arg(&args, i, "--max-features")) as usize;
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!(
                    "Usage: {} [--date YYYY-MM-DD] [--region ID] [--min-diff-db X] \
                     [--elev-max M | --no-elev-mask] [--scale M] [--geojson PATH] \
                     [--max-features N]",
                    args[0]
                );
                std::process::exit(1);
            }
        }
    }

    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    // Load the AOI registry (panics on invalid configuration, by contract)
    let registry = config::load_regions();
    let region = match registry.find(&region_id) {
        Some(r) => r.clone(),
        None => {
            eprintln!("❌ Unknown region '{}'", region_id);
            std::process::exit(1);
        }
    };

    let catalog = match TileServiceClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Tile service configuration error: {}", e);
            std::process::exit(2);
        }
    };

    let (pre, event) = windows_for(date);
    println!("📡 Assessing {} over '{}'", date, region.name);
    println!(
        "   Pre window:   {} .. {}",
        pre.start,
        pre.end.pred_opt().unwrap_or(pre.end)
    );
    println!(
        "   Event window: {} .. {}\n",
        event.start,
        event.end.pred_opt().unwrap_or(event.end)
    );

    let assessment = match detect_flood(&catalog, &region, &pre, &event, &params) {
        Ok(a) => a,
        Err(e) => {
            report_backend_error(&e);
            std::process::exit(2);
        }
    };

    // Sub-regions only apply when assessing the merged AOI
    let sub_regions: Vec<_> = if region_id == "merged" {
        registry.sub_regions.clone()
    } else {
        Vec::new()
    };

    let result = aggregate::aggregate(&assessment, &region, &sub_regions, max_features);

    println!("📊 Flood extent");
    println!(
        "   {:12} {:>10} px  {:>10.2} km²",
        result.total.region_id, result.total.pixel_count, result.total.area_km2
    );
    for stat in &result.sub_stats {
        println!(
            "   {:12} {:>10} px  {:>10.2} km²",
            stat.region_id, stat.pixel_count, stat.area_km2
        );
    }

    if result.polygons.truncated {
        println!(
            "\n⚠️  Vector output truncated at {} features",
            result.polygons.features.len()
        );
    }

    if let Some(path) = geojson_path {
        let geojson = result.polygons.to_geojson();
        match serde_json::to_string_pretty(&geojson)
            .map_err(|e| e.to_string())
            .and_then(|body| std::fs::write(&path, body).map_err(|e| e.to_string()))
        {
            Ok(()) => println!("\n✓ Wrote {} flood polygons to {}", result.polygons.features.len(), path),
            Err(e) => {
                eprintln!("\n❌ Failed to write {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }
}

fn next_arg(args: &[String], i: usize, _flag: &str) -> Option<String> {
    args.get(i + 1).cloned()
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

fn parse_num(value: &str) -> f64 {
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Error: expected a number, got '{}'", value);
            std::process::exit(1);
        }
    }
}

fn report_backend_error(e: &CatalogError) {
    match e {
        CatalogError::Timeout(secs) => {
            eprintln!("❌ Tile service timed out after {}s", secs);
            eprintln!("   Retry later or raise the timeout");
        }
        other => eprintln!("❌ Tile service error: {}", other),
    }
}
