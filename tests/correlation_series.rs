//! Cache persistence and rainfall correlation over a generated timeseries:
//! write/load round trips, cutoff filtering, exact-date joins, and the
//! cases where no coefficient exists.

use chrono::NaiveDate;

use floodmap_service::catalog::MemoryCatalog;
use floodmap_service::correlate::{correlate, filter_last_years, pearson};
use floodmap_service::model::{RainfallRecord, TimeseriesRecord};
use floodmap_service::regions::Region;
use floodmap_service::timeseries::{load_cache, write_cache};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn record(date: &str, area_km2: f64) -> TimeseriesRecord {
    let date = d(date);
    TimeseriesRecord {
        date,
        area_km2,
        pixel_count: (area_km2 * 1000.0) as u64,
        pre_start: date - chrono::Duration::days(7),
        pre_end: date - chrono::Duration::days(1),
        event_start: date,
        event_end: date + chrono::Duration::days(2),
    }
}

fn rain(date: &str, mm: f64) -> RainfallRecord {
    RainfallRecord { date: d(date), rain_mm: mm }
}

fn aoi() -> Region {
    Region {
        id: "merged".to_string(),
        name: "merged".to_string(),
        rings: vec![vec![(106.0, 10.0), (106.01, 10.0), (106.01, 10.01), (106.0, 10.01)]],
    }
}

fn temp_cache(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("floodmap_correlation_tests");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn test_cache_round_trip_sorts_and_keeps_duplicates() {
    let records = vec![
        record("2023-06-01", 12.0),
        record("2021-01-01", 3.0),
        record("2023-06-01", 12.5), // duplicate date from overlapping runs
    ];
    let path = temp_cache("round_trip.json");
    write_cache(&path, &records).unwrap();

    let loaded = load_cache(&path).unwrap();
    assert_eq!(loaded.len(), 3, "loading never deduplicates");
    assert_eq!(loaded[0].date, d("2021-01-01"));
    assert_eq!(loaded[1].date, d("2023-06-01"));
    assert_eq!(loaded[2].date, d("2023-06-01"));
    assert_eq!(loaded[1].pre_end, d("2023-05-31"), "window bounds survive the trip");
}

#[test]
fn test_cutoff_filter_then_correlate() {
    // Ten years of records; only the recent three correlate with rainfall.
    let records = vec![
        record("2014-01-01", 50.0), // should be cut
        record("2023-01-01", 1.0),
        record("2023-06-01", 2.0),
        record("2024-01-01", 3.0),
    ];
    let recent = filter_last_years(&records, 2);
    assert_eq!(recent.len(), 3, "the 2014 record falls outside the cutoff");

    let source = MemoryCatalog::default().with_rainfall(vec![
        rain("2023-01-01", 10.0),
        rain("2023-06-01", 20.0),
        rain("2024-01-01", 30.0),
        rain("2014-01-01", 500.0), // would dominate if the filter leaked
    ]);

    let result = correlate(&recent, &source, &aoi()).unwrap();
    assert_eq!(result.pairs.len(), 3);
    let r = result.coefficient.expect("three varying pairs have a coefficient");
    assert!((r - 1.0).abs() < 1e-9, "area tracks rainfall linearly, r = {}", r);
}

#[test]
fn test_duplicate_dates_double_count_in_the_join() {
    let records = vec![record("2024-01-01", 5.0), record("2024-01-01", 9.0)];
    let source = MemoryCatalog::default().with_rainfall(vec![rain("2024-01-01", 12.0)]);

    let result = correlate(&records, &source, &aoi()).unwrap();
    assert_eq!(result.pairs.len(), 2, "each duplicate record joins independently");
    assert!(result.pairs.iter().all(|p| p.rain_mm == 12.0));
}

#[test]
fn test_sparse_rainfall_joins_only_matching_dates() {
    let records = vec![
        record("2024-01-01", 1.0),
        record("2024-02-01", 2.0),
        record("2024-03-01", 3.0),
    ];
    // Rainfall series misses February entirely.
    let source = MemoryCatalog::default()
        .with_rainfall(vec![rain("2024-01-01", 5.0), rain("2024-03-01", 6.0)]);

    let result = correlate(&records, &source, &aoi()).unwrap();
    assert_eq!(result.pairs.len(), 2, "missing rainfall dates drop out of the join");
}

#[test]
fn test_no_coefficient_without_variance_or_pairs() {
    let flat = vec![record("2024-01-01", 7.0), record("2024-02-01", 7.0)];
    let source = MemoryCatalog::default()
        .with_rainfall(vec![rain("2024-01-01", 1.0), rain("2024-02-01", 2.0)]);
    let result = correlate(&flat, &source, &aoi()).unwrap();
    assert_eq!(result.pairs.len(), 2);
    assert_eq!(result.coefficient, None, "constant flood area has no coefficient");

    let lonely = vec![record("2024-01-01", 7.0)];
    let result = correlate(&lonely, &source, &aoi()).unwrap();
    assert_eq!(result.coefficient, None, "a single pair has no coefficient");

    let result = correlate(&[], &source, &aoi()).unwrap();
    assert!(result.pairs.is_empty());
    assert_eq!(result.coefficient, None);
}

#[test]
fn test_pearson_is_scale_invariant() {
    let records = vec![
        record("2024-01-01", 1.0),
        record("2024-02-01", 4.0),
        record("2024-03-01", 2.0),
        record("2024-04-01", 8.0),
    ];
    let source = MemoryCatalog::default().with_rainfall(vec![
        rain("2024-01-01", 10.0),
        rain("2024-02-01", 40.0),
        rain("2024-03-01", 20.0),
        rain("2024-04-01", 80.0),
    ]);
    let base = correlate(&records, &source, &aoi()).unwrap();

    let scaled: Vec<TimeseriesRecord> = records
        .iter()
        .map(|r| TimeseriesRecord { area_km2: r.area_km2 * 100.0, ..r.clone() })
        .collect();
    let scaled_result = correlate(&scaled, &source, &aoi()).unwrap();

    let a = base.coefficient.unwrap();
    let b = scaled_result.coefficient.unwrap();
    assert!((a - b).abs() < 1e-12, "Pearson r ignores linear scaling");
    assert_eq!(pearson(&base.pairs), base.coefficient);
}
