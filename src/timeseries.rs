/// Historical flood-extent timeseries.
///
/// Walks a fixed-step schedule of assessment dates back over N years and
/// runs the stats-only classifier for each date. Every window carries its
/// own outcome: a backend failure for one date skips that date and keeps
/// the sweep going, so one bad fetch never voids hours of computed points.
///
/// The persisted cache is a JSON array of records keyed by date, with the
/// inclusive window bounds stored alongside each point so cache files are
/// self-describing.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;

use chrono::{Duration, NaiveDate};
use threadpool::ThreadPool;

use crate::catalog::SceneCatalog;
use crate::detect::detect_flood_stats_only;
use crate::model::{FloodParams, TimeWindow, TimeseriesRecord};
use crate::regions::Region;

/// Default sweep depth in years.
pub const DEFAULT_YEARS: u32 = 10;

/// Default spacing between assessment dates, in days.
pub const DEFAULT_STEP_DAYS: u32 = 30;

/// Days before the assessment date at which the pre-event filter starts.
pub const PRE_WINDOW_DAYS: i64 = 7;

/// Days after the assessment date at which the event filter ends. The
/// bound is end-exclusive, so the event composite sees days d and d+1.
pub const EVENT_WINDOW_DAYS: i64 = 2;

/// Sweep configuration. `until` is the newest assessment date considered;
/// the sweep starts `365 * years` days before it.
#[derive(Debug, Clone)]
pub struct TimeseriesOptions {
    pub years: u32,
    pub step_days: u32,
    pub until: NaiveDate,
    pub workers: usize,
}

impl TimeseriesOptions {
    pub fn new(until: NaiveDate) -> Self {
        Self {
            years: DEFAULT_YEARS,
            step_days: DEFAULT_STEP_DAYS,
            until,
            workers: 4,
        }
    }
}

/// Outcome of one scheduled window. Skips are first-class results, not
/// errors: the caller decides whether a skip is worth logging or retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    Computed(TimeseriesRecord),
    Skipped { date: NaiveDate, reason: String },
}

/// The pre/event window pair anchored at one assessment date.
///
/// Bounds are end-exclusive scene filters: the pre composite covers days
/// d-7 through d-2, the event composite covers d and d+1.
pub fn windows_for(date: NaiveDate) -> (TimeWindow, TimeWindow) {
    let pre = TimeWindow::new(
        date - Duration::days(PRE_WINDOW_DAYS),
        date - Duration::days(1),
    );
    let event = TimeWindow::new(date, date + Duration::days(EVENT_WINDOW_DAYS));
    (pre, event)
}

/// Assessment dates for the sweep, oldest first. `years = 0` degenerates
/// to the single newest date.
pub fn schedule(opts: &TimeseriesOptions) -> Vec<NaiveDate> {
    let start = opts.until - Duration::days(365 * opts.years as i64);
    let step = Duration::days(opts.step_days.max(1) as i64);
    let mut dates = Vec::new();
    let mut d = start;
    while d <= opts.until {
        dates.push(d);
        d += step;
    }
    dates
}

/// Run the sweep. Windows are independent, so they fan out over a worker
/// pool; results come back sorted by assessment date regardless of
/// completion order.
pub fn generate(
    catalog: Arc<dyn SceneCatalog>,
    region: &Region,
    params: &FloodParams,
    opts: &TimeseriesOptions,
) -> Vec<WindowOutcome> {
    let dates = schedule(opts);
    if dates.is_empty() {
        return Vec::new();
    }

    let pool = ThreadPool::new(opts.workers.max(1));
    let (tx, rx) = mpsc::channel();

    for date in dates {
        let catalog = Arc::clone(&catalog);
        let region = region.clone();
        let params = params.clone();
        let tx = tx.clone();
        pool.execute(move || {
            let outcome = assess_window(catalog.as_ref(), &region, &params, date);
            let _ = tx.send(outcome);
        });
    }
    drop(tx);

    let mut outcomes: Vec<WindowOutcome> = rx.iter().collect();
    outcomes.sort_by_key(|o| match o {
        WindowOutcome::Computed(rec) => rec.date,
        WindowOutcome::Skipped { date, .. } => *date,
    });
    outcomes
}

fn assess_window(
    catalog: &dyn SceneCatalog,
    region: &Region,
    params: &FloodParams,
    date: NaiveDate,
) -> WindowOutcome {
    let (pre, event) = windows_for(date);
    match detect_flood_stats_only(catalog, region, &pre, &event, params) {
        Ok((area_km2, pixel_count)) => WindowOutcome::Computed(TimeseriesRecord {
            date,
            area_km2,
            pixel_count,
            // Cache fields carry the filter bounds unchanged.
            pre_start: pre.start,
            pre_end: pre.end,
            event_start: event.start,
            event_end: event.end,
        }),
        Err(e) => WindowOutcome::Skipped {
            date,
            reason: e.to_string(),
        },
    }
}

/// Computed records only, in date order. Convenience for callers that do
/// not report skips.
pub fn computed(outcomes: Vec<WindowOutcome>) -> Vec<TimeseriesRecord> {
    outcomes
        .into_iter()
        .filter_map(|o| match o {
            WindowOutcome::Computed(rec) => Some(rec),
            WindowOutcome::Skipped { .. } => None,
        })
        .collect()
}

// ============================================================================
// Cache persistence
// ============================================================================

/// Write the timeseries cache as a pretty-printed JSON array.
pub fn write_cache(path: &Path, records: &[TimeseriesRecord]) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a timeseries cache and sort it by date. Duplicate dates are kept
/// as-is; consumers that join on date will double-count them, which is the
/// documented behavior.
pub fn load_cache(path: &Path) -> Result<Vec<TimeseriesRecord>, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    let mut records: Vec<TimeseriesRecord> = serde_json::from_str(&raw)?;
    records.sort_by_key(|r| r.date);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GridFill, MemoryCatalog};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn region() -> Region {
        Region {
            id: "t".to_string(),
            name: "t".to_string(),
            rings: vec![vec![(106.0, 10.0), (106.01, 10.0), (106.01, 10.01), (106.0, 10.01)]],
        }
    }

    #[test]
    fn test_windows_are_adjacent_and_sized() {
        let (pre, event) = windows_for(d("2024-06-15"));
        assert_eq!(pre.start, d("2024-06-08"));
        assert_eq!(pre.end, d("2024-06-14"), "pre filter stops the day before the event date");
        assert_eq!(event.start, d("2024-06-15"));
        assert_eq!(event.end, d("2024-06-17"), "event filter bound is d+2, end-exclusive");
        assert!(pre.precedes(&event));
    }

    #[test]
    fn test_window_filters_exclude_boundary_days() {
        let (pre, event) = windows_for(d("2024-06-15"));
        assert!(pre.contains(d("2024-06-08")));
        assert!(pre.contains(d("2024-06-13")));
        assert!(!pre.contains(d("2024-06-14")), "day d-1 never reaches the pre composite");
        assert!(event.contains(d("2024-06-15")));
        assert!(event.contains(d("2024-06-16")));
        assert!(!event.contains(d("2024-06-17")), "day d+2 never reaches the event composite");
    }

    #[test]
    fn test_schedule_steps_from_years_back() {
        let opts = TimeseriesOptions {
            years: 1,
            step_days: 100,
            until: d("2024-12-31"),
            workers: 1,
        };
        let dates = schedule(&opts);
        assert_eq!(dates[0], d("2023-12-31"));
        assert_eq!(dates.len(), 4, "365 days at step 100 yields 4 dates");
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_schedule_zero_years_is_single_date() {
        let opts = TimeseriesOptions {
            years: 0,
            step_days: 30,
            until: d("2024-12-31"),
            workers: 1,
        };
        assert_eq!(schedule(&opts), vec![d("2024-12-31")]);
    }

    #[test]
    fn test_generate_sorts_by_date_and_records_window_bounds() {
        // One uniform drop event near the newest date; other windows see no
        // imagery and compute zero extent via the fallback composites.
        let catalog = MemoryCatalog::default()
            .with_scene(d("2024-12-20"), GridFill::Constant(0.1))
            .with_scene(d("2024-12-27"), GridFill::Constant(10f64.powf(-1.8)));
        let opts = TimeseriesOptions {
            years: 0,
            step_days: 30,
            until: d("2024-12-27"),
            workers: 2,
        };

        let params = FloodParams { elev_max_m: None, ..FloodParams::default() };
        let outcomes = generate(Arc::new(catalog), &region(), &params, &opts);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            WindowOutcome::Computed(rec) => {
                assert!(rec.area_km2 > 0.0, "the event window should detect flood");
                assert_eq!(rec.pre_start, d("2024-12-20"));
                assert_eq!(rec.pre_end, d("2024-12-26"), "cache keeps the filter bounds");
                assert_eq!(rec.event_end, d("2024-12-29"));
            }
            WindowOutcome::Skipped { reason, .. } => panic!("unexpected skip: {}", reason),
        }
    }

    #[test]
    fn test_generate_parallel_matches_schedule_order() {
        let catalog: Arc<dyn SceneCatalog> = Arc::new(MemoryCatalog::default());
        let opts = TimeseriesOptions {
            years: 1,
            step_days: 60,
            until: d("2024-12-31"),
            workers: 4,
        };
        let outcomes = generate(catalog, &region(), &FloodParams::default(), &opts);
        assert_eq!(outcomes.len(), schedule(&opts).len());
        let dates: Vec<NaiveDate> = outcomes
            .iter()
            .map(|o| match o {
                WindowOutcome::Computed(rec) => rec.date,
                WindowOutcome::Skipped { date, .. } => *date,
            })
            .collect();
        assert!(dates.windows(2).all(|w| w[0] <= w[1]), "results sorted by date");
    }

    #[test]
    fn test_cache_round_trip_preserves_duplicates() {
        let rec = |date: &str| TimeseriesRecord {
            date: d(date),
            area_km2: 1.0,
            pixel_count: 10,
            pre_start: d("2024-01-01"),
            pre_end: d("2024-01-07"),
            event_start: d("2024-01-08"),
            event_end: d("2024-01-10"),
        };
        let records = vec![rec("2024-03-01"), rec("2024-01-01"), rec("2024-03-01")];

        let dir = std::env::temp_dir().join("floodmap_ts_cache_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("timeseries.json");
        write_cache(&path, &records).unwrap();

        let loaded = load_cache(&path).unwrap();
        assert_eq!(loaded.len(), 3, "duplicate dates are never deduplicated");
        assert_eq!(loaded[0].date, d("2024-01-01"), "load sorts by date");
        assert_eq!(loaded[1].date, loaded[2].date);
    }
}
