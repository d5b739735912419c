/// Rainfall alignment and correlation.
///
/// Joins the cached flood-extent timeseries with mean daily precipitation
/// on exact calendar dates and reports the Pearson coefficient over the
/// aligned pairs. A coefficient can legitimately not exist (too few pairs,
/// or a constant series); that case is `None`, never zero and never an
/// error.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::catalog::RainfallSource;
use crate::model::{AlignedPair, CatalogError, CorrelationResult, RainfallRecord, TimeseriesRecord};
use crate::regions::Region;

/// Spatial resolution (metres) for the precipitation reduction. Rainfall
/// grids are far coarser than radar, so this is intentionally loose.
pub const RAINFALL_SCALE_M: f64 = 5000.0;

/// Keep only records within the last `years` years of the newest record.
/// `years = 0` keeps everything; an empty input stays empty.
pub fn filter_last_years(records: &[TimeseriesRecord], years: u32) -> Vec<TimeseriesRecord> {
    if years == 0 || records.is_empty() {
        return records.to_vec();
    }
    let newest = match records.iter().map(|r| r.date).max() {
        Some(d) => d,
        None => return Vec::new(),
    };
    let cutoff = newest - Duration::days(365 * years as i64);
    records.iter().filter(|r| r.date >= cutoff).cloned().collect()
}

/// Exact-date join of flood records against a rainfall series.
///
/// Every flood record whose date has a rainfall entry yields one pair, in
/// flood-record order. Duplicate flood dates each join independently and
/// each contribute a pair; deduplication is deliberately not done here.
pub fn align(records: &[TimeseriesRecord], rainfall: &[RainfallRecord]) -> Vec<AlignedPair> {
    let by_date: HashMap<NaiveDate, f64> =
        rainfall.iter().map(|r| (r.date, r.rain_mm)).collect();

    records
        .iter()
        .filter_map(|rec| {
            by_date.get(&rec.date).map(|&rain_mm| AlignedPair {
                date: rec.date,
                rain_mm,
                area_km2: rec.area_km2,
            })
        })
        .collect()
}

/// Pearson correlation over aligned pairs. `None` with fewer than two
/// pairs or when either series has zero variance.
pub fn pearson(pairs: &[AlignedPair]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.rain_mm).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.area_km2).sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for p in pairs {
        let dx = p.rain_mm - mean_x;
        let dy = p.area_km2 - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Full correlation pass: fetch rainfall spanning the flood records, join
/// on date, and compute the coefficient. The span sent to the rainfall
/// source covers the records' date range inclusively.
pub fn correlate(
    records: &[TimeseriesRecord],
    source: &dyn RainfallSource,
    region: &Region,
) -> Result<CorrelationResult, CatalogError> {
    let (start, end) = match (
        records.iter().map(|r| r.date).min(),
        records.iter().map(|r| r.date).max(),
    ) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Ok(CorrelationResult {
                pairs: Vec::new(),
                coefficient: None,
            });
        }
    };

    let rainfall = source.mean_daily_precipitation(region, start, end, RAINFALL_SCALE_M)?;
    let pairs = align(records, &rainfall);
    let coefficient = pearson(&pairs);
    Ok(CorrelationResult { pairs, coefficient })
}
