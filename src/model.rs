/// Core data types for the SAR flood mapping service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types, constants, and the small invariants that
/// belong to them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pipeline constants
// ---------------------------------------------------------------------------

/// Backscatter value (dB) assumed when a time window matched no radar scenes.
pub const FALLBACK_COMPOSITE_DB: f64 = -20.0;

/// Water threshold (dB) used when the event composite has no valid samples.
pub const FALLBACK_THRESHOLD_DB: f64 = -15.0;

/// Water-occurrence frequency (percent) at or above which a cell is
/// considered permanent water.
pub const PERMANENT_WATER_OCCURRENCE_PCT: f64 = 75.0;

/// Percentile of the event composite used as the adaptive water threshold.
/// A deliberately coarse surrogate for a bimodal-histogram (Otsu) threshold.
pub const WATER_THRESHOLD_PERCENTILE: f64 = 10.0;

/// Band label carried by radar composites.
pub const BAND_SIGNAL: &str = "signal";

/// Band label carried by binary flood rasters.
pub const BAND_FLOOD: &str = "flood";

// ---------------------------------------------------------------------------
// Time windows
// ---------------------------------------------------------------------------

/// A half-open date interval `[start, end)`.
///
/// Used both for the pre-event baseline and the event observation window.
/// For a single flood assessment the pre-window must precede the event
/// window without overlap; `precedes` is how callers state that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True if `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// True if this window ends on or before `other` begins.
    pub fn precedes(&self, other: &TimeWindow) -> bool {
        self.end <= other.start
    }
}

// ---------------------------------------------------------------------------
// Classifier parameters
// ---------------------------------------------------------------------------

/// Thresholding parameters for one flood classification run.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodParams {
    /// Minimum decibel drop (event − pre) for a flood-consistent change.
    /// More negative = stricter.
    pub min_diff_db: f64,
    /// Elevation ceiling in metres; cells above it are never flood.
    /// `None` disables the elevation mask entirely.
    pub elev_max_m: Option<f64>,
    /// Spatial resolution in metres for composites and reductions.
    pub scale_m: f64,
}

impl Default for FloodParams {
    fn default() -> Self {
        Self {
            min_diff_db: -2.0,
            elev_max_m: Some(15.0),
            scale_m: 30.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation outputs
// ---------------------------------------------------------------------------

/// Flood extent statistics for one named region.
///
/// Both fields resolve to zero when a reduction sees no valid samples;
/// downstream code never observes null or NaN here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStat {
    pub region_id: String,
    pub pixel_count: u64,
    pub area_km2: f64,
}

// ---------------------------------------------------------------------------
// Timeseries records
// ---------------------------------------------------------------------------

/// One point of the persisted flood-extent timeseries.
///
/// Field names match the JSON cache produced by the precompute binary
/// (`date`, `area_km2`, `pixel_count`, plus the end-exclusive window
/// filter bounds),
/// so cache files are interchangeable across versions. Ordering key is
/// `date`; duplicate dates are tolerated by consumers, not rejected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesRecord {
    pub date: NaiveDate,
    pub area_km2: f64,
    pub pixel_count: u64,
    pub pre_start: NaiveDate,
    pub pre_end: NaiveDate,
    pub event_start: NaiveDate,
    pub event_end: NaiveDate,
}

/// Mean daily precipitation over the super-region, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallRecord {
    pub date: NaiveDate,
    pub rain_mm: f64,
}

// ---------------------------------------------------------------------------
// Correlation outputs
// ---------------------------------------------------------------------------

/// A flood record joined with the same-date rainfall entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPair {
    pub date: NaiveDate,
    pub rain_mm: f64,
    pub area_km2: f64,
}

/// Result of correlating the flood and rainfall series.
///
/// `coefficient` is `None` (an explicit absence, not an error and not
/// zero) when fewer than two aligned pairs exist or either series has
/// zero variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub pairs: Vec<AlignedPair>,
    pub coefficient: Option<f64>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching scene, terrain, or rainfall data
/// from a remote catalog.
///
/// An empty reduction is never represented here: absence of valid samples
/// resolves to a documented default at every reduction call site.
#[derive(Debug, PartialEq)]
pub enum CatalogError {
    /// Non-2xx HTTP response from the data service.
    Http(u16),
    /// The request did not complete within the configured timeout (seconds).
    Timeout(u64),
    /// The response body could not be deserialized or was inconsistent.
    Parse(String),
    /// The service could not be reached or rejected the connection.
    Unavailable(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Http(code) => write!(f, "HTTP error: {}", code),
            CatalogError::Timeout(secs) => write!(f, "Request timed out after {}s", secs),
            CatalogError::Parse(msg) => write!(f, "Parse error: {}", msg),
            CatalogError::Unavailable(msg) => write!(f, "Backend unavailable: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_window_half_open() {
        let w = TimeWindow::new(d("2024-01-01"), d("2024-01-04"));
        assert!(w.contains(d("2024-01-01")), "start is included");
        assert!(w.contains(d("2024-01-03")));
        assert!(!w.contains(d("2024-01-04")), "end is excluded");
    }

    #[test]
    fn test_window_precedes() {
        let pre = TimeWindow::new(d("2024-01-01"), d("2024-01-07"));
        let event = TimeWindow::new(d("2024-01-07"), d("2024-01-10"));
        assert!(pre.precedes(&event), "touching half-open windows do not overlap");
        assert!(!event.precedes(&pre));
    }

    #[test]
    fn test_default_params_match_documented_values() {
        let p = FloodParams::default();
        assert_eq!(p.min_diff_db, -2.0);
        assert_eq!(p.elev_max_m, Some(15.0));
        assert_eq!(p.scale_m, 30.0);
    }

    #[test]
    fn test_timeseries_record_json_field_names() {
        let rec = TimeseriesRecord {
            date: d("2024-01-01"),
            area_km2: 5.0,
            pixel_count: 42,
            pre_start: d("2023-12-25"),
            pre_end: d("2023-12-31"),
            event_start: d("2024-01-01"),
            event_end: d("2024-01-03"),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["area_km2"], 5.0);
        assert_eq!(json["pixel_count"], 42);
        assert_eq!(json["pre_start"], "2023-12-25");
        assert_eq!(json["event_end"], "2024-01-03");
    }

    #[test]
    fn test_catalog_error_display() {
        assert_eq!(CatalogError::Http(502).to_string(), "HTTP error: 502");
        assert!(CatalogError::Timeout(30).to_string().contains("30s"));
    }
}
