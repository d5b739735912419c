/// Data catalog seam.
///
/// The pipeline never talks to the remote world directly: it goes through
/// `SceneCatalog` (radar scenes, water occurrence, terrain) and
/// `RainfallSource` (daily precipitation). The HTTP clients in `ingest`
/// implement these against the tile and precipitation services;
/// `MemoryCatalog` implements both over in-memory grids for tests and
/// offline runs.
///
/// A catalog is constructed once at process startup and passed to every
/// component; there is no hidden process-wide connection.

use chrono::NaiveDate;

use crate::model::{CatalogError, RainfallRecord, TimeWindow};
use crate::raster::Raster;
use crate::regions::Region;

/// Band label of raw radar scenes (linear power).
pub const BAND_POWER: &str = "power";

/// Band label of the water-occurrence grid (percent of observations wet).
pub const BAND_OCCURRENCE: &str = "occurrence";

/// Band label of the terrain elevation grid (metres).
pub const BAND_ELEVATION: &str = "elevation";

// ============================================================================
// Traits
// ============================================================================

/// Source of materialized raster grids for a region.
///
/// `radar_scenes` returns every single-polarization scene intersecting the
/// region inside the window, already filtered to the fixed acquisition mode
/// and orbit direction, as linear-power rasters on the region's grid. An
/// empty vector is a normal outcome, not an error.
pub trait SceneCatalog: Send + Sync {
    fn radar_scenes(
        &self,
        region: &Region,
        window: &TimeWindow,
        scale_m: f64,
    ) -> Result<Vec<Raster>, CatalogError>;

    fn water_occurrence(&self, region: &Region, scale_m: f64) -> Result<Raster, CatalogError>;

    fn elevation(&self, region: &Region, scale_m: f64) -> Result<Raster, CatalogError>;
}

/// Source of mean daily precipitation over a region, in mm per calendar day.
pub trait RainfallSource: Send + Sync {
    fn mean_daily_precipitation(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
        scale_m: f64,
    ) -> Result<Vec<RainfallRecord>, CatalogError>;
}

// ============================================================================
// In-memory catalog
// ============================================================================

/// Cell values for an in-memory grid: a constant, optionally with per-cell
/// overrides.
#[derive(Debug, Clone)]
pub enum GridFill {
    Constant(f64),
    Cells {
        default: f64,
        overrides: Vec<(usize, usize, f64)>,
    },
}

impl GridFill {
    pub fn to_raster(&self, region: &Region, scale_m: f64, band: &str) -> Raster {
        match self {
            GridFill::Constant(v) => Raster::constant(region, scale_m, band, *v),
            GridFill::Cells { default, overrides } => {
                Raster::from_fn(region, scale_m, band, |row, col| {
                    for &(r, c, v) in overrides {
                        if r == row && c == col {
                            return Some(v);
                        }
                    }
                    Some(*default)
                })
            }
        }
    }
}

/// One catalogued radar acquisition: a date and its linear-power field.
#[derive(Debug, Clone)]
pub struct SceneRecord {
    pub date: NaiveDate,
    pub power: GridFill,
}

/// Eager in-process catalog over locally-held grids.
///
/// This is both the test double and the offline evaluation backend: grids
/// live in memory and every reduction downstream runs eagerly against them.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    pub scenes: Vec<SceneRecord>,
    pub occurrence_pct: GridFill,
    pub elevation_m: GridFill,
    pub rainfall: Vec<RainfallRecord>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            scenes: Vec::new(),
            occurrence_pct: GridFill::Constant(0.0),
            elevation_m: GridFill::Constant(0.0),
            rainfall: Vec::new(),
        }
    }
}

impl MemoryCatalog {
    pub fn with_scene(mut self, date: NaiveDate, power: GridFill) -> Self {
        self.scenes.push(SceneRecord { date, power });
        self
    }

    pub fn with_occurrence(mut self, fill: GridFill) -> Self {
        self.occurrence_pct = fill;
        self
    }

    pub fn with_elevation(mut self, fill: GridFill) -> Self {
        self.elevation_m = fill;
        self
    }

    pub fn with_rainfall(mut self, rainfall: Vec<RainfallRecord>) -> Self {
        self.rainfall = rainfall;
        self
    }
}

impl SceneCatalog for MemoryCatalog {
    fn radar_scenes(
        &self,
        region: &Region,
        window: &TimeWindow,
        scale_m: f64,
    ) -> Result<Vec<Raster>, CatalogError> {
        Ok(self
            .scenes
            .iter()
            .filter(|s| window.contains(s.date))
            .map(|s| s.power.to_raster(region, scale_m, BAND_POWER))
            .collect())
    }

    fn water_occurrence(&self, region: &Region, scale_m: f64) -> Result<Raster, CatalogError> {
        Ok(self.occurrence_pct.to_raster(region, scale_m, BAND_OCCURRENCE))
    }

    fn elevation(&self, region: &Region, scale_m: f64) -> Result<Raster, CatalogError> {
        Ok(self.elevation_m.to_raster(region, scale_m, BAND_ELEVATION))
    }
}

impl RainfallSource for MemoryCatalog {
    fn mean_daily_precipitation(
        &self,
        _region: &Region,
        start: NaiveDate,
        end: NaiveDate,
        _scale_m: f64,
    ) -> Result<Vec<RainfallRecord>, CatalogError> {
        Ok(self
            .rainfall
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_scenes_filtered_by_window() {
        let catalog = MemoryCatalog::default()
            .with_scene(d("2024-01-01"), GridFill::Constant(0.01))
            .with_scene(d("2024-01-05"), GridFill::Constant(0.02))
            .with_scene(d("2024-02-01"), GridFill::Constant(0.03));

        let window = TimeWindow::new(d("2024-01-01"), d("2024-01-10"));
        let scenes = catalog.radar_scenes(&region(), &window, 100.0).unwrap();
        assert_eq!(scenes.len(), 2, "only scenes inside the window are selected");
    }

    #[test]
    fn test_empty_window_yields_empty_collection() {
        let catalog = MemoryCatalog::default();
        let window = TimeWindow::new(d("2024-01-01"), d("2024-01-10"));
        let scenes = catalog.radar_scenes(&region(), &window, 100.0).unwrap();
        assert!(scenes.is_empty(), "no scenes is a normal outcome, not an error");
    }

    #[test]
    fn test_grid_fill_overrides() {
        let fill = GridFill::Cells {
            default: 0.0,
            overrides: vec![(2, 3, 99.0)],
        };
        let r = fill.to_raster(&region(), 100.0, "x");
        assert_eq!(r.get(2, 3), Some(99.0));
        assert_eq!(r.get(2, 4), Some(0.0));
    }

    #[test]
    fn test_rainfall_span_filter() {
        let catalog = MemoryCatalog::default().with_rainfall(vec![
            RainfallRecord { date: d("2024-01-01"), rain_mm: 1.0 },
            RainfallRecord { date: d("2024-01-15"), rain_mm: 2.0 },
            RainfallRecord { date: d("2024-02-01"), rain_mm: 3.0 },
        ]);
        let out = catalog
            .mean_daily_precipitation(&region(), d("2024-01-01"), d("2024-01-31"), 5000.0)
            .unwrap();
        assert_eq!(out.len(), 2, "span is inclusive of both endpoints");
    }
}
