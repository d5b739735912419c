/// Radar tile service client.
///
/// Fetches pre-gridded rasters from the tile service: single-polarization
/// radar scenes (already filtered to the fixed acquisition mode and orbit
/// direction server-side), the multi-decade water-occurrence grid, and the
/// terrain elevation grid.
///
/// Wire format: every grid comes back as a flat row-major array of
/// nullable floats over the region's bounding-box grid at the requested
/// scale (row 0 = southern edge), so both sides derive identical geometry
/// from the region and scale alone. `null` cells are no-data.

use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

use crate::catalog::{BAND_ELEVATION, BAND_OCCURRENCE, BAND_POWER, SceneCatalog};
use crate::ingest::{DEFAULT_TIMEOUT_SECS, transport_error};
use crate::model::{CatalogError, TimeWindow};
use crate::raster::{Grid, Raster};
use crate::regions::Region;

/// Environment variable naming the tile service base URL.
pub const TILE_URL_ENV: &str = "FLOODMAP_TILE_URL";

// ============================================================================
// Tile service response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SceneListResponse {
    scenes: Vec<ScenePayload>,
}

#[derive(Debug, Deserialize)]
struct ScenePayload {
    date: NaiveDate,
    /// Linear power samples, row-major, `null` = no-data.
    power: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct GridResponse {
    values: Vec<Option<f64>>,
}

// ============================================================================
// Client
// ============================================================================

/// Blocking client for the tile service.
pub struct TileServiceClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl TileServiceClient {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Build the client from `FLOODMAP_TILE_URL`, honoring the
    /// `FLOODMAP_TIMEOUT_SECS` override.
    pub fn from_env() -> Result<Self, CatalogError> {
        let base = std::env::var(TILE_URL_ENV)
            .map_err(|_| CatalogError::Unavailable(format!("{} is not set", TILE_URL_ENV)))?;
        Self::with_timeout(&base, crate::ingest::timeout_from_env())
    }

    fn get_body(&self, url: &str) -> Result<String, CatalogError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http(status.as_u16()));
        }
        response
            .text()
            .map_err(|e| transport_error(e, self.timeout_secs))
    }

    fn grid_url(&self, endpoint: &str, region: &Region, scale_m: f64) -> String {
        let (min_lon, min_lat, max_lon, max_lat) = region.bounding_box();
        format!(
            "{}/{}?min_lon={}&min_lat={}&max_lon={}&max_lat={}&scale={}",
            self.base_url, endpoint, min_lon, min_lat, max_lon, max_lat, scale_m
        )
    }
}

impl SceneCatalog for TileServiceClient {
    fn radar_scenes(
        &self,
        region: &Region,
        window: &TimeWindow,
        scale_m: f64,
    ) -> Result<Vec<Raster>, CatalogError> {
        let url = format!(
            "{}&start={}&end={}",
            self.grid_url("scenes", region, scale_m),
            window.start,
            window.end
        );
        let body = self.get_body(&url)?;
        parse_scene_list(&body, region, scale_m)
    }

    fn water_occurrence(&self, region: &Region, scale_m: f64) -> Result<Raster, CatalogError> {
        let body = self.get_body(&self.grid_url("water_occurrence", region, scale_m))?;
        parse_grid(&body, region, scale_m, BAND_OCCURRENCE)
    }

    fn elevation(&self, region: &Region, scale_m: f64) -> Result<Raster, CatalogError> {
        let body = self.get_body(&self.grid_url("elevation", region, scale_m))?;
        parse_grid(&body, region, scale_m, BAND_ELEVATION)
    }
}

// ============================================================================
// Payload parsing
// ============================================================================

/// Parse a scene-list body into linear-power rasters on the region's grid.
/// An empty list is a normal result.
pub fn parse_scene_list(
    body: &str,
    region: &Region,
    scale_m: f64,
) -> Result<Vec<Raster>, CatalogError> {
    let parsed: SceneListResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;

    parsed
        .scenes
        .into_iter()
        .map(|scene| raster_from_values(&scene.power, region, scale_m, BAND_POWER))
        .collect()
}

/// Parse a single-grid body (occurrence or elevation).
pub fn parse_grid(
    body: &str,
    region: &Region,
    scale_m: f64,
    band: &str,
) -> Result<Raster, CatalogError> {
    let parsed: GridResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;
    raster_from_values(&parsed.values, region, scale_m, band)
}

fn raster_from_values(
    values: &[Option<f64>],
    region: &Region,
    scale_m: f64,
    band: &str,
) -> Result<Raster, CatalogError> {
    let grid = Grid::for_region(region, scale_m);
    let expected = grid.rows * grid.cols;
    if values.len() != expected {
        return Err(CatalogError::Parse(format!(
            "grid length mismatch: got {} cells, expected {}x{}={}",
            values.len(),
            grid.rows,
            grid.cols,
            expected
        )));
    }
    Ok(Raster::from_fn(region, scale_m, band, |row, col| {
        values[row * grid.cols + col]
    }))
}
