/// In-process raster grid.
///
/// Every raster is a dense 2-D field of f64 samples over a region's bounding
/// box, with a parallel validity mask ("no data" cells), a spatial scale in
/// metres, a band label, and the id of the region it was clipped to.
/// Evaluation is eager: rasters are materialized arrays, and reductions run
/// locally with an explicit "no valid samples" outcome at every call site.
///
/// Combining two rasters requires an identical grid, scale, and clip id.
/// That is a programmer invariant, not a runtime condition, and is asserted.

use crate::regions::Region;

/// Metres per degree of latitude (spherical approximation).
const METERS_PER_DEGREE: f64 = 111_320.0;

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// Georeferencing for a raster: a regular lon/lat grid derived from a
/// region's bounding box at a given scale. Row 0 is the southern edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub lon0: f64,
    pub lat0: f64,
    pub lon_step: f64,
    pub lat_step: f64,
    pub scale_m: f64,
}

impl Grid {
    /// Build the grid covering `region`'s bounding box at `scale_m` metres
    /// per cell. Cell steps are converted to degrees at the box's centre
    /// latitude.
    pub fn for_region(region: &Region, scale_m: f64) -> Self {
        let (min_lon, min_lat, max_lon, max_lat) = region.bounding_box();
        let center_lat = (min_lat + max_lat) / 2.0;

        let lat_step = scale_m / METERS_PER_DEGREE;
        let lon_step = scale_m / (METERS_PER_DEGREE * center_lat.to_radians().cos().max(1e-6));

        let rows = (((max_lat - min_lat) / lat_step).ceil() as usize).max(1);
        let cols = (((max_lon - min_lon) / lon_step).ceil() as usize).max(1);

        Self {
            rows,
            cols,
            lon0: min_lon,
            lat0: min_lat,
            lon_step,
            lat_step,
            scale_m,
        }
    }

    /// Centre coordinates of a cell.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.lon0 + (col as f64 + 0.5) * self.lon_step,
            self.lat0 + (row as f64 + 0.5) * self.lat_step,
        )
    }

    /// South-west corner of a cell, used when tracing vector boundaries.
    pub fn cell_corner(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.lon0 + col as f64 * self.lon_step,
            self.lat0 + row as f64 * self.lat_step,
        )
    }

    /// Geodesic cell area in km² for a given row (spherical,
    /// latitude-corrected: the width of a cell shrinks with cos(lat)).
    pub fn cell_area_km2(&self, row: usize) -> f64 {
        let (_, lat) = self.cell_center(row, 0);
        let width_m = self.lon_step * METERS_PER_DEGREE * lat.to_radians().cos();
        let height_m = self.lat_step * METERS_PER_DEGREE;
        (width_m * height_m) / 1e6
    }
}

// ---------------------------------------------------------------------------
// Raster
// ---------------------------------------------------------------------------

/// A band-labeled raster: values plus validity over a grid, clipped to one
/// region.
#[derive(Debug, Clone)]
pub struct Raster {
    pub grid: Grid,
    pub band: String,
    pub clip_id: String,
    values: Vec<f64>,
    valid: Vec<bool>,
}

impl Raster {
    /// Constant-valued raster clipped to `region`.
    pub fn constant(region: &Region, scale_m: f64, band: &str, value: f64) -> Self {
        Self::from_fn(region, scale_m, band, |_, _| Some(value))
    }

    /// Build a raster from a per-cell sampling function. Cells outside the
    /// region polygon, or where `f` yields `None`, are no-data.
    pub fn from_fn<F>(region: &Region, scale_m: f64, band: &str, f: F) -> Self
    where
        F: Fn(usize, usize) -> Option<f64>,
    {
        let grid = Grid::for_region(region, scale_m);
        let mut values = vec![0.0; grid.rows * grid.cols];
        let mut valid = vec![false; grid.rows * grid.cols];

        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let (lon, lat) = grid.cell_center(row, col);
                if !region.contains(lon, lat) {
                    continue;
                }
                if let Some(v) = f(row, col) {
                    let idx = row * grid.cols + col;
                    values[idx] = v;
                    valid[idx] = true;
                }
            }
        }

        Self {
            grid,
            band: band.to_string(),
            clip_id: region.id.clone(),
            values,
            valid,
        }
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.grid.cols + col
    }

    /// Value at a cell, or `None` for no-data.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let i = self.idx(row, col);
        if self.valid[i] { Some(self.values[i]) } else { None }
    }

    /// Count of valid cells over the whole raster.
    pub fn valid_count(&self) -> u64 {
        self.valid.iter().filter(|v| **v).count() as u64
    }

    fn assert_combinable(&self, other: &Raster) {
        assert_eq!(
            self.grid, other.grid,
            "rasters must share a grid to be combined"
        );
        assert_eq!(
            self.clip_id, other.clip_id,
            "rasters must share clip geometry to be combined"
        );
    }

    /// Elementwise transform; `None` results become no-data.
    pub fn map<F>(&self, band: &str, f: F) -> Raster
    where
        F: Fn(f64) -> Option<f64>,
    {
        let mut out = self.clone();
        out.band = band.to_string();
        for i in 0..out.values.len() {
            if out.valid[i] {
                match f(out.values[i]) {
                    Some(v) => out.values[i] = v,
                    None => out.valid[i] = false,
                }
            }
        }
        out
    }

    /// Elementwise combination of two rasters on the same grid. A cell is
    /// valid in the output only where both inputs are valid and `f` yields
    /// a value.
    pub fn zip_with<F>(&self, other: &Raster, band: &str, f: F) -> Raster
    where
        F: Fn(f64, f64) -> Option<f64>,
    {
        self.assert_combinable(other);
        let mut out = self.clone();
        out.band = band.to_string();
        for i in 0..out.values.len() {
            if self.valid[i] && other.valid[i] {
                match f(self.values[i], other.values[i]) {
                    Some(v) => {
                        out.values[i] = v;
                        out.valid[i] = true;
                    }
                    None => out.valid[i] = false,
                }
            } else {
                out.valid[i] = false;
            }
        }
        out
    }

    /// Per-cell median across a non-empty scene collection. A cell with no
    /// valid sample in any scene is no-data.
    pub fn median_of(scenes: &[Raster], band: &str) -> Raster {
        assert!(!scenes.is_empty(), "median_of requires at least one scene");
        let first = &scenes[0];
        for s in &scenes[1..] {
            first.assert_combinable(s);
        }

        let mut out = first.clone();
        out.band = band.to_string();
        let mut samples: Vec<f64> = Vec::with_capacity(scenes.len());

        for i in 0..out.values.len() {
            samples.clear();
            for s in scenes {
                if s.valid[i] {
                    samples.push(s.values[i]);
                }
            }
            if samples.is_empty() {
                out.valid[i] = false;
                continue;
            }
            samples.sort_by(|a, b| a.total_cmp(b));
            let n = samples.len();
            out.values[i] = if n % 2 == 1 {
                samples[n / 2]
            } else {
                (samples[n / 2 - 1] + samples[n / 2]) / 2.0
            };
            out.valid[i] = true;
        }
        out
    }

    /// 3×3 focal mean despeckle. Output cells keep the input validity mask;
    /// each valid cell becomes the mean of its valid neighbours (itself
    /// included).
    pub fn focal_mean3(&self) -> Raster {
        let mut out = self.clone();
        let rows = self.grid.rows as isize;
        let cols = self.grid.cols as isize;

        for row in 0..rows {
            for col in 0..cols {
                let i = (row * cols + col) as usize;
                if !self.valid[i] {
                    continue;
                }
                let mut sum = 0.0;
                let mut n = 0u32;
                for dr in -1..=1 {
                    for dc in -1..=1 {
                        let (r, c) = (row + dr, col + dc);
                        if r < 0 || r >= rows || c < 0 || c >= cols {
                            continue;
                        }
                        let j = (r * cols + c) as usize;
                        if self.valid[j] {
                            sum += self.values[j];
                            n += 1;
                        }
                    }
                }
                out.values[i] = sum / n as f64;
            }
        }
        out
    }

    /// Linear power to decibels: `10·log10(x)`. Non-positive power is
    /// no-data.
    pub fn to_db(&self, band: &str) -> Raster {
        self.map(band, |x| if x > 0.0 { Some(10.0 * x.log10()) } else { None })
    }

    /// Boolean raster (1.0 / 0.0) marking cells at or below `threshold`.
    pub fn lte(&self, band: &str, threshold: f64) -> Raster {
        self.map(band, |x| Some(if x <= threshold { 1.0 } else { 0.0 }))
    }

    /// Boolean complement on valid cells.
    pub fn not(&self) -> Raster {
        self.map(&self.band.clone(), |x| Some(if x == 0.0 { 1.0 } else { 0.0 }))
    }

    /// Pixel-wise logical AND of two boolean rasters.
    pub fn and(&self, other: &Raster, band: &str) -> Raster {
        self.zip_with(other, band, |a, b| {
            Some(if a != 0.0 && b != 0.0 { 1.0 } else { 0.0 })
        })
    }

    /// Keep only cells where `mask` is valid and non-zero; everything else
    /// becomes no-data.
    pub fn update_mask(&self, mask: &Raster) -> Raster {
        self.assert_combinable(mask);
        let mut out = self.clone();
        for i in 0..out.values.len() {
            if !(mask.valid[i] && mask.values[i] != 0.0) {
                out.valid[i] = false;
            }
        }
        out
    }

    /// Mask a raster by its own values: zero cells become no-data. Applied
    /// to a boolean raster this leaves only the `true` cells, which is what
    /// keeps downstream reductions from counting the `false` ones.
    pub fn self_mask(&self) -> Raster {
        let mut out = self.clone();
        for i in 0..out.values.len() {
            if out.valid[i] && out.values[i] == 0.0 {
                out.valid[i] = false;
            }
        }
        out
    }

    /// Relabel the band.
    pub fn rename(mut self, band: &str) -> Raster {
        self.band = band.to_string();
        self
    }

    // -----------------------------------------------------------------------
    // Reductions (restricted to a region; empty => None / 0)
    // -----------------------------------------------------------------------

    fn region_cells<'a>(&'a self, region: &'a Region) -> impl Iterator<Item = (usize, usize)> + 'a {
        (0..self.grid.rows).flat_map(move |row| {
            (0..self.grid.cols).filter_map(move |col| {
                let (lon, lat) = self.grid.cell_center(row, col);
                if region.contains(lon, lat) && self.valid[self.idx(row, col)] {
                    Some((row, col))
                } else {
                    None
                }
            })
        })
    }

    /// Count of valid cells inside `region`. Empty reductions yield 0.
    pub fn count(&self, region: &Region) -> u64 {
        self.region_cells(region).count() as u64
    }

    /// Sum of geodesic cell areas (km²) of valid cells inside `region`.
    /// Empty reductions yield 0.
    pub fn area_km2(&self, region: &Region) -> f64 {
        self.region_cells(region)
            .map(|(row, _)| self.grid.cell_area_km2(row))
            .sum()
    }

    /// Nearest-rank percentile of valid cell values inside `region`, or
    /// `None` when the region holds no valid samples. The caller resolves
    /// `None` to its documented fallback.
    pub fn percentile(&self, region: &Region, pct: f64) -> Option<f64> {
        let mut vals: Vec<f64> = self
            .region_cells(region)
            .map(|(row, col)| self.values[self.idx(row, col)])
            .collect();
        if vals.is_empty() {
            return None;
        }
        vals.sort_by(|a, b| a.total_cmp(b));
        let rank = ((pct / 100.0) * (vals.len() - 1) as f64).round() as usize;
        Some(vals[rank])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
