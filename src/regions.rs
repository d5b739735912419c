/// AOI polygon registry.
///
/// Holds the immutable region boundaries the pipeline computes over: the
/// merged super-region plus the named sub-regions it contains. Geometry is
/// plain WGS84 lon/lat rings; containment tests use even-odd ray casting.

use std::collections::HashMap;

/// Stable identifier of the merged super-region.
pub const MERGED_REGION_ID: &str = "merged";

// ============================================================================
// Geometry
// ============================================================================

/// An immutable polygon (or multi-polygon) boundary with a stable id.
///
/// Rings are closed implicitly (last vertex connects back to the first) and
/// stored as `(lon, lat)` pairs in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl Region {
    /// Even-odd point-in-polygon test across all rings.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let mut inside = false;
        for ring in &self.rings {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            let mut j = n - 1;
            for i in 0..n {
                let (xi, yi) = ring[i];
                let (xj, yj) = ring[j];
                if (yi > lat) != (yj > lat)
                    && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi
                {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }

    /// Bounding box as (min_lon, min_lat, max_lon, max_lat).
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let mut min_lon = f64::INFINITY;
        let mut min_lat = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        for ring in &self.rings {
            for &(lon, lat) in ring {
                min_lon = min_lon.min(lon);
                min_lat = min_lat.min(lat);
                max_lon = max_lon.max(lon);
                max_lat = max_lat.max(lat);
            }
        }
        (min_lon, min_lat, max_lon, max_lat)
    }

    /// True if every vertex of `other` lies inside this region.
    ///
    /// Vertex containment is the load-time superset check for the merged
    /// region; the pipeline itself never re-asserts it.
    pub fn contains_region(&self, other: &Region) -> bool {
        other
            .rings
            .iter()
            .flatten()
            .all(|&(lon, lat)| self.contains(lon, lat))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The full AOI: one merged super-region plus its named sub-regions.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    pub merged: Region,
    pub sub_regions: Vec<Region>,
}

impl RegionRegistry {
    /// Look up any region (merged included) by id.
    pub fn find(&self, id: &str) -> Option<&Region> {
        if self.merged.id == id {
            return Some(&self.merged);
        }
        self.sub_regions.iter().find(|r| r.id == id)
    }

    /// Sub-regions keyed by id, for O(1) lookup during aggregation.
    pub fn sub_region_map(&self) -> HashMap<String, &Region> {
        self.sub_regions.iter().map(|r| (r.id.clone(), r)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
