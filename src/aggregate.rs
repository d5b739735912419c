/// Region aggregation and vectorization.
///
/// Reduces a binary flood raster to scalar statistics (pixel count, area in
/// km²) over the assessment's own region and any number of named
/// sub-regions, and converts contiguous flood cells into a polygon set.
///
/// Sub-region statistics are computed independently of the top-level
/// statistics and of each other: they are issued concurrently and are not
/// required to sum to the top-level total (regions may be disjoint but are
/// not asserted to partition the super-region). That is documented
/// behavior, not a defect.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc;

use threadpool::ThreadPool;

use crate::detect::FloodAssessment;
use crate::model::RegionStat;
use crate::raster::Raster;
use crate::regions::Region;

/// Cap on the number of vector features, bounding response size. When the
/// cap bites, truncation keeps the first N components as yielded by the
/// connectivity scan; callers must not depend on any particular ordering.
pub const DEFAULT_MAX_FEATURES: usize = 10_000;

// ============================================================================
// Output types
// ============================================================================

/// One vectorized flood patch: closed lon/lat rings with a class label.
/// Exterior rings wind counter-clockwise, holes clockwise. Rings are
/// stored without the closing vertex; `to_geojson` repeats the first
/// position at the end as GeoJSON requires.
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    pub class: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

/// GeoJSON-equivalent collection of flood polygons.
#[derive(Debug, Clone, Default)]
pub struct PolygonSet {
    pub features: Vec<PolygonFeature>,
    /// True when the feature cap truncated the scan.
    pub truncated: bool,
}

impl PolygonSet {
    /// Render as a GeoJSON FeatureCollection value.
    pub fn to_geojson(&self) -> serde_json::Value {
        let features: Vec<serde_json::Value> = self
            .features
            .iter()
            .map(|f| {
                let rings: Vec<Vec<[f64; 2]>> = f
                    .rings
                    .iter()
                    .map(|ring| {
                        let mut coords: Vec<[f64; 2]> =
                            ring.iter().map(|&(lon, lat)| [lon, lat]).collect();
                        // RFC 7946 linear rings repeat the first position.
                        if let Some(&opening) = coords.first() {
                            coords.push(opening);
                        }
                        coords
                    })
                    .collect();
                serde_json::json!({
                    "type": "Feature",
                    "properties": { "class": f.class },
                    "geometry": { "type": "Polygon", "coordinates": rings },
                })
            })
            .collect();
        serde_json::json!({ "type": "FeatureCollection", "features": features })
    }
}

/// Full aggregation output for one assessment.
#[derive(Debug, Clone)]
pub struct AggregationResult {
    pub total: RegionStat,
    pub sub_stats: Vec<RegionStat>,
    pub polygons: PolygonSet,
}

// ============================================================================
// Scalar statistics
// ============================================================================

/// Pixel count and area for one region. Both reductions resolve empty to
/// zero, never null or NaN.
pub fn region_stat(flood: &Raster, region: &Region) -> RegionStat {
    RegionStat {
        region_id: region.id.clone(),
        pixel_count: flood.count(region),
        area_km2: flood.area_km2(region),
    }
}

/// Aggregate an assessment over its super-region and the given
/// sub-regions, plus vectorization of the flood extent.
///
/// The sub-region reductions are independent of each other and of the
/// top-level reduction, so they run concurrently on a bounded worker pool.
pub fn aggregate(
    assessment: &FloodAssessment,
    super_region: &Region,
    sub_regions: &[Region],
    max_features: usize,
) -> AggregationResult {
    let total = region_stat(&assessment.flood, super_region);
    let sub_stats = sub_region_stats(&assessment.flood, sub_regions);
    let polygons = vectorize(&assessment.flood, super_region, max_features);

    AggregationResult {
        total,
        sub_stats,
        polygons,
    }
}

/// Concurrent per-sub-region statistics, returned in input order.
pub fn sub_region_stats(flood: &Raster, sub_regions: &[Region]) -> Vec<RegionStat> {
    if sub_regions.is_empty() {
        return Vec::new();
    }

    let pool = ThreadPool::new(sub_regions.len().min(4).max(1));
    let shared = Arc::new(flood.clone());
    let (tx, rx) = mpsc::channel();

    for (idx, region) in sub_regions.iter().enumerate() {
        let flood = Arc::clone(&shared);
        let region = region.clone();
        let tx = tx.clone();
        pool.execute(move || {
            let stat = region_stat(&flood, &region);
            // Receiver outlives all workers; send cannot fail.
            let _ = tx.send((idx, stat));
        });
    }
    drop(tx);

    let mut collected: Vec<(usize, RegionStat)> = rx.iter().collect();
    collected.sort_by_key(|(idx, _)| *idx);
    collected.into_iter().map(|(_, stat)| stat).collect()
}

// ============================================================================
// Vectorization
// ============================================================================

/// Convert contiguous flood cells (8-connectivity) into polygons labeled
/// `class = "flood"`, restricted to `region`, capped at `max_features`.
pub fn vectorize(flood: &Raster, region: &Region, max_features: usize) -> PolygonSet {
    let grid = &flood.grid;
    let rows = grid.rows;
    let cols = grid.cols;

    // Flood membership restricted to the region boundary.
    let mut member = vec![false; rows * cols];
    for row in 0..rows {
        for col in 0..cols {
            if flood.get(row, col).is_some() {
                let (lon, lat) = grid.cell_center(row, col);
                member[row * cols + col] = region.contains(lon, lat);
            }
        }
    }

    let mut component = vec![usize::MAX; rows * cols];
    let mut features = Vec::new();
    let mut truncated = false;

    // Row-major connectivity scan; component discovery order is the only
    // ordering guarantee when the cap truncates.
    'scan: for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            if !member[idx] || component[idx] != usize::MAX {
                continue;
            }
            if features.len() >= max_features {
                truncated = true;
                break 'scan;
            }

            let id = features.len();
            let cells = flood_fill(&member, &mut component, rows, cols, row, col, id);
            features.push(PolygonFeature {
                class: "flood".to_string(),
                rings: trace_rings(&cells, &component, grid, id, cols),
            });
        }
    }

    PolygonSet { features, truncated }
}

/// 8-connected breadth-first labeling from a seed cell. Returns the cells
/// of the new component.
fn flood_fill(
    member: &[bool],
    component: &mut [usize],
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
    id: usize,
) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    let mut queue = VecDeque::new();
    component[row * cols + col] = id;
    queue.push_back((row, col));

    while let Some((r, c)) = queue.pop_front() {
        cells.push((r, c));
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let nr = r as i64 + dr;
                let nc = c as i64 + dc;
                if nr < 0 || nr >= rows as i64 || nc < 0 || nc >= cols as i64 {
                    continue;
                }
                let nidx = nr as usize * cols + nc as usize;
                if member[nidx] && component[nidx] == usize::MAX {
                    component[nidx] = id;
                    queue.push_back((nr as usize, nc as usize));
                }
            }
        }
    }
    cells
}

/// Trace the boundary of one component into closed rings.
///
/// Every cell side not shared with a 4-neighbour of the same component
/// contributes one directed edge between cell corners; chaining edges
/// end-to-start closes the rings. With 8-connectivity a corner-touching
/// pair belongs to one component but its rectangles only meet at a point,
/// so a single component may emit several rings.
fn trace_rings(
    cells: &[(usize, usize)],
    component: &[usize],
    grid: &crate::raster::Grid,
    id: usize,
    cols: usize,
) -> Vec<Vec<(f64, f64)>> {
    let same = |r: i64, c: i64| -> bool {
        if r < 0 || c < 0 || r as usize >= grid.rows || c as usize >= cols {
            return false;
        }
        component[r as usize * cols + c as usize] == id
    };

    // Directed edges between corner indices; counter-clockwise around the
    // component interior. BTreeMap keeps the walk order deterministic.
    let mut edges: BTreeMap<(usize, usize), Vec<(usize, usize)>> = BTreeMap::new();
    let mut push = |from: (usize, usize), to: (usize, usize)| {
        edges.entry(from).or_default().push(to);
    };

    for &(r, c) in cells {
        let (ri, ci) = (r as i64, c as i64);
        // Corner indices: (row, col) of the cell's south-west corner.
        let sw = (r, c);
        let se = (r, c + 1);
        let ne = (r + 1, c + 1);
        let nw = (r + 1, c);

        if !same(ri - 1, ci) {
            push(sw, se); // south side
        }
        if !same(ri, ci + 1) {
            push(se, ne); // east side
        }
        if !same(ri + 1, ci) {
            push(ne, nw); // north side
        }
        if !same(ri, ci - 1) {
            push(nw, sw); // west side
        }
    }

    let mut rings = Vec::new();
    loop {
        // Each ring starts at the lowest remaining corner.
        let (start, first) = match edges
            .iter_mut()
            .find(|(_, v)| !v.is_empty())
            .map(|(&k, v)| (k, v.remove(0)))
        {
            Some(found) => found,
            None => break,
        };

        let mut ring = vec![start];
        let mut prev = start;
        let mut current = first;
        while current != start {
            ring.push(current);
            match take_edge(&mut edges, current, step(prev, current)) {
                Some(next) => {
                    prev = current;
                    current = next;
                }
                None => break, // degenerate chain; emit what we have
            }
        }
        if ring.len() >= 3 {
            rings.push(
                ring.into_iter()
                    .map(|(row, col)| grid.cell_corner(row, col))
                    .collect(),
            );
        }
    }
    rings
}

/// Unit step between adjacent corners as (d_row, d_col).
fn step(from: (usize, usize), to: (usize, usize)) -> (i64, i64) {
    (to.0 as i64 - from.0 as i64, to.1 as i64 - from.1 as i64)
}

/// Take the outgoing edge at `corner`, preferring the left turn relative
/// to the incoming heading, then straight, then right. Counter-clockwise
/// rings keep the component interior on the left, so the left-turn
/// preference keeps two rings that only share a corner from being chained
/// into one self-intersecting figure.
fn take_edge(
    edges: &mut BTreeMap<(usize, usize), Vec<(usize, usize)>>,
    corner: (usize, usize),
    heading: (i64, i64),
) -> Option<(usize, usize)> {
    let candidates = edges.get_mut(&corner)?;
    let preferences = [
        (heading.1, -heading.0), // left
        heading,                 // straight
        (-heading.1, heading.0), // right
    ];
    for preference in preferences {
        if let Some(pos) = candidates
            .iter()
            .position(|&to| step(corner, to) == preference)
        {
            return Some(candidates.remove(pos));
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FloodParams;

    fn region() -> Region {
        Region {
            id: "t".to_string(),
            name: "t".to_string(),
            rings: vec![vec![(106.0, 10.0), (106.01, 10.0), (106.01, 10.01), (106.0, 10.01)]],
        }
    }

    fn flood_with_cells(cells: &[(usize, usize)]) -> Raster {
        let owned: Vec<(usize, usize)> = cells.to_vec();
        Raster::from_fn(&region(), 100.0, "flood", move |row, col| {
            if owned.contains(&(row, col)) { Some(1.0) } else { None }
        })
    }

    fn assessment(flood: Raster) -> FloodAssessment {
        FloodAssessment {
            flood,
            region_id: "t".to_string(),
            params: FloodParams::default(),
        }
    }

    #[test]
    fn test_stats_are_non_negative_even_when_empty() {
        let empty = Raster::from_fn(&region(), 100.0, "flood", |_, _| None);
        let stat = region_stat(&empty, &region());
        assert_eq!(stat.pixel_count, 0, "empty reduction resolves to 0, not null");
        assert_eq!(stat.area_km2, 0.0);
    }

    #[test]
    fn test_count_and_area_track_flood_cells() {
        let flood = flood_with_cells(&[(2, 2), (2, 3), (7, 7)]);
        let stat = region_stat(&flood, &region());
        assert_eq!(stat.pixel_count, 3);
        assert!(stat.area_km2 > 0.0);
    }

    #[test]
    fn test_sub_region_stats_are_independent() {
        // Two disjoint sub-squares inside the test region; the flood patch
        // sits in the first one only.
        let sub_a = Region {
            id: "a".to_string(),
            name: "a".to_string(),
            rings: vec![vec![(106.0, 10.0), (106.004, 10.0), (106.004, 10.004), (106.0, 10.004)]],
        };
        let sub_b = Region {
            id: "b".to_string(),
            name: "b".to_string(),
            rings: vec![vec![(106.006, 10.006), (106.009, 10.006), (106.009, 10.009), (106.006, 10.009)]],
        };

        let flood = flood_with_cells(&[(1, 1), (1, 2), (2, 1)]);
        let stats = sub_region_stats(&flood, &[sub_a, sub_b]);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].region_id, "a", "results keep input order");
        assert!(stats[0].pixel_count > 0);
        assert_eq!(stats[1].pixel_count, 0);
    }

    #[test]
    fn test_aggregate_returns_all_parts() {
        let flood = flood_with_cells(&[(3, 3), (3, 4)]);
        let result = aggregate(&assessment(flood), &region(), &[region()], DEFAULT_MAX_FEATURES);
        assert_eq!(result.total.pixel_count, 2);
        assert_eq!(result.sub_stats.len(), 1);
        assert_eq!(result.polygons.features.len(), 1);
    }

    #[test]
    fn test_vectorize_separates_disconnected_patches() {
        let flood = flood_with_cells(&[(2, 2), (2, 3), (8, 8)]);
        let set = vectorize(&flood, &region(), DEFAULT_MAX_FEATURES);
        assert_eq!(set.features.len(), 2);
        assert!(!set.truncated);
    }

    #[test]
    fn test_vectorize_eight_connectivity_joins_diagonals() {
        // Diagonal neighbours share a component under 8-connectivity.
        let flood = flood_with_cells(&[(2, 2), (3, 3)]);
        let set = vectorize(&flood, &region(), DEFAULT_MAX_FEATURES);
        assert_eq!(set.features.len(), 1, "diagonal cells are one component");
        assert_eq!(
            set.features[0].rings.len(),
            2,
            "corner-touching rectangles trace as two rings"
        );
    }

    #[test]
    fn test_vectorize_ring_is_closed_rectangle() {
        let flood = flood_with_cells(&[(2, 2)]);
        let set = vectorize(&flood, &region(), DEFAULT_MAX_FEATURES);
        let rings = &set.features[0].rings;
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4, "single cell traces its four corners");
    }

    #[test]
    fn test_feature_cap_truncates_scan() {
        let flood = flood_with_cells(&[(1, 1), (3, 3), (5, 5), (7, 7)]);
        let set = vectorize(&flood, &region(), 2);
        assert_eq!(set.features.len(), 2);
        assert!(set.truncated);
    }

    #[test]
    fn test_vectorize_ring_tracing_is_deterministic() {
        // A corner-touching pair has two outgoing edges at the shared
        // corner; the traced rings must stay separate, simple, and stable
        // across calls.
        let flood = flood_with_cells(&[(2, 2), (3, 3)]);
        for _ in 0..50 {
            let set = vectorize(&flood, &region(), DEFAULT_MAX_FEATURES);
            assert_eq!(set.features.len(), 1);
            let rings = &set.features[0].rings;
            assert_eq!(rings.len(), 2, "shared-corner squares never merge into one ring");
            for ring in rings {
                assert_eq!(ring.len(), 4);
                let mut vertices = ring.clone();
                vertices.sort_by(|a, b| a.partial_cmp(b).unwrap());
                vertices.dedup();
                assert_eq!(vertices.len(), ring.len(), "no vertex repeats within a ring");
            }
        }
    }

    #[test]
    fn test_geojson_shape() {
        let flood = flood_with_cells(&[(2, 2)]);
        let gj = vectorize(&flood, &region(), DEFAULT_MAX_FEATURES).to_geojson();
        assert_eq!(gj["type"], "FeatureCollection");
        assert_eq!(gj["features"][0]["properties"]["class"], "flood");
        assert_eq!(gj["features"][0]["geometry"]["type"], "Polygon");

        let ring = gj["features"][0]["geometry"]["coordinates"][0]
            .as_array()
            .unwrap();
        assert_eq!(ring.len(), 5, "serialized ring carries the closing vertex");
        assert_eq!(ring[0], ring[4], "ring closes on its first position");
    }
}
