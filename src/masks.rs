/// Static mask library.
///
/// Boolean rasters used to suppress false positives in the classifier:
/// permanent water (multi-decade occurrence frequency) and an optional
/// terrain elevation ceiling. Both are stateless producers combined by
/// logical masking, never summed into a probability.

use crate::catalog::SceneCatalog;
use crate::model::{CatalogError, PERMANENT_WATER_OCCURRENCE_PCT};
use crate::raster::Raster;
use crate::regions::Region;

/// Boolean raster: true (1.0) where the cell is water in at least 75% of
/// the historical record.
pub fn permanent_water_mask(
    catalog: &dyn SceneCatalog,
    region: &Region,
    scale_m: f64,
) -> Result<Raster, CatalogError> {
    let occurrence = catalog.water_occurrence(region, scale_m)?;
    Ok(occurrence.map("permanent_water", |pct| {
        Some(if pct >= PERMANENT_WATER_OCCURRENCE_PCT { 1.0 } else { 0.0 })
    }))
}

/// Boolean raster: true (1.0) where terrain elevation is at or below
/// `max_m`. Callers skip this mask entirely when no ceiling is set.
pub fn elevation_mask(
    catalog: &dyn SceneCatalog,
    region: &Region,
    max_m: f64,
    scale_m: f64,
) -> Result<Raster, CatalogError> {
    let elevation = catalog.elevation(region, scale_m)?;
    Ok(elevation.lte("low_terrain", max_m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GridFill, MemoryCatalog};

    fn region() -> Region {
        Region {
            id: "t".to_string(),
            name: "t".to_string(),
            rings: vec![vec![(106.0, 10.0), (106.01, 10.0), (106.01, 10.01), (106.0, 10.01)]],
        }
    }

    #[test]
    fn test_occurrence_cutoff_is_inclusive() {
        let catalog = MemoryCatalog::default().with_occurrence(GridFill::Cells {
            default: 74.9,
            overrides: vec![(1, 1, 75.0), (2, 2, 100.0)],
        });
        let mask = permanent_water_mask(&catalog, &region(), 100.0).unwrap();
        assert_eq!(mask.get(1, 1), Some(1.0), "exactly 75% counts as permanent water");
        assert_eq!(mask.get(2, 2), Some(1.0));
        assert_eq!(mask.get(3, 3), Some(0.0));
    }

    #[test]
    fn test_elevation_ceiling() {
        let catalog = MemoryCatalog::default().with_elevation(GridFill::Cells {
            default: 5.0,
            overrides: vec![(1, 1, 15.0), (2, 2, 15.1)],
        });
        let mask = elevation_mask(&catalog, &region(), 15.0, 100.0).unwrap();
        assert_eq!(mask.get(1, 1), Some(1.0), "ceiling is inclusive");
        assert_eq!(mask.get(2, 2), Some(0.0));
        assert_eq!(mask.get(3, 3), Some(1.0));
    }
}
