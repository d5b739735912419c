/// Flood classifier.
///
/// Combines a pre-event and an event composite with the mask library into a
/// binary flood raster:
///
/// 1. Build both composites over the same region and scale.
/// 2. delta = event − pre (signed dB difference).
/// 3. Adaptive water threshold = 10th percentile of the event composite
///    over the region (fallback −15 dB when no valid samples). This is a
///    deliberate coarse surrogate for a full Otsu threshold.
/// 4. water-in-event: event value ≤ threshold.
/// 5. flood-consistent drop: delta ≤ min_diff_db.
/// 6. flood = water AND drop.
/// 7. Suppress permanent water and, when a ceiling is set, high terrain.
/// 8. Self-mask (false cells become no-data), band "flood", clipped.
///
/// Every reduction in this chain resolves "no valid samples" to a typed
/// default, so classification runs over any date range, including ranges
/// with zero matching imagery, and returns a well-typed, possibly
/// degenerate, result.

use crate::catalog::SceneCatalog;
use crate::composite::build_composite;
use crate::masks::{elevation_mask, permanent_water_mask};
use crate::model::{
    BAND_FLOOD, CatalogError, FALLBACK_THRESHOLD_DB, FloodParams, TimeWindow,
    WATER_THRESHOLD_PERCENTILE,
};
use crate::raster::Raster;
use crate::regions::Region;

/// Output of one classifier run: the binary flood raster, the region it
/// was computed over, and the parameters used. Never mutated; consumed by
/// the region aggregator.
#[derive(Debug, Clone)]
pub struct FloodAssessment {
    pub flood: Raster,
    pub region_id: String,
    pub params: FloodParams,
}

/// Adaptive water threshold from the event composite alone.
///
/// Returns the fixed fallback when the region yields no valid samples,
/// never an error.
pub fn adaptive_water_threshold(event_db: &Raster, region: &Region) -> f64 {
    event_db
        .percentile(region, WATER_THRESHOLD_PERCENTILE)
        .unwrap_or(FALLBACK_THRESHOLD_DB)
}

/// Run the full classifier over `region`.
///
/// The pre-window must precede the event window without overlap; that is a
/// caller contract, asserted here once.
pub fn detect_flood(
    catalog: &dyn SceneCatalog,
    region: &Region,
    pre: &TimeWindow,
    event: &TimeWindow,
    params: &FloodParams,
) -> Result<FloodAssessment, CatalogError> {
    assert!(
        pre.precedes(event),
        "pre-window must precede the event window"
    );

    let pre_db = build_composite(catalog, region, pre, params.scale_m)?;
    let event_db = build_composite(catalog, region, event, params.scale_m)?;

    let delta = event_db.zip_with(&pre_db, "delta", |e, p| Some(e - p));

    let threshold = adaptive_water_threshold(&event_db, region);
    let water = event_db.lte("water", threshold);
    let drop = delta.lte("drop", params.min_diff_db);

    let mut flood = water.and(&drop, BAND_FLOOD);

    flood = flood.update_mask(&permanent_water_mask(catalog, region, params.scale_m)?.not());
    if let Some(ceiling) = params.elev_max_m {
        flood = flood.update_mask(&elevation_mask(catalog, region, ceiling, params.scale_m)?);
    }

    // False cells become no-data so reductions only ever see flood cells.
    let flood = flood.self_mask().rename(BAND_FLOOD);

    Ok(FloodAssessment {
        flood,
        region_id: region.id.clone(),
        params: params.clone(),
    })
}

/// Lighter classifier path for timeseries generation: same pipeline, but
/// only the super-region scalars come back: no vectorization, no
/// sub-region split.
pub fn detect_flood_stats_only(
    catalog: &dyn SceneCatalog,
    region: &Region,
    pre: &TimeWindow,
    event: &TimeWindow,
    params: &FloodParams,
) -> Result<(f64, u64), CatalogError> {
    let assessment = detect_flood(catalog, region, pre, event, params)?;
    let area_km2 = assessment.flood.area_km2(region);
    let pixel_count = assessment.flood.count(region);
    Ok((area_km2, pixel_count))
}
