/// Radar composite builder.
///
/// Turns the raw scene collection for one time window into a single
/// denoised decibel-scale raster clipped to the region.
///
/// Order matters here: the per-pixel median is taken in *linear power*
/// across scenes, the median is then converted to decibels, and the focal
/// mean runs last. Averaging in decibel space is not equivalent and must
/// not be substituted.

use crate::catalog::SceneCatalog;
use crate::model::{BAND_SIGNAL, CatalogError, FALLBACK_COMPOSITE_DB, TimeWindow};
use crate::raster::Raster;
use crate::regions::Region;

/// Build the denoised dB composite for `region` over `window`.
///
/// Zero matching scenes produces a constant fallback raster at −20 dB
/// rather than an error; callers never branch on "no data". The only
/// fallible step is the catalog fetch itself.
pub fn build_composite(
    catalog: &dyn SceneCatalog,
    region: &Region,
    window: &TimeWindow,
    scale_m: f64,
) -> Result<Raster, CatalogError> {
    let scenes = catalog.radar_scenes(region, window, scale_m)?;

    if scenes.is_empty() {
        return Ok(Raster::constant(region, scale_m, BAND_SIGNAL, FALLBACK_COMPOSITE_DB));
    }

    let median_linear = Raster::median_of(&scenes, BAND_SIGNAL);
    let db = median_linear.to_db(BAND_SIGNAL);
    Ok(db.focal_mean3())
}
