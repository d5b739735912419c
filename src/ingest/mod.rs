/// Remote data ingest.
///
/// Blocking HTTP clients for the two external services: the radar tile
/// service (scenes, water occurrence, terrain) and the precipitation
/// service. Both implement the catalog traits so the rest of the pipeline
/// never sees reqwest types, and both map transport failures onto
/// `CatalogError` in one place here.

pub mod chirps;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod scenes;

use crate::model::CatalogError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the per-request timeout for both clients.
pub const TIMEOUT_ENV: &str = "FLOODMAP_TIMEOUT_SECS";

/// Timeout from the environment, falling back to the default. An unparsable
/// value falls back too rather than failing startup.
pub(crate) fn timeout_from_env() -> u64 {
    std::env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

/// Classify a reqwest transport failure.
pub(crate) fn transport_error(err: reqwest::Error, timeout_secs: u64) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout(timeout_secs)
    } else if err.is_decode() {
        CatalogError::Parse(err.to_string())
    } else {
        CatalogError::Unavailable(err.to_string())
    }
}
