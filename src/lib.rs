/// floodmap_service: SAR-based flood extent mapping for the lower Mekong
/// provinces.
///
/// # Module structure
///
/// ```
/// floodmap_service
/// ├── model       — shared data types (TimeWindow, FloodParams, CatalogError, …)
/// ├── config      — region registry configuration loader (regions.toml)
/// ├── regions     — named polygon regions (merged AOI + provinces)
/// ├── raster      — eager in-process raster grid with no-data masking
/// ├── catalog     — SceneCatalog / RainfallSource traits + MemoryCatalog
/// ├── ingest
/// │   ├── scenes  — radar tile service: URL construction + JSON parsing
/// │   ├── chirps  — precipitation service client
/// │   └── fixtures (test only) — representative API response payloads
/// ├── composite   — linear-median → dB → focal-mean radar composites
/// ├── masks       — permanent water + terrain elevation suppression masks
/// ├── detect      — change-detection flood classifier
/// ├── aggregate   — per-region statistics + flood polygon vectorization
/// ├── timeseries  — N-year stepped sweep, JSON cache persistence
/// └── correlate   — rainfall alignment + Pearson correlation
/// ```

/// Public modules
pub mod aggregate;
pub mod catalog;
pub mod composite;
pub mod config;
pub mod correlate;
pub mod detect;
pub mod ingest;
pub mod masks;
pub mod model;
pub mod raster;
pub mod regions;
pub mod timeseries;
