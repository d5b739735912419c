/// Region registry configuration loader - parses regions.toml
///
/// Separates AOI geometry from code, so boundaries can be re-exported or
/// adjusted without recompiling the service. The merged-superset invariant
/// is enforced here at load time; the pipeline itself never re-checks it.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::regions::{MERGED_REGION_ID, Region, RegionRegistry};

/// Region metadata loaded from the regions.toml configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    pub id: String,
    pub name: String,

    // One or more closed rings of [lon, lat] vertices
    pub rings: Vec<Vec<[f64; 2]>>,
}

/// Root configuration structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RegionFile {
    region: Vec<RegionConfig>,
}

impl From<&RegionConfig> for Region {
    fn from(config: &RegionConfig) -> Self {
        Region {
            id: config.id.clone(),
            name: config.name.clone(),
            rings: config
                .rings
                .iter()
                .map(|ring| ring.iter().map(|v| (v[0], v[1])).collect())
                .collect(),
        }
    }
}

/// Loads the region registry from regions.toml in the working directory.
///
/// # Panics
/// Panics if the configuration file is missing, malformed, lacks a `merged`
/// region, or contains a sub-region not covered by `merged`. This is
/// intentional: the service cannot operate without a valid AOI.
pub fn load_regions() -> RegionRegistry {
    load_regions_from("regions.toml")
}

/// Loads the region registry from an explicit path.
pub fn load_regions_from<P: AsRef<Path>>(path: P) -> RegionRegistry {
    let path = path.as_ref();

    let contents = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    let file: RegionFile = toml::from_str(&contents)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e));

    build_registry(&file.region)
        .unwrap_or_else(|e| panic!("Invalid region registry in {}: {}", path.display(), e))
}

/// Assembles and validates a registry from parsed region entries.
fn build_registry(entries: &[RegionConfig]) -> Result<RegionRegistry, String> {
    let mut merged: Option<Region> = None;
    let mut sub_regions: Vec<Region> = Vec::new();

    for entry in entries {
        if entry.id.is_empty() {
            return Err("region with empty id".to_string());
        }
        for ring in &entry.rings {
            if ring.len() < 3 {
                return Err(format!("region '{}' has a ring with < 3 vertices", entry.id));
            }
        }

        let region = Region::from(entry);
        if entry.id == MERGED_REGION_ID {
            if merged.is_some() {
                return Err("duplicate 'merged' region".to_string());
            }
            merged = Some(region);
        } else {
            sub_regions.push(region);
        }
    }

    let merged = merged.ok_or_else(|| "missing 'merged' super-region".to_string())?;

    for sub in &sub_regions {
        if !merged.contains_region(sub) {
            return Err(format!(
                "sub-region '{}' is not contained in the merged super-region",
                sub.id
            ));
        }
    }

    Ok(RegionRegistry { merged, sub_regions })
}
