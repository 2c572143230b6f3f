//! Asset category → work-intensity mapping.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::assets::{find_column, Asset};
use crate::error::{Error, Result, UnmappedAsset};

/// Bundled reference table, used when no override file is configured.
const BUNDLED_ASSET_MAP: &str = include_str!("../data/asset_map.csv");

/// Physical exertion bucket selecting which loss grid applies to an asset.
/// Ordering is low < moderate < high and drives output row grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkIntensity {
    Low,
    Moderate,
    High,
}

impl WorkIntensity {
    pub const ALL: [WorkIntensity; 3] = [WorkIntensity::Low, WorkIntensity::Moderate, WorkIntensity::High];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkIntensity::Low => "low",
            WorkIntensity::Moderate => "moderate",
            WorkIntensity::High => "high",
        }
    }
}

impl fmt::Display for WorkIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkIntensity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(WorkIntensity::Low),
            "moderate" | "medium" => Ok(WorkIntensity::Moderate),
            "high" => Ok(WorkIntensity::High),
            other => Err(format!("unknown work intensity '{other}'")),
        }
    }
}

/// What to do with assets whose category has no mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingPolicy {
    /// Abort the run listing every unmapped asset.
    #[default]
    FailFast,
    /// Drop unmapped assets from sampling and report them.
    ExcludeUnknown,
}

impl FromStr for MappingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "fail-fast" => Ok(MappingPolicy::FailFast),
            "exclude-unknown" => Ok(MappingPolicy::ExcludeUnknown),
            other => Err(format!("unknown mapping policy '{other}' (expected fail-fast or exclude-unknown)")),
        }
    }
}

/// Immutable category → intensity table.
#[derive(Debug, Clone, Default)]
pub struct IntensityMap {
    entries: HashMap<String, WorkIntensity>,
}

impl IntensityMap {
    /// The table shipped with the library.
    pub fn bundled() -> Result<Self> {
        Self::from_reader(BUNDLED_ASSET_MAP.as_bytes(), Path::new("<bundled asset_map.csv>"))
    }

    /// Load a table from a CSV file.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingInputFile { path: path.to_path_buf() });
        }
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let map = Self::from_reader(file, path)?;
        info!("Loaded {} category mappings from {}", map.len(), path.display());
        Ok(map)
    }

    /// Parse a `asset_type,intensity` table. `path` names the source in errors.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = rdr.headers().map_err(|e| Error::csv(path, e))?.clone();
        let cat_col = find_column(&headers, &["asset_type", "category", "premise_type"]);
        let int_col = find_column(&headers, &["intensity", "work_intensity"]);
        let (Some(cat_col), Some(int_col)) = (cat_col, int_col) else {
            return Err(Error::schema(path, "mapping table needs asset_type and intensity columns"));
        };

        let mut entries: HashMap<String, WorkIntensity> = HashMap::new();
        let mut bad = Vec::new();
        let mut conflicts = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| Error::csv(path, e))?;
            let category = record.get(cat_col).unwrap_or("");
            let raw = record.get(int_col).unwrap_or("");
            if category.is_empty() {
                continue;
            }
            match raw.parse::<WorkIntensity>() {
                // First entry for a category wins, as with assets.
                Ok(w) => match entries.get(category) {
                    Some(&first) if first != w => conflicts.push(format!("{category} ({first}, not {w})")),
                    Some(_) => {}
                    None => {
                        entries.insert(category.to_string(), w);
                    }
                },
                Err(_) => bad.push(format!("{category} ('{raw}')")),
            }
        }
        if !bad.is_empty() {
            return Err(Error::schema(path, format!("invalid intensity for {}", bad.join(", "))));
        }
        if !conflicts.is_empty() {
            warn!(
                "{}: conflicting intensities, keeping the first listed: {}",
                path.display(),
                conflicts.join(", ")
            );
        }
        Ok(Self { entries })
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, WorkIntensity)>,
        S: Into<String>,
    {
        Self { entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }

    pub fn get(&self, category: &str) -> Option<WorkIntensity> {
        self.entries.get(category.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An asset with its resolved work intensity.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedAsset {
    pub asset: Asset,
    pub work_intensity: WorkIntensity,
}

/// Result of mapping a batch of assets.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub assets: Vec<MappedAsset>,
    /// Assets dropped under [`MappingPolicy::ExcludeUnknown`].
    pub excluded: Vec<UnmappedAsset>,
}

/// Resolve every asset's intensity. Input order is preserved.
pub fn map_assets(assets: Vec<Asset>, map: &IntensityMap, policy: MappingPolicy) -> Result<Mapping> {
    let mut out = Mapping::default();
    for asset in assets {
        match map.get(&asset.category) {
            Some(work_intensity) => out.assets.push(MappedAsset { asset, work_intensity }),
            None => out.excluded.push(UnmappedAsset {
                asset_id: asset.asset_id,
                category: asset.category,
            }),
        }
    }
    if !out.excluded.is_empty() {
        match policy {
            MappingPolicy::FailFast => return Err(Error::Mapping { unmapped: out.excluded }),
            MappingPolicy::ExcludeUnknown => {
                for u in &out.excluded {
                    warn!("Excluding asset {}: no work intensity for category '{}'", u.asset_id, u.category);
                }
            }
        }
    }
    Ok(out)
}
