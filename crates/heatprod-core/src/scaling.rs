//! Air-conditioning scaling: discount statistics by (1 − penetration).
//!
//! Penetration is looked up once per asset and applied to that asset's rows
//! by id. Rows whose asset has no penetration value pass through unscaled
//! and are flagged; a missing value is never read as zero.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::grid::AcGrid;
use crate::intensity::MappedAsset;
use crate::scenario::Scenario;
use crate::table::{round_stat, LongTable, SampleRow};

/// One scaled output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledRow {
    pub asset_id: String,
    pub scenario: Scenario,
    pub year: i32,
    pub median: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub ac_penetration: Option<f64>,
    pub ac_scaled: bool,
}

impl ScaledRow {
    fn from_sample(row: &SampleRow, penetration: Option<f64>) -> Self {
        let scale = |v: Option<f64>| match penetration {
            Some(p) => v.map(|v| round_stat(v * (1.0 - p))),
            None => v,
        };
        Self {
            asset_id: row.asset_id.clone(),
            scenario: row.scenario,
            year: row.year,
            median: scale(row.median),
            minimum: scale(row.minimum),
            maximum: scale(row.maximum),
            ac_penetration: penetration,
            ac_scaled: penetration.is_some(),
        }
    }
}

/// Per-asset penetration values for one run.
#[derive(Debug, Clone, Default)]
pub struct AcLookup {
    by_asset: HashMap<String, Option<f64>>,
}

impl AcLookup {
    /// Look up every asset's penetration against `grid`.
    pub fn build(grid: &AcGrid, assets: &[MappedAsset]) -> Self {
        let by_asset: HashMap<String, Option<f64>> = assets
            .iter()
            .map(|a| {
                let p = grid.penetration(a.asset.location);
                if p.is_none() {
                    debug!("No AC penetration for asset {} at {:?}", a.asset.asset_id, a.asset.location);
                }
                (a.asset.asset_id.clone(), p)
            })
            .collect();
        let lookup = Self { by_asset };
        let uncovered = lookup.uncovered();
        if uncovered > 0 {
            warn!("{uncovered} of {} assets have no AC penetration value; their rows stay unscaled", lookup.len());
        }
        lookup
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<f64>)>,
        S: Into<String>,
    {
        Self { by_asset: entries.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }

    pub fn get(&self, asset_id: &str) -> Option<f64> {
        self.by_asset.get(asset_id).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_asset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_asset.is_empty()
    }

    /// Number of assets without a defined penetration.
    pub fn uncovered(&self) -> usize {
        self.by_asset.values().filter(|p| p.is_none()).count()
    }
}

/// Scale a copy of `table`; the input is left untouched.
pub fn scale_table(table: &LongTable, lookup: &AcLookup) -> Vec<ScaledRow> {
    table
        .iter()
        .map(|row| ScaledRow::from_sample(row, lookup.get(&row.asset_id)))
        .collect()
}
