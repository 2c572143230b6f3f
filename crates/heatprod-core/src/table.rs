//! Long-format table assembly: one row per (asset, scenario, year).

use serde::{Deserialize, Serialize};

use crate::grid::StatTriple;
use crate::intensity::MappedAsset;
use crate::sampler::SampleBlock;
use crate::scenario::Scenario;

/// Decimal places kept for every statistic.
pub const DECIMALS: i32 = 2;

/// Round to [`DECIMALS`] places, half away from zero.
pub fn round_stat(v: f64) -> f64 {
    let scale = 10f64.powi(DECIMALS);
    let r = (v * scale).round() / scale;
    // Normalise -0.0 so it serialises as 0.
    if r == 0.0 { 0.0 } else { r }
}

/// One unscaled output row. `None` statistics come from no-data cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub asset_id: String,
    pub scenario: Scenario,
    pub year: i32,
    pub median: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl SampleRow {
    fn new(asset_id: &str, scenario: Scenario, year: i32, s: StatTriple) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            scenario,
            year,
            median: s.median.map(round_stat),
            minimum: s.minimum.map(round_stat),
            maximum: s.maximum.map(round_stat),
        }
    }

    pub fn key(&self) -> (&str, Scenario, i32) {
        (&self.asset_id, self.scenario, self.year)
    }
}

/// The unscaled long table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTable {
    pub rows: Vec<SampleRow>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SampleRow> {
        self.rows.iter()
    }
}

/// Flatten sample blocks into rows, rounding every statistic once.
///
/// Row order follows block order (intensity, then scenario), then year
/// ascending, then asset in input order.
pub fn assemble(assets: &[MappedAsset], blocks: &[SampleBlock]) -> LongTable {
    let mut rows = Vec::with_capacity(blocks.iter().map(SampleBlock::row_count).sum());
    for block in blocks {
        for ys in &block.years {
            for (&ai, &stats) in block.assets.iter().zip(&ys.stats) {
                rows.push(SampleRow::new(&assets[ai].asset.asset_id, block.scenario, ys.year, stats));
            }
        }
    }
    LongTable { rows }
}
