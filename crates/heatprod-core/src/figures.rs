//! Bar-plot data export.
//!
//! For a seeded random sample of assets, keeps the scaled statistics at the
//! first and last year of each scenario, with error-bar extents relative to
//! the median. Rendering is left to external tooling.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::output::write_rows;
use crate::scaling::ScaledRow;
use crate::scenario::Scenario;

/// Assets kept in the plot sample.
pub const PLOT_SAMPLE_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRow {
    pub scenario: Scenario,
    pub asset_id: String,
    pub year: i32,
    pub median: Option<f64>,
    /// median − minimum
    pub err_low: Option<f64>,
    /// maximum − median
    pub err_high: Option<f64>,
}

/// Pick up to `n` distinct asset ids, deterministic for a given seed.
/// The sample is returned in first-appearance order.
pub fn sample_assets(rows: &[ScaledRow], n: usize, seed: u64) -> Vec<String> {
    let mut seen = HashSet::new();
    let ids: Vec<&str> = rows
        .iter()
        .map(|r| r.asset_id.as_str())
        .filter(|id| seen.insert(*id))
        .collect();
    let mut rng = StdRng::seed_from_u64(seed);
    let picked: HashSet<&str> = ids.choose_multiple(&mut rng, n).copied().collect();
    ids.into_iter().filter(|id| picked.contains(id)).map(str::to_string).collect()
}

/// Plot rows for the sampled assets at each scenario's first and last year.
pub fn plot_rows(rows: &[ScaledRow], scenarios: &[Scenario], sample: &[String]) -> Vec<PlotRow> {
    let wanted: HashSet<&str> = sample.iter().map(String::as_str).collect();
    let mut out = Vec::new();
    for &scenario in scenarios {
        let in_scenario: Vec<&ScaledRow> = rows.iter().filter(|r| r.scenario == scenario).collect();
        let (Some(first), Some(last)) = (
            in_scenario.iter().map(|r| r.year).min(),
            in_scenario.iter().map(|r| r.year).max(),
        ) else {
            continue;
        };
        // (asset position in sample, year) → row, so output follows the sample.
        let mut picked: BTreeMap<(usize, i32), &ScaledRow> = BTreeMap::new();
        for r in in_scenario {
            if (r.year == first || r.year == last) && wanted.contains(r.asset_id.as_str()) {
                if let Some(pos) = sample.iter().position(|s| *s == r.asset_id) {
                    picked.insert((pos, r.year), r);
                }
            }
        }
        out.extend(picked.into_values().map(|r| PlotRow {
            scenario,
            asset_id: r.asset_id.clone(),
            year: r.year,
            median: r.median,
            err_low: r.median.zip(r.minimum).map(|(m, lo)| (m - lo).abs()),
            err_high: r.maximum.zip(r.median).map(|(hi, m)| (hi - m).abs()),
        }));
    }
    out
}

/// `{project}_barplot_data.csv` under `figures_dir`.
pub fn plot_data_path(figures_dir: &Path, project: &str) -> PathBuf {
    figures_dir.join(format!("{project}_barplot_data.csv"))
}

/// Sample assets and write their plot rows to `path`.
pub fn write_plot_data(path: &Path, rows: &[ScaledRow], scenarios: &[Scenario], seed: u64) -> Result<()> {
    let sample = sample_assets(rows, PLOT_SAMPLE_SIZE, seed);
    let data = plot_rows(rows, scenarios, &sample);
    write_rows(path, &data)
}
