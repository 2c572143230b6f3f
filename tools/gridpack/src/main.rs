/// Grid packing tool: converts a long-format CSV of grid cells into the JSON
/// grid documents read by the HeatProd grid store.
///
/// Statistic CSV: lat, lon, [year], median, minimum, maximum
/// AC CSV:        lat, lon, value
/// Cells absent from the CSV, or with empty values, become no-data.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use heatprod_core::grid::{AcGrid, AcGridDoc, StatGrid, StatGridDoc};
use heatprod_core::intensity::WorkIntensity;
use heatprod_core::scenario::{LossFunction, Scenario};
use heatprod_core::store::{ac_path, observation_path, projection_path, write_doc};
use log::info;
use serde::Deserialize;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Kind {
    /// Productivity-loss statistics (projection if a year column is present)
    Stat,
    /// Air-conditioning penetration fractions
    Ac,
}

#[derive(Parser, Debug)]
#[command(name = "gridpack", about = "Pack long-format grid CSV into HeatProd grid documents")]
struct Args {
    /// Long-format cell CSV
    #[arg(short, long)]
    input: PathBuf,

    /// What the CSV holds
    #[arg(short, long, value_enum, default_value = "stat")]
    kind: Kind,

    /// Explicit output path (otherwise derived from --store)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Grid store root; the document is placed at its layout path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Loss function for the store path
    #[arg(long, default_value = "HOTHAPS")]
    loss_function: LossFunction,

    /// Scenario for the store path (omit for an observation grid)
    #[arg(long)]
    scenario: Option<Scenario>,

    /// Work intensity for the store path
    #[arg(long)]
    intensity: Option<WorkIntensity>,
}

// ── CSV rows ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatCell {
    lat: f64,
    lon: f64,
    year: Option<i32>,
    median: Option<f64>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

#[derive(Deserialize)]
struct AcCell {
    lat: f64,
    lon: f64,
    value: Option<f64>,
}

// ── Axis helpers ──────────────────────────────────────────────────────────────

/// Sorted unique coordinates and a lookup from value to position.
fn axis(values: impl Iterator<Item = f64>) -> (Vec<f64>, HashMap<u64, usize>) {
    // +0.0 folds -0.0 into 0.0 so both hash alike.
    let mut v: Vec<f64> = values.map(|x| x + 0.0).collect();
    v.sort_by(f64::total_cmp);
    v.dedup();
    let index = v.iter().enumerate().map(|(i, x)| (x.to_bits(), i)).collect();
    (v, index)
}

fn pos(index: &HashMap<u64, usize>, x: f64) -> usize {
    index[&(x + 0.0).to_bits()]
}

fn read_cells<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let mut cells = Vec::new();
    for (i, rec) in rdr.deserialize().enumerate() {
        cells.push(rec.with_context(|| format!("{}: bad row {}", path.display(), i + 2))?);
    }
    if cells.is_empty() {
        bail!("{} holds no cells", path.display());
    }
    Ok(cells)
}

// ── Packing ───────────────────────────────────────────────────────────────────

fn pack_stat(cells: &[StatCell]) -> Result<StatGridDoc> {
    let with_year = cells.iter().filter(|c| c.year.is_some()).count();
    if with_year != 0 && with_year != cells.len() {
        bail!("year column must be filled for every cell or for none");
    }
    let (lat, lat_ix) = axis(cells.iter().map(|c| c.lat));
    let (lon, lon_ix) = axis(cells.iter().map(|c| c.lon));
    let years: Option<Vec<i32>> = (with_year > 0).then(|| {
        let mut y: Vec<i32> = cells.iter().filter_map(|c| c.year).collect();
        y.sort_unstable();
        y.dedup();
        y
    });
    let n_year = years.as_ref().map_or(1, Vec::len);
    let n = n_year * lat.len() * lon.len();

    let mut median = vec![f64::NAN; n];
    let mut minimum = vec![f64::NAN; n];
    let mut maximum = vec![f64::NAN; n];
    let mut filled = vec![false; n];
    for c in cells {
        let yi = match (&years, c.year) {
            (Some(ys), Some(y)) => ys.binary_search(&y).unwrap_or_default(),
            _ => 0,
        };
        let i = (yi * lat.len() + pos(&lat_ix, c.lat)) * lon.len() + pos(&lon_ix, c.lon);
        if filled[i] {
            bail!("duplicate cell at lat {}, lon {}, year {:?}", c.lat, c.lon, c.year);
        }
        filled[i] = true;
        median[i] = c.median.unwrap_or(f64::NAN);
        minimum[i] = c.minimum.unwrap_or(f64::NAN);
        maximum[i] = c.maximum.unwrap_or(f64::NAN);
    }
    Ok(StatGridDoc { lat, lon, year: years, median, minimum, maximum })
}

fn pack_ac(cells: &[AcCell]) -> Result<AcGridDoc> {
    let (lat, lat_ix) = axis(cells.iter().map(|c| c.lat));
    let (lon, lon_ix) = axis(cells.iter().map(|c| c.lon));
    let mut value = vec![f64::NAN; lat.len() * lon.len()];
    let mut filled = vec![false; value.len()];
    for c in cells {
        let i = pos(&lat_ix, c.lat) * lon.len() + pos(&lon_ix, c.lon);
        if filled[i] {
            bail!("duplicate cell at lat {}, lon {}", c.lat, c.lon);
        }
        filled[i] = true;
        value[i] = c.value.unwrap_or(f64::NAN);
    }
    Ok(AcGridDoc { lat, lon, value })
}

fn target_path(args: &Args) -> Result<PathBuf> {
    if let Some(out) = &args.output {
        return Ok(out.clone());
    }
    let Some(root) = &args.store else {
        bail!("either --output or --store is required");
    };
    Ok(match (args.kind, args.scenario, args.intensity) {
        (Kind::Ac, _, _) => ac_path(root),
        (Kind::Stat, Some(s), Some(w)) => projection_path(root, args.loss_function, s, w),
        (Kind::Stat, None, Some(w)) => observation_path(root, args.loss_function, w),
        (Kind::Stat, _, None) => bail!("--intensity is required for statistic grids in a store"),
    })
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let out = target_path(&args)?;

    match args.kind {
        Kind::Stat => {
            let cells: Vec<StatCell> = read_cells(&args.input)?;
            let doc = pack_stat(&cells)?;
            if args.store.is_some() && args.output.is_none() && doc.year.is_some() != args.scenario.is_some() {
                bail!("projection grids need --scenario and a year column; observation grids need neither");
            }
            // Validate exactly as the store will on read.
            let grid = StatGrid::from_doc(doc, &out)?;
            write_doc(&out, &grid.to_doc())?;
            info!("[gridpack] {} cells → {} (shape {:?})", cells.len(), out.display(), grid.shape());
        }
        Kind::Ac => {
            let cells: Vec<AcCell> = read_cells(&args.input)?;
            let grid = AcGrid::from_doc(pack_ac(&cells)?, &out)?;
            write_doc(&out, &grid.to_doc())?;
            info!("[gridpack] {} AC cells → {}", cells.len(), out.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatprod_core::coords::LatLon;

    fn stat(lat: f64, lon: f64, year: Option<i32>, m: f64) -> StatCell {
        StatCell { lat, lon, year, median: Some(m), minimum: Some(m - 1.0), maximum: Some(m + 1.0) }
    }

    #[test]
    fn packs_projection_cells_row_major() {
        let cells = vec![
            stat(10.0, 20.0, Some(2100), 4.0),
            stat(0.0, 20.0, Some(2030), 2.0),
            stat(10.0, 0.0, Some(2030), 3.0),
            stat(0.0, 0.0, Some(2030), 1.0),
        ];
        let doc = pack_stat(&cells).unwrap();
        assert_eq!(doc.lat, [0.0, 10.0]);
        assert_eq!(doc.lon, [0.0, 20.0]);
        assert_eq!(doc.year, Some(vec![2030, 2100]));
        let grid = StatGrid::from_doc(doc, Path::new("t.json")).unwrap();
        assert_eq!(grid.sample(LatLon::new(0.0, 20.0), 0).median, Some(2.0));
        assert_eq!(grid.sample(LatLon::new(10.0, 20.0), 1).median, Some(4.0));
        // Never supplied → no data.
        assert_eq!(grid.sample(LatLon::new(0.0, 0.0), 1).median, None);
    }

    #[test]
    fn rejects_duplicates_and_mixed_years() {
        let dup = vec![stat(0.0, 0.0, None, 1.0), stat(0.0, 0.0, None, 2.0)];
        assert!(pack_stat(&dup).is_err());
        let mixed = vec![stat(0.0, 0.0, None, 1.0), stat(0.0, 1.0, Some(2030), 2.0)];
        assert!(pack_stat(&mixed).is_err());
    }

    #[test]
    fn packs_ac_cells() {
        let cells = vec![
            AcCell { lat: 1.0, lon: 0.0, value: Some(0.3) },
            AcCell { lat: 0.0, lon: 0.0, value: None },
        ];
        let doc = pack_ac(&cells).unwrap();
        let grid = AcGrid::from_doc(doc, Path::new("ac.json")).unwrap();
        assert_eq!(grid.penetration(LatLon::new(1.0, 0.0)), Some(0.3));
        assert_eq!(grid.penetration(LatLon::new(0.0, 0.0)), None);
    }

    #[test]
    fn store_paths_follow_layout() {
        let args = Args::parse_from([
            "gridpack", "-i", "cells.csv", "--store", "/grids", "--scenario", "ssp126", "--intensity", "high",
        ]);
        assert_eq!(
            target_path(&args).unwrap(),
            Path::new("/grids/projections/ssp126/HOTHAPS_productivity_loss_high_ssp126.json")
        );
    }

    #[test]
    fn reads_csv_with_empty_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.csv");
        std::fs::write(&path, "lat,lon,year,median,minimum,maximum\n0,0,2030,1.5,1,2\n0,1,2030,,,\n").unwrap();
        let cells: Vec<StatCell> = read_cells(&path).unwrap();
        assert_eq!(cells.len(), 2);
        assert!(cells[1].median.is_none());
    }
}
