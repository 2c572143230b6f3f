//! Grid sampling: nearest-cell lookups of asset locations against the
//! observation and projection grids of each (intensity, scenario) pair.
//!
//! Each job opens and owns its grid, resolves cell indices for all of its
//! assets once, then gathers every year from those cells. With the
//! `threading` feature jobs run on the rayon pool; results keep job order.

use std::collections::BTreeMap;

use log::{debug, info};

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::coords::LatLon;
use crate::error::Result;
use crate::grid::{StatGrid, StatTriple};
use crate::intensity::{MappedAsset, WorkIntensity};
use crate::scenario::Scenario;
use crate::store::GridStore;

/// What to sample.
#[derive(Debug, Clone)]
pub struct SamplePlan {
    /// Scenarios in output order.
    pub scenarios: Vec<Scenario>,
    /// Year the observation grid stands for.
    pub base_year: i32,
    /// Sample the observation grid as the base year.
    pub include_observations: bool,
}

/// Samples for one year, one triple per asset of the owning block.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSamples {
    pub year: i32,
    pub stats: Vec<StatTriple>,
}

/// All samples of one (intensity, scenario) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    pub intensity: WorkIntensity,
    pub scenario: Scenario,
    /// Indices into the sampled asset slice, in input order.
    pub assets: Vec<usize>,
    /// Ascending by year.
    pub years: Vec<YearSamples>,
}

impl SampleBlock {
    pub fn row_count(&self) -> usize {
        self.assets.len() * self.years.len()
    }
}

/// Batched nearest-cell lookup: one triple per point for the year at
/// `year_idx` of the grid's year axis.
pub fn sample_points(grid: &StatGrid, points: &[LatLon], year_idx: usize) -> Vec<StatTriple> {
    grid.locate_all(points).into_iter().map(|cell| grid.stats(cell, year_idx)).collect()
}

/// Nearest-cell lookup for every year of a projection grid, resolving the
/// cells once.
pub fn sample_years(grid: &StatGrid, points: &[LatLon]) -> Vec<YearSamples> {
    let cells = grid.locate_all(points);
    grid.years()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(yi, &year)| YearSamples {
            year,
            stats: cells.iter().map(|&cell| grid.stats(cell, yi)).collect(),
        })
        .collect()
}

fn run_jobs<J, T, F>(jobs: &[J], f: F) -> Result<Vec<T>>
where
    J: Sync,
    T: Send,
    F: Fn(&J) -> Result<T> + Sync + Send,
{
    #[cfg(feature = "threading")]
    {
        jobs.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "threading"))]
    {
        jobs.iter().map(f).collect()
    }
}

/// Sample every asset against its intensity's grids for each scenario.
///
/// Blocks are ordered by intensity (low → high), then scenario in plan order.
/// A projection year equal to the base year is dropped when observations are
/// included, so each (asset, scenario, year) appears once.
pub fn sample_assets(store: &GridStore, assets: &[MappedAsset], plan: &SamplePlan) -> Result<Vec<SampleBlock>> {
    let mut groups: BTreeMap<WorkIntensity, Vec<usize>> = BTreeMap::new();
    for (i, a) in assets.iter().enumerate() {
        groups.entry(a.work_intensity).or_default().push(i);
    }
    let groups: Vec<(WorkIntensity, Vec<usize>, Vec<LatLon>)> = groups
        .into_iter()
        .map(|(w, idx)| {
            let points = idx.iter().map(|&i| assets[i].asset.location).collect();
            (w, idx, points)
        })
        .collect();

    // Observation samples are shared by every scenario of an intensity.
    let baselines: Vec<Option<YearSamples>> = run_jobs(&groups, |(intensity, _, points)| {
        if !plan.include_observations {
            return Ok(None);
        }
        let grid = store.open_observation(*intensity)?;
        debug!("Sampling {} points from {intensity} observation grid", points.len());
        Ok(Some(YearSamples { year: plan.base_year, stats: sample_points(&grid, points, 0) }))
    })?;

    let jobs: Vec<(usize, Scenario)> = (0..groups.len())
        .flat_map(|g| plan.scenarios.iter().map(move |&s| (g, s)))
        .collect();

    let blocks = run_jobs(&jobs, |&(g, scenario)| {
        let (intensity, idx, points) = &groups[g];
        let grid = store.open_projection(scenario, *intensity)?;
        let mut years = sample_years(&grid, points);
        drop(grid);

        if let Some(base) = &baselines[g] {
            years.retain(|y| y.year != base.year);
            years.push(base.clone());
            years.sort_by_key(|y| y.year);
        }
        info!(
            "Sampled {} {intensity}-intensity assets for {scenario}: {} years",
            idx.len(),
            years.len()
        );
        Ok(SampleBlock { intensity: *intensity, scenario, assets: idx.clone(), years })
    })?;

    Ok(blocks)
}
