//! Pipeline orchestrator: runs every stage in order.
//!
//!   load assets → map intensity → sample grids → assemble long table →
//!   AC scaling → write outputs.
//!
//! Nothing is written until every stage has succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Instant;

use log::info;
use serde::Serialize;

use crate::assets::load_assets;
use crate::config::RunConfig;
use crate::error::{Error, Result, UnmappedAsset};
use crate::figures::{plot_data_path, write_plot_data};
use crate::intensity::{map_assets, IntensityMap, WorkIntensity};
use crate::output::{write_json, write_scaled, write_unscaled, OutputPaths, StagedOutputs};
use crate::sampler::{sample_assets, SampleBlock, SamplePlan};
use crate::scaling::{scale_table, AcLookup, ScaledRow};
use crate::scenario::{LossFunction, Scenario};
use crate::store::GridStore;
use crate::table::{assemble, LongTable};

/// Per-run context: configuration plus the resources derived from it.
/// Built once and passed to each stage.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: RunConfig,
    pub store: GridStore,
    pub intensity_map: IntensityMap,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let intensity_map = match &config.asset_map {
            Some(path) => IntensityMap::from_path(path)?,
            None => IntensityMap::bundled()?,
        };
        let store = GridStore::open(&config.grid_root, config.loss_function)?;
        Ok(Self { config, store, intensity_map })
    }

    fn plan(&self) -> SamplePlan {
        SamplePlan {
            scenarios: self.config.scenarios.clone(),
            base_year: self.config.base_year,
            include_observations: self.config.include_observations,
        }
    }
}

/// Run summary written next to the tables.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub project: String,
    pub loss_function: LossFunction,
    pub scenarios: Vec<Scenario>,
    pub base_year: Option<i32>,
    /// Years present per scenario, over all intensities.
    pub years: BTreeMap<Scenario, Vec<i32>>,
    pub assets_sampled: usize,
    pub assets_by_intensity: BTreeMap<WorkIntensity, usize>,
    pub assets_excluded: Vec<UnmappedAsset>,
    pub ac_uncovered_assets: usize,
    pub unscaled_rows: usize,
    pub scaled_rows: usize,
    pub outputs: Vec<PathBuf>,
}

/// In-memory results of a run.
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub unscaled: LongTable,
    pub scaled: Vec<ScaledRow>,
    pub manifest: Manifest,
}

fn years_by_scenario(blocks: &[SampleBlock]) -> BTreeMap<Scenario, Vec<i32>> {
    let mut years: BTreeMap<Scenario, BTreeSet<i32>> = BTreeMap::new();
    for b in blocks {
        years.entry(b.scenario).or_default().extend(b.years.iter().map(|y| y.year));
    }
    years.into_iter().map(|(s, y)| (s, y.into_iter().collect())).collect()
}

/// Run every stage in memory.
pub fn execute(ctx: &RunContext) -> Result<RunOutputs> {
    let cfg = &ctx.config;

    let assets = load_assets(&cfg.input)?;
    let mapping = map_assets(assets, &ctx.intensity_map, cfg.mapping_policy)?;
    if mapping.assets.is_empty() {
        return Err(Error::schema(&cfg.input, "no assets left to sample after intensity mapping"));
    }

    let mut assets_by_intensity = BTreeMap::new();
    for a in &mapping.assets {
        *assets_by_intensity.entry(a.work_intensity).or_insert(0usize) += 1;
    }
    let intensities: Vec<WorkIntensity> = assets_by_intensity.keys().copied().collect();
    ctx.store.check_available(&cfg.scenarios, &intensities, cfg.include_observations)?;

    let blocks = sample_assets(&ctx.store, &mapping.assets, &ctx.plan())?;
    let unscaled = assemble(&mapping.assets, &blocks);
    debug_assert_eq!(unscaled.len(), blocks.iter().map(SampleBlock::row_count).sum::<usize>());
    info!("Assembled {} unscaled rows", unscaled.len());

    let ac = ctx.store.open_ac()?;
    let lookup = AcLookup::build(&ac, &mapping.assets);
    drop(ac);
    let scaled = scale_table(&unscaled, &lookup);

    let manifest = Manifest {
        project: cfg.project.clone(),
        loss_function: cfg.loss_function,
        scenarios: cfg.scenarios.clone(),
        base_year: cfg.include_observations.then_some(cfg.base_year),
        years: years_by_scenario(&blocks),
        assets_sampled: mapping.assets.len(),
        assets_by_intensity,
        assets_excluded: mapping.excluded,
        ac_uncovered_assets: lookup.uncovered(),
        unscaled_rows: unscaled.len(),
        scaled_rows: scaled.len(),
        outputs: Vec::new(),
    };
    Ok(RunOutputs { unscaled, scaled, manifest })
}

/// Run the pipeline and write its outputs. Returns the manifest.
pub fn run(config: RunConfig) -> Result<Manifest> {
    let start = Instant::now();
    config.validate()?;
    // Input presence is checked before any grid is touched.
    if !config.input.is_file() {
        return Err(Error::MissingInputFile { path: config.input.clone() });
    }
    let ctx = RunContext::new(config)?;
    let cfg = &ctx.config;
    info!(
        "Run '{}': {} loss, scenarios [{}], grids at {}",
        cfg.project,
        cfg.loss_function,
        cfg.scenarios.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "),
        ctx.store.root().display()
    );

    let RunOutputs { unscaled, scaled, mut manifest } = execute(&ctx)?;

    // Every file is staged; none replaces a target until all are written.
    let paths = OutputPaths::new(&cfg.output_dir, &cfg.project, cfg.loss_function);
    let mut staged = StagedOutputs::default();
    write_unscaled(&staged.stage(&paths.unscaled), &unscaled)?;
    write_scaled(&staged.stage(&paths.scaled), &scaled)?;
    manifest.outputs = vec![paths.unscaled.clone(), paths.scaled.clone()];

    if cfg.make_plots {
        let plot = plot_data_path(&cfg.figures_dir, &cfg.project);
        write_plot_data(&staged.stage(&plot), &scaled, &cfg.scenarios, cfg.plot_seed)?;
        manifest.outputs.push(plot);
    }

    write_json(&staged.stage(&paths.manifest), &manifest)?;
    for path in staged.commit()? {
        info!("Saved {}", path.display());
    }
    info!("Run '{}' complete in {:.1}s", cfg.project, start.elapsed().as_secs_f64());
    Ok(manifest)
}
