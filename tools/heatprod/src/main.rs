/// HeatProd sampling tool: samples productivity-loss grids at asset
/// locations and writes unscaled and AC-scaled long tables.
///
/// Settings come from an optional JSON config file; command-line flags
/// override it.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use heatprod_core::config::RunConfig;
use heatprod_core::intensity::MappingPolicy;
use heatprod_core::pipeline::run;
use heatprod_core::scenario::{LossFunction, Scenario};
use log::info;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "heatprod", about = "Sample heat productivity-loss grids at asset locations")]
struct Args {
    /// Path to input asset CSV file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON run configuration; flags given here override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the result tables are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Root of the grid store
    #[arg(long, env = "HEATPROD_GRID_ROOT")]
    grid_root: Option<PathBuf>,

    /// Loss function: HOTHAPS, ISO or NIOSH
    #[arg(short, long)]
    loss_function: Option<LossFunction>,

    /// Comma-separated scenarios, e.g. ssp126,ssp585
    #[arg(short, long, value_delimiter = ',')]
    scenarios: Option<Vec<Scenario>>,

    /// Project / run label used in output file names
    #[arg(short, long)]
    project: Option<String>,

    /// Year the observation grids stand for
    #[arg(long)]
    base_year: Option<i32>,

    /// Skip the base-year observation grids
    #[arg(long)]
    no_observations: bool,

    /// Unmapped categories: fail-fast or exclude-unknown
    #[arg(long)]
    mapping_policy: Option<MappingPolicy>,

    /// Category → intensity CSV replacing the bundled table
    #[arg(long)]
    asset_map: Option<PathBuf>,

    /// Export bar-plot data for a sample of assets
    #[arg(long)]
    makeplots: bool,

    /// Directory plot data is written to
    #[arg(long)]
    figures_dir: Option<PathBuf>,

    /// Print the run manifest as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> Result<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("Cannot load config {}", path.display()))?,
            None => RunConfig::default(),
        };
        if let Some(v) = self.input {
            cfg.input = v;
        }
        if let Some(v) = self.output_dir {
            cfg.output_dir = v;
        }
        if let Some(v) = self.grid_root {
            cfg.grid_root = v;
        }
        if let Some(v) = self.loss_function {
            cfg.loss_function = v;
        }
        if let Some(v) = self.scenarios {
            cfg.scenarios = v;
        }
        if let Some(v) = self.project {
            cfg.project = v;
        }
        if let Some(v) = self.base_year {
            cfg.base_year = v;
        }
        if self.no_observations {
            cfg.include_observations = false;
        }
        if let Some(v) = self.mapping_policy {
            cfg.mapping_policy = v;
        }
        if self.asset_map.is_some() {
            cfg.asset_map = self.asset_map;
        }
        if self.makeplots {
            cfg.make_plots = true;
        }
        if let Some(v) = self.figures_dir {
            cfg.figures_dir = v;
        }
        Ok(cfg)
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let json = args.json;
    let cfg = args.into_config()?;
    let project = cfg.project.clone();

    let manifest = run(cfg).with_context(|| format!("HeatProd run '{project}' failed"))?;

    info!(
        "[heatprod] {} assets sampled, {} rows written ({} assets without AC data)",
        manifest.assets_sampled, manifest.unscaled_rows, manifest.ac_uncovered_assets
    );
    for path in &manifest.outputs {
        info!("  -> {}", path.display());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    }
    Ok(())
}
