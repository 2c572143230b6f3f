//! Run configuration, constructed once per run and passed to the pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::intensity::MappingPolicy;
use crate::scenario::{LossFunction, Scenario};

/// Default year the observation grids stand for.
pub const DEFAULT_BASE_YEAR: i32 = 2020;

/// Everything a run needs. Defaults sample all four scenarios with the
/// HOTHAPS loss function and include the base-year observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Asset CSV.
    pub input: PathBuf,
    /// Root of the grid store.
    pub grid_root: PathBuf,
    /// Directory result tables are written to.
    pub output_dir: PathBuf,
    /// Label prefixed to every output file.
    pub project: String,
    pub loss_function: LossFunction,
    /// Scenarios in output order; duplicates are rejected.
    pub scenarios: Vec<Scenario>,
    pub base_year: i32,
    pub include_observations: bool,
    pub mapping_policy: MappingPolicy,
    /// Category → intensity table; the bundled table when absent.
    pub asset_map: Option<PathBuf>,
    /// Export bar-plot data for a sample of assets.
    pub make_plots: bool,
    /// Directory plot data is written to.
    pub figures_dir: PathBuf,
    /// Seed for the plot asset sample.
    pub plot_seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            grid_root: PathBuf::from("data/grids"),
            output_dir: PathBuf::from("output"),
            project: "heatprod".into(),
            loss_function: LossFunction::default(),
            scenarios: Scenario::ALL.to_vec(),
            base_year: DEFAULT_BASE_YEAR,
            include_observations: true,
            mapping_policy: MappingPolicy::default(),
            asset_map: None,
            make_plots: false,
            figures_dir: PathBuf::from("figures"),
            plot_seed: 42,
        }
    }
}

impl RunConfig {
    /// Load a configuration from a JSON file; absent keys take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingInputFile { path: path.to_path_buf() });
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| Error::json(path, e))
    }

    /// Reject configurations that cannot produce a well-formed table.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::Config("no input file given".into()));
        }
        if self.scenarios.is_empty() {
            return Err(Error::Config("at least one scenario is required".into()));
        }
        for (i, s) in self.scenarios.iter().enumerate() {
            if self.scenarios[..i].contains(s) {
                return Err(Error::Config(format!("scenario {s} listed more than once")));
            }
        }
        let label_ok = !self.project.is_empty()
            && self.project.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !label_ok {
            return Err(Error::Config(format!(
                "project label '{}' must be non-empty and use only letters, digits, '-', '_' or '.'",
                self.project
            )));
        }
        Ok(())
    }
}
