//! Grid store layout: resolves (loss function, scenario, intensity) to grid
//! documents under a root directory and opens them.
//!
//! Layout:
//!   projections/{scenario}/{LOSS}_productivity_loss_{intensity}_{scenario}.json
//!   observations/{LOSS}_productivity_loss_{intensity}_obs.json
//!   aircon/ac_penetration.json

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::grid::{AcGrid, StatGrid};
use crate::intensity::WorkIntensity;
use crate::scenario::{LossFunction, Scenario};

/// Handle to a grid store root for one loss function. Holds paths only;
/// grids are opened on demand and owned by the caller.
#[derive(Debug, Clone)]
pub struct GridStore {
    root: PathBuf,
    loss: LossFunction,
}

impl GridStore {
    /// Open a store rooted at `root`. Fails if the root is not a directory.
    pub fn open(root: impl Into<PathBuf>, loss: LossFunction) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::grid(&root, "grid store root is not a directory"));
        }
        Ok(Self { root, loss })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn loss_function(&self) -> LossFunction {
        self.loss
    }

    pub fn projection_path(&self, scenario: Scenario, intensity: WorkIntensity) -> PathBuf {
        projection_path(&self.root, self.loss, scenario, intensity)
    }

    pub fn observation_path(&self, intensity: WorkIntensity) -> PathBuf {
        observation_path(&self.root, self.loss, intensity)
    }

    pub fn ac_path(&self) -> PathBuf {
        ac_path(&self.root)
    }

    /// Open a projection grid; it must carry a year axis.
    pub fn open_projection(&self, scenario: Scenario, intensity: WorkIntensity) -> Result<StatGrid> {
        let path = self.projection_path(scenario, intensity);
        debug!("Opening projection grid {}", path.display());
        let grid = StatGrid::load(&path)?;
        if !grid.is_projection() {
            return Err(Error::grid(&path, "projection grid has no year axis"));
        }
        Ok(grid)
    }

    /// Open an observation grid; it must not carry a year axis.
    pub fn open_observation(&self, intensity: WorkIntensity) -> Result<StatGrid> {
        let path = self.observation_path(intensity);
        debug!("Opening observation grid {}", path.display());
        let grid = StatGrid::load(&path)?;
        if grid.is_projection() {
            return Err(Error::grid(&path, "observation grid must not have a year axis"));
        }
        Ok(grid)
    }

    pub fn open_ac(&self) -> Result<AcGrid> {
        let path = self.ac_path();
        debug!("Opening AC penetration grid {}", path.display());
        AcGrid::load(&path)
    }

    /// Check that every grid a run needs exists, before any sampling starts.
    pub fn check_available(
        &self,
        scenarios: &[Scenario],
        intensities: &[WorkIntensity],
        with_observations: bool,
    ) -> Result<()> {
        let mut wanted = vec![self.ac_path()];
        for &intensity in intensities {
            if with_observations {
                wanted.push(self.observation_path(intensity));
            }
            for &scenario in scenarios {
                wanted.push(self.projection_path(scenario, intensity));
            }
        }
        let missing: Vec<String> = wanted
            .iter()
            .filter(|p| !p.is_file())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::grid(&self.root, format!("missing grid documents: {}", missing.join(", "))));
        }
        Ok(())
    }
}

pub fn projection_path(root: &Path, loss: LossFunction, scenario: Scenario, intensity: WorkIntensity) -> PathBuf {
    root.join("projections")
        .join(scenario.as_str())
        .join(format!("{loss}_productivity_loss_{intensity}_{scenario}.json"))
}

pub fn observation_path(root: &Path, loss: LossFunction, intensity: WorkIntensity) -> PathBuf {
    root.join("observations").join(format!("{loss}_productivity_loss_{intensity}_obs.json"))
}

pub fn ac_path(root: &Path) -> PathBuf {
    root.join("aircon").join("ac_penetration.json")
}

/// Write a grid document as JSON, creating parent directories.
pub fn write_doc<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let json = serde_json::to_string(doc).map_err(|e| Error::json(path, e))?;
    fs::write(path, json).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AcGridDoc, StatGridDoc};

    fn stat_doc(year: Option<Vec<i32>>) -> StatGridDoc {
        let n = year.as_ref().map_or(1, |y| y.len());
        StatGridDoc {
            lat: vec![0.0],
            lon: vec![0.0],
            year,
            median: vec![1.0; n],
            minimum: vec![0.5; n],
            maximum: vec![2.0; n],
        }
    }

    #[test]
    fn paths_follow_layout() {
        let root = Path::new("/grids");
        assert_eq!(
            projection_path(root, LossFunction::Hothaps, Scenario::Ssp245, WorkIntensity::Moderate),
            Path::new("/grids/projections/ssp245/HOTHAPS_productivity_loss_moderate_ssp245.json")
        );
        assert_eq!(
            observation_path(root, LossFunction::Niosh, WorkIntensity::High),
            Path::new("/grids/observations/NIOSH_productivity_loss_high_obs.json")
        );
        assert_eq!(ac_path(root), Path::new("/grids/aircon/ac_penetration.json"));
    }

    #[test]
    fn open_rejects_missing_root() {
        let err = GridStore::open("/no/such/store", LossFunction::Iso).unwrap_err();
        assert!(matches!(err, Error::GridAccess { .. }));
    }

    #[test]
    fn open_projection_and_observation_check_year_axis() {
        let dir = tempfile::tempdir().unwrap();
        let store = GridStore::open(dir.path(), LossFunction::Hothaps).unwrap();
        let w = WorkIntensity::Low;

        write_doc(&store.projection_path(Scenario::Ssp126, w), &stat_doc(None)).unwrap();
        assert!(store.open_projection(Scenario::Ssp126, w).is_err());

        write_doc(&store.projection_path(Scenario::Ssp126, w), &stat_doc(Some(vec![2050]))).unwrap();
        assert!(store.open_projection(Scenario::Ssp126, w).is_ok());

        write_doc(&store.observation_path(w), &stat_doc(Some(vec![2020]))).unwrap();
        assert!(store.open_observation(w).is_err());
        write_doc(&store.observation_path(w), &stat_doc(None)).unwrap();
        assert!(store.open_observation(w).is_ok());
    }

    #[test]
    fn check_available_lists_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = GridStore::open(dir.path(), LossFunction::Hothaps).unwrap();
        write_doc(&store.ac_path(), &AcGridDoc { lat: vec![0.0], lon: vec![0.0], value: vec![0.5] }).unwrap();
        write_doc(&store.observation_path(WorkIntensity::Low), &stat_doc(None)).unwrap();

        let err = store
            .check_available(&[Scenario::Ssp585], &[WorkIntensity::Low], true)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("HOTHAPS_productivity_loss_low_ssp585.json"), "{msg}");
        assert!(!msg.contains("_obs.json"), "{msg}");
    }
}
