//! Writing result tables and the run manifest to disk.
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::scaling::ScaledRow;
use crate::scenario::LossFunction;
use crate::table::{LongTable, SampleRow};

/// File locations for one run's outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub unscaled: PathBuf,
    pub scaled: PathBuf,
    pub manifest: PathBuf,
}

impl OutputPaths {
    pub fn new(output_dir: &Path, project: &str, loss: LossFunction) -> Self {
        let stem = format!("{project}_{loss}_productivity_loss");
        Self {
            unscaled: output_dir.join(format!("{stem}.csv")),
            scaled: output_dir.join(format!("{stem}_ac_scaled.csv")),
            manifest: output_dir.join(format!("{project}_manifest.json")),
        }
    }
}

/// Create `dir` and its parents; succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
}

/// Serialise rows to a CSV file with a header, creating the parent directory.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| Error::csv(path, e))?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read rows back from a CSV file written by [`write_rows`].
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| Error::csv(path, e))?;
    rdr.deserialize().map(|r| r.map_err(|e| Error::csv(path, e))).collect()
}

pub fn write_unscaled(path: &Path, table: &LongTable) -> Result<()> {
    write_rows(path, &table.rows)
}

pub fn read_unscaled(path: &Path) -> Result<LongTable> {
    Ok(LongTable { rows: read_rows::<SampleRow>(path)? })
}

pub fn write_scaled(path: &Path, rows: &[ScaledRow]) -> Result<()> {
    write_rows(path, rows)
}

/// Write any serialisable value as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::json(path, e))?;
    fs::write(path, json).map_err(|e| Error::io(path, e))
}

// ── Staged writes ─────────────────────────────────────────────────────────────

/// Outputs written under temporary names next to their targets and moved
/// into place by [`StagedOutputs::commit`]. Anything still staged when the
/// value is dropped is deleted, so a failed run leaves no result files.
#[derive(Debug, Default)]
pub struct StagedOutputs {
    staged: Vec<(PathBuf, PathBuf)>,
}

impl StagedOutputs {
    /// Register `target` and return the temporary path to write it to.
    pub fn stage(&mut self, target: &Path) -> PathBuf {
        let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".partial");
        let tmp = target.with_file_name(name);
        self.staged.push((tmp.clone(), target.to_path_buf()));
        tmp
    }

    /// Rename every staged file onto its target, in staging order.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let mut done = Vec::with_capacity(self.staged.len());
        while !self.staged.is_empty() {
            let (tmp, target) = self.staged.remove(0);
            if let Err(e) = fs::rename(&tmp, &target) {
                let _ = fs::remove_file(&tmp);
                return Err(Error::io(&target, e));
            }
            done.push(target);
        }
        Ok(done)
    }
}

impl Drop for StagedOutputs {
    fn drop(&mut self) {
        for (tmp, _) in &self.staged {
            if tmp.exists() {
                debug!("Removing unfinished output {}", tmp.display());
                let _ = fs::remove_file(tmp);
            }
        }
    }
}
