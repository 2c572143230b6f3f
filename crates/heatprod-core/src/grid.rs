//! In-memory climate grids and their on-disk JSON documents.
//!
//! Statistic grids are stored as three `Array3<f64>` (year × lat × lon), one
//! per statistic. Observation grids carry no year axis and are held with a
//! year dimension of length 1. Missing cells are NaN in memory and `null` on
//! disk.

use std::fs;
use std::path::Path;

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::coords::{CoordAxis, LatLon};
use crate::error::{Error, Result};

// ── Serde helpers ─────────────────────────────────────────────────────────────

fn null_as_nan_vec<'de, D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// JSON form of a statistic grid. Data is row-major over (year, lat, lon);
/// `year` is absent for observation grids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatGridDoc {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Vec<i32>>,
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub median: Vec<f64>,
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub minimum: Vec<f64>,
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub maximum: Vec<f64>,
}

/// JSON form of the AC-penetration grid. Data is row-major over (lat, lon).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcGridDoc {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub value: Vec<f64>,
}

fn read_doc<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::grid(path, "grid document does not exist"));
    }
    let text = fs::read_to_string(path).map_err(|e| Error::grid(path, e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| Error::grid(path, format!("malformed grid document: {e}")))
}

// ── Statistic triple ──────────────────────────────────────────────────────────

/// Median / minimum / maximum at one cell and year. `None` marks a no-data cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatTriple {
    pub median: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

fn defined(v: f64) -> Option<f64> {
    if v.is_nan() { None } else { Some(v) }
}

/// Resolved (lat, lon) cell indices for one query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

// ── Statistic grid ────────────────────────────────────────────────────────────

/// A productivity-loss grid: projection (with years) or observation (without).
#[derive(Debug, Clone)]
pub struct StatGrid {
    lat: CoordAxis,
    lon: CoordAxis,
    years: Option<Vec<i32>>,
    median: Array3<f64>,
    minimum: Array3<f64>,
    maximum: Array3<f64>,
}

impl StatGrid {
    /// Validate a document and build the grid. `path` is only used for error
    /// messages.
    pub fn from_doc(doc: StatGridDoc, path: &Path) -> Result<Self> {
        let lat = CoordAxis::new(doc.lat).map_err(|m| Error::grid(path, format!("lat {m}")))?;
        let lon = CoordAxis::new(doc.lon).map_err(|m| Error::grid(path, format!("lon {m}")))?;

        let n_year = match &doc.year {
            Some(years) => {
                if years.is_empty() {
                    return Err(Error::grid(path, "year axis is empty"));
                }
                if !years.windows(2).all(|w| w[1] > w[0]) {
                    return Err(Error::grid(path, "year axis is not strictly increasing"));
                }
                years.len()
            }
            None => 1,
        };
        let shape = (n_year, lat.len(), lon.len());
        let build = |name: &str, data: Vec<f64>| {
            let len = data.len();
            Array3::from_shape_vec(shape, data).map_err(|_| {
                Error::grid(
                    path,
                    format!(
                        "{name} has {len} values, expected {} ({} year × {} lat × {} lon)",
                        shape.0 * shape.1 * shape.2,
                        shape.0,
                        shape.1,
                        shape.2
                    ),
                )
            })
        };
        let median = build("median", doc.median)?;
        let minimum = build("minimum", doc.minimum)?;
        let maximum = build("maximum", doc.maximum)?;

        Ok(Self { lat, lon, years: doc.year, median, minimum, maximum })
    }

    /// Read and validate a grid document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let doc: StatGridDoc = read_doc(path)?;
        Self::from_doc(doc, path)
    }

    /// Document form, for writing grids back to disk.
    pub fn to_doc(&self) -> StatGridDoc {
        StatGridDoc {
            lat: self.lat.values().to_vec(),
            lon: self.lon.values().to_vec(),
            year: self.years.clone(),
            median: self.median.iter().copied().collect(),
            minimum: self.minimum.iter().copied().collect(),
            maximum: self.maximum.iter().copied().collect(),
        }
    }

    /// Projection years, or `None` for an observation grid.
    pub fn years(&self) -> Option<&[i32]> {
        self.years.as_deref()
    }

    pub fn is_projection(&self) -> bool {
        self.years.is_some()
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.median.dim()
    }

    /// Nearest cell to `p`, independently on each axis.
    pub fn locate(&self, p: LatLon) -> Cell {
        Cell { row: self.lat.nearest(p.lat), col: self.lon.nearest(p.lon) }
    }

    /// Nearest cells for a batch of points.
    pub fn locate_all(&self, points: &[LatLon]) -> Vec<Cell> {
        points.iter().map(|&p| self.locate(p)).collect()
    }

    /// Statistics at `cell` for the year at position `year_idx` of the year
    /// axis (always 0 for observation grids).
    pub fn stats(&self, cell: Cell, year_idx: usize) -> StatTriple {
        let ix = [year_idx, cell.row, cell.col];
        StatTriple {
            median: defined(self.median[ix]),
            minimum: defined(self.minimum[ix]),
            maximum: defined(self.maximum[ix]),
        }
    }

    /// Statistics at the nearest cell to `p`.
    pub fn sample(&self, p: LatLon, year_idx: usize) -> StatTriple {
        self.stats(self.locate(p), year_idx)
    }
}

// ── AC grid ───────────────────────────────────────────────────────────────────

/// Air-conditioning penetration fraction per cell, in [0, 1] or NaN.
#[derive(Debug, Clone)]
pub struct AcGrid {
    lat: CoordAxis,
    lon: CoordAxis,
    value: Array2<f64>,
}

impl AcGrid {
    pub fn from_doc(doc: AcGridDoc, path: &Path) -> Result<Self> {
        let lat = CoordAxis::new(doc.lat).map_err(|m| Error::grid(path, format!("lat {m}")))?;
        let lon = CoordAxis::new(doc.lon).map_err(|m| Error::grid(path, format!("lon {m}")))?;
        if let Some(v) = doc.value.iter().find(|v| !v.is_nan() && !(0.0..=1.0).contains(*v)) {
            return Err(Error::grid(path, format!("penetration {v} outside [0, 1]")));
        }
        let shape = (lat.len(), lon.len());
        let len = doc.value.len();
        let value = Array2::from_shape_vec(shape, doc.value).map_err(|_| {
            Error::grid(path, format!("value has {len} entries, expected {} × {}", shape.0, shape.1))
        })?;
        Ok(Self { lat, lon, value })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let doc: AcGridDoc = read_doc(path)?;
        Self::from_doc(doc, path)
    }

    pub fn to_doc(&self) -> AcGridDoc {
        AcGridDoc {
            lat: self.lat.values().to_vec(),
            lon: self.lon.values().to_vec(),
            value: self.value.iter().copied().collect(),
        }
    }

    /// Penetration at the nearest cell, or `None` if `p` is outside the grid
    /// extent or the cell holds no data.
    pub fn penetration(&self, p: LatLon) -> Option<f64> {
        if !self.lat.covers(p.lat) || !self.lon.covers(p.lon) {
            return None;
        }
        defined(self.value[[self.lat.nearest(p.lat), self.lon.nearest(p.lon)]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn projection_doc() -> StatGridDoc {
        // 2 years × 2 lat × 3 lon; value = year_idx * 100 + row * 10 + col.
        let mut median = Vec::new();
        for y in 0..2 {
            for r in 0..2 {
                for c in 0..3 {
                    median.push((y * 100 + r * 10 + c) as f64);
                }
            }
        }
        let minimum = median.iter().map(|v| v - 1.0).collect();
        let maximum = median.iter().map(|v| v + 1.0).collect();
        StatGridDoc {
            lat: vec![0.0, 10.0],
            lon: vec![0.0, 10.0, 20.0],
            year: Some(vec![2030, 2100]),
            median,
            minimum,
            maximum,
        }
    }

    fn here() -> PathBuf {
        PathBuf::from("test.json")
    }

    #[test]
    fn sample_uses_nearest_cell_per_axis() {
        let grid = StatGrid::from_doc(projection_doc(), &here()).unwrap();
        let s = grid.sample(LatLon::new(9.0, 16.0), 1);
        assert_eq!(s.median, Some(112.0));
        assert_eq!(s.minimum, Some(111.0));
        assert_eq!(s.maximum, Some(113.0));
    }

    #[test]
    fn sample_outside_coverage_snaps_to_edge() {
        let grid = StatGrid::from_doc(projection_doc(), &here()).unwrap();
        let s = grid.sample(LatLon::new(-80.0, 170.0), 0);
        assert_eq!(s.median, Some(2.0));
    }

    #[test]
    fn shape_mismatch_is_grid_error() {
        let mut doc = projection_doc();
        doc.maximum.pop();
        let err = StatGrid::from_doc(doc, &here()).unwrap_err();
        assert!(matches!(err, Error::GridAccess { .. }));
        assert!(err.to_string().contains("maximum has 11 values"), "{err}");
    }

    #[test]
    fn null_cells_deserialize_as_missing() {
        let json = r#"{"lat":[0.0],"lon":[0.0,1.0],
            "median":[1.5,null],"minimum":[1.0,null],"maximum":[2.0,null]}"#;
        let doc: StatGridDoc = serde_json::from_str(json).unwrap();
        let grid = StatGrid::from_doc(doc, &here()).unwrap();
        assert!(!grid.is_projection());
        assert_eq!(grid.sample(LatLon::new(0.0, 0.0), 0).median, Some(1.5));
        assert_eq!(grid.sample(LatLon::new(0.0, 1.0), 0), StatTriple::default());
    }

    #[test]
    fn doc_roundtrip_preserves_nan_as_null() {
        let json = r#"{"lat":[0.0],"lon":[0.0,1.0],
            "median":[1.5,null],"minimum":[1.0,null],"maximum":[2.0,null]}"#;
        let doc: StatGridDoc = serde_json::from_str(json).unwrap();
        let grid = StatGrid::from_doc(doc, &here()).unwrap();
        let out = serde_json::to_string(&grid.to_doc()).unwrap();
        assert!(out.contains("\"median\":[1.5,null]"), "{out}");
        assert!(!out.contains("year"), "{out}");
    }

    #[test]
    fn unsorted_years_rejected() {
        let mut doc = projection_doc();
        doc.year = Some(vec![2100, 2030]);
        assert!(StatGrid::from_doc(doc, &here()).is_err());
    }

    #[test]
    fn ac_penetration_inside_and_outside() {
        let doc = AcGridDoc {
            lat: vec![0.0, 1.0],
            lon: vec![0.0, 1.0],
            value: vec![0.1, 0.2, f64::NAN, 0.4],
        };
        let ac = AcGrid::from_doc(doc, &here()).unwrap();
        assert_eq!(ac.penetration(LatLon::new(0.9, 1.2)), Some(0.4));
        assert_eq!(ac.penetration(LatLon::new(1.0, 0.0)), None);
        assert_eq!(ac.penetration(LatLon::new(5.0, 0.0)), None);
        assert_eq!(ac.penetration(LatLon::new(-0.4, -0.4)), Some(0.1));
    }

    #[test]
    fn ac_rejects_out_of_range_fraction() {
        let doc = AcGridDoc { lat: vec![0.0], lon: vec![0.0], value: vec![1.5] };
        assert!(AcGrid::from_doc(doc, &here()).is_err());
    }

    #[test]
    fn missing_file_is_grid_error() {
        let err = StatGrid::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, Error::GridAccess { .. }));
    }

    #[test]
    fn truncated_document_is_grid_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ac_penetration.json");
        fs::write(&path, r#"{"lat":[0.0,1.0],"lon":[0.0],"val"#).unwrap();
        let err = AcGrid::load(&path).unwrap_err();
        assert!(matches!(err, Error::GridAccess { .. }), "{err:?}");
        assert!(err.to_string().contains("malformed grid document"), "{err}");
    }
}
