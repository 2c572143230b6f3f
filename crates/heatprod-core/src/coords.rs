/// Geographic coordinate types and 1-D coordinate axes.
/// All coordinate math uses f64.

/// A point in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A strictly monotonic coordinate axis (cell centres), ascending or descending.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordAxis {
    values: Vec<f64>,
    ascending: bool,
}

impl CoordAxis {
    /// Build an axis from cell-centre coordinates.
    /// Returns a description of the problem if the axis is empty, contains
    /// non-finite values or is not strictly monotonic.
    pub fn new(values: Vec<f64>) -> Result<Self, String> {
        if values.is_empty() {
            return Err("axis is empty".into());
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(format!("axis contains non-finite value {v}"));
        }
        let ascending = values.len() < 2 || values[1] > values[0];
        let monotonic = values.windows(2).all(|w| if ascending { w[1] > w[0] } else { w[1] < w[0] });
        if !monotonic {
            return Err("axis is not strictly monotonic".into());
        }
        Ok(Self { values, ascending })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Index of the cell centre closest to `q`. Ties go to the lower index.
    /// Queries beyond either end resolve to the edge cell.
    pub fn nearest(&self, q: f64) -> usize {
        let v = &self.values;
        // First index on the far side of q in storage order.
        let i = if self.ascending {
            v.partition_point(|&c| c < q)
        } else {
            v.partition_point(|&c| c > q)
        };
        if i == 0 {
            return 0;
        }
        if i == v.len() {
            return v.len() - 1;
        }
        let below = (q - v[i - 1]).abs();
        let above = (v[i] - q).abs();
        if above < below { i } else { i - 1 }
    }

    /// Half the spacing between the two cells nearest each end, used to
    /// extend coverage past the outermost centres. Single-cell axes have no
    /// known spacing and cover only their centre.
    fn half_spacing(&self) -> (f64, f64) {
        let v = &self.values;
        let n = v.len();
        if n < 2 {
            return (0.0, 0.0);
        }
        ((v[1] - v[0]).abs() / 2.0, (v[n - 1] - v[n - 2]).abs() / 2.0)
    }

    /// Whether `q` lies within the axis extent: outermost centres widened by
    /// half a cell on each side.
    pub fn covers(&self, q: f64) -> bool {
        let v = &self.values;
        let (first, last) = (v[0], v[v.len() - 1]);
        let (h0, h1) = self.half_spacing();
        let (lo, hi) = if self.ascending { (first - h0, last + h1) } else { (last - h1, first + h0) };
        q >= lo && q <= hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_picks_closest_centre() {
        let axis = CoordAxis::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(axis.nearest(0.2), 0);
        assert_eq!(axis.nearest(1.7), 2);
        assert_eq!(axis.nearest(3.0), 3);
    }

    #[test]
    fn nearest_clamps_outside_coverage() {
        let axis = CoordAxis::new(vec![10.0, 20.0, 30.0]).unwrap();
        assert_eq!(axis.nearest(-500.0), 0);
        assert_eq!(axis.nearest(500.0), 2);
    }

    #[test]
    fn tie_resolves_to_lower_index() {
        let asc = CoordAxis::new(vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(asc.nearest(0.5), 0);
        assert_eq!(asc.nearest(1.5), 1);

        let desc = CoordAxis::new(vec![2.0, 1.0, 0.0]).unwrap();
        assert_eq!(desc.nearest(1.5), 0);
        assert_eq!(desc.nearest(0.5), 1);
    }

    #[test]
    fn tie_is_stable_across_calls() {
        let axis = CoordAxis::new(vec![-0.25, 0.25, 0.75]).unwrap();
        let first = axis.nearest(0.5);
        for _ in 0..100 {
            assert_eq!(axis.nearest(0.5), first);
        }
    }

    #[test]
    fn descending_axis_nearest() {
        // Latitude stored north → south, as many climate grids do.
        let axis = CoordAxis::new(vec![89.75, 89.25, 88.75, 88.25]).unwrap();
        assert_eq!(axis.nearest(89.3), 1);
        assert_eq!(axis.nearest(88.0), 3);
        assert_eq!(axis.nearest(95.0), 0);
    }

    #[test]
    fn covers_includes_half_cell_margin() {
        let axis = CoordAxis::new(vec![0.0, 1.0, 2.0]).unwrap();
        assert!(axis.covers(-0.5));
        assert!(axis.covers(2.5));
        assert!(!axis.covers(-0.51));
        assert!(!axis.covers(2.51));

        let desc = CoordAxis::new(vec![2.0, 1.0, 0.0]).unwrap();
        assert!(desc.covers(2.5));
        assert!(!desc.covers(-0.6));
    }

    #[test]
    fn rejects_bad_axes() {
        assert!(CoordAxis::new(vec![]).is_err());
        assert!(CoordAxis::new(vec![0.0, 0.0]).is_err());
        assert!(CoordAxis::new(vec![0.0, 2.0, 1.0]).is_err());
        assert!(CoordAxis::new(vec![0.0, f64::NAN]).is_err());
    }
}
