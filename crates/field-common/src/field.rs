//! Immutable, queryable field over a canonical grid.

use std::sync::Arc;

use crate::CanonicalGrid;

/// Interpolated value of a field at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldValue {
    /// First (or only) component
    pub u: f64,
    /// Second component, present for vector fields
    pub v: Option<f64>,
}

impl FieldValue {
    /// Vector magnitude, or the absolute value for scalars.
    pub fn magnitude(&self) -> f64 {
        match self.v {
            Some(v) => (self.u * self.u + v * v).sqrt(),
            None => self.u.abs(),
        }
    }

    /// The scalar value for scalar fields, the magnitude for vector fields.
    pub fn value(&self) -> f64 {
        match self.v {
            Some(_) => self.magnitude(),
            None => self.u,
        }
    }
}

/// A loaded dataset ready for point queries.
///
/// Cheap to clone: the grid is shared.
#[derive(Debug, Clone)]
pub struct Field {
    grid: Arc<CanonicalGrid>,
}

impl Field {
    pub fn new(grid: CanonicalGrid) -> Self {
        Self {
            grid: Arc::new(grid),
        }
    }

    pub fn from_shared(grid: Arc<CanonicalGrid>) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &Arc<CanonicalGrid> {
        &self.grid
    }

    /// `[xmin, ymin, xmax, ymax]`.
    pub fn extent(&self) -> [f64; 4] {
        self.grid.extent.to_array()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols
    }

    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    pub fn is_scalar(&self) -> bool {
        self.grid.is_scalar()
    }

    /// Bilinear sample at a lon/lat position.
    ///
    /// Returns `None` outside the extent or when any of the four enclosing
    /// samples is missing. Longitudes are also tried at ±360° so a query in
    /// `[-180, 180)` finds data on a `0..360` grid.
    pub fn interpolated_value_at(&self, lon: f64, lat: f64) -> Option<FieldValue> {
        let (col_f, row_f) = self.lattice_position(lon, lat)?;
        let grid = &self.grid;

        // Upper cell edge maps onto the last cell with a full weight.
        let c0 = (col_f.floor() as usize).min(grid.cols - 1);
        let r0 = (row_f.floor() as usize).min(grid.rows - 1);
        let xf = col_f - c0 as f64;
        let yf = row_f - r0 as f64;

        let u = bilinear(
            grid.u_at(r0, c0)?,
            grid.u_at(r0, c0 + 1)?,
            grid.u_at(r0 + 1, c0)?,
            grid.u_at(r0 + 1, c0 + 1)?,
            xf,
            yf,
        );

        let v = if grid.is_scalar() {
            None
        } else {
            Some(bilinear(
                grid.v_at(r0, c0)?,
                grid.v_at(r0, c0 + 1)?,
                grid.v_at(r0 + 1, c0)?,
                grid.v_at(r0 + 1, c0 + 1)?,
                xf,
                yf,
            ))
        };

        Some(FieldValue { u, v })
    }

    /// Scalar value (or vector magnitude) at a lon/lat position.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f64> {
        self.interpolated_value_at(lon, lat).map(|value| value.value())
    }

    /// Fractional (column, row) lattice coordinates of a point inside the extent.
    fn lattice_position(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let grid = &self.grid;
        let extent = &grid.extent;

        if !lon.is_finite() || !extent.contains_y(lat) {
            return None;
        }
        let lon = [lon, lon + 360.0, lon - 360.0]
            .into_iter()
            .find(|candidate| extent.contains_x(*candidate))?;

        let col_f = ((lon - extent.xmin) / grid.delta_x).clamp(0.0, grid.cols as f64);
        let row_f = ((extent.ymax - lat) / grid.delta_y).clamp(0.0, grid.rows as f64);
        Some((col_f, row_f))
    }
}

/// Weighted average of four corner samples.
fn bilinear(v00: f32, v10: f32, v01: f32, v11: f32, xf: f64, yf: f64) -> f64 {
    let top = v00 as f64 * (1.0 - xf) + v10 as f64 * xf;
    let bottom = v01 as f64 * (1.0 - xf) + v11 as f64 * xf;
    top * (1.0 - yf) + bottom * yf
}
