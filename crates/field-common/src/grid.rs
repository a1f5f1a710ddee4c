//! Canonical grid description shared by every source schema.

use crate::{Extent, FieldError, FieldResult};
use serde::{Deserialize, Serialize};

/// A normalized rectangular lon/lat grid of one (scalar) or two (vector) components.
///
/// `cols`/`rows` count cells; samples live on the `(cols + 1) × (rows + 1)` vertex
/// lattice in row-major order, row 0 being the northern edge (`extent.ymax`).
/// A missing sample is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGrid {
    pub extent: Extent,
    /// Cell width in degrees longitude
    pub delta_x: f64,
    /// Cell height in degrees latitude
    pub delta_y: f64,
    pub cols: usize,
    pub rows: usize,
    pub us: Vec<Option<f32>>,
    pub vs: Option<Vec<Option<f32>>>,
}

impl CanonicalGrid {
    /// Create a grid, checking geometry and sample counts.
    pub fn new(
        extent: Extent,
        delta_x: f64,
        delta_y: f64,
        cols: usize,
        rows: usize,
        us: Vec<Option<f32>>,
        vs: Option<Vec<Option<f32>>>,
    ) -> FieldResult<Self> {
        let grid = Self {
            extent,
            delta_x,
            delta_y,
            cols,
            rows,
            us,
            vs,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Check the grid invariants.
    pub fn validate(&self) -> FieldResult<()> {
        if self.cols == 0 || self.rows == 0 {
            return Err(FieldError::invalid_geometry(format!(
                "grid needs at least one cell, got {}x{}",
                self.cols, self.rows
            )));
        }
        if !self.extent.is_finite() {
            return Err(FieldError::invalid_geometry(format!(
                "extent is not finite: {:?}",
                self.extent.to_array()
            )));
        }
        if !(self.delta_x.is_finite() && self.delta_x > 0.0)
            || !(self.delta_y.is_finite() && self.delta_y > 0.0)
        {
            return Err(FieldError::invalid_geometry(format!(
                "cell size must be positive, got dx={} dy={}",
                self.delta_x, self.delta_y
            )));
        }

        let expected = self.vertex_count();
        if self.us.len() != expected {
            return Err(FieldError::malformed(format!(
                "expected {} U samples for a {}x{} grid, got {}",
                expected,
                self.cols,
                self.rows,
                self.us.len()
            )));
        }
        if let Some(vs) = &self.vs {
            if vs.len() != self.us.len() {
                return Err(FieldError::malformed(format!(
                    "U and V sample counts differ: {} vs {}",
                    self.us.len(),
                    vs.len()
                )));
            }
        }
        Ok(())
    }

    /// Vertices per row.
    pub fn vertex_cols(&self) -> usize {
        self.cols + 1
    }

    /// Vertex rows.
    pub fn vertex_rows(&self) -> usize {
        self.rows + 1
    }

    /// Total number of lattice vertices (samples per component).
    pub fn vertex_count(&self) -> usize {
        self.vertex_cols() * self.vertex_rows()
    }

    /// Scalar grids carry no V component.
    pub fn is_scalar(&self) -> bool {
        self.vs.is_none()
    }

    /// Row-major lattice index of a vertex.
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.vertex_cols() + col
    }

    /// U sample at a lattice vertex.
    pub fn u_at(&self, row: usize, col: usize) -> Option<f32> {
        self.us.get(self.flat_index(row, col)).copied().flatten()
    }

    /// V sample at a lattice vertex; `None` for scalar grids.
    pub fn v_at(&self, row: usize, col: usize) -> Option<f32> {
        let idx = self.flat_index(row, col);
        self.vs.as_ref().and_then(|vs| vs.get(idx).copied().flatten())
    }

    /// Number of missing U samples.
    pub fn missing_count(&self) -> usize {
        self.us.iter().filter(|u| u.is_none()).count()
    }
}
