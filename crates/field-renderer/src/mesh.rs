//! Mesh and value-raster generation from a canonical grid.
//!
//! For a grid of `cols × rows` cells the generator emits a `(cols+1) × (rows+1)`
//! vertex lattice:
//!
//! - **positions**: `(lon, lat)` pairs, top row at `ymax`. Longitudes outside
//!   `[-180, 180]` are wrapped and, within each row, placed ahead of the
//!   unwrapped vertices so no triangle spans the whole map.
//! - **indices**: two triangles per cell addressed by row-major lattice index
//! - **texture coordinates**: `(col / cols, row / rows)`
//! - **velocity raster**: RGBA per vertex, R/G the normalized U/V components,
//!   A = 0 where a sample is missing
//!
//! Rows are built in parallel and joined in row order, so output is
//! deterministic.

use std::time::Instant;

use field_common::{normalize_longitude, CanonicalGrid, Extent, FieldError, FieldResult};
use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

/// Channels per raster pixel.
pub const CHANNELS: usize = 4;

/// Buffers produced for one grid snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRasterResult {
    /// `(x, y)` in degrees per vertex, split at the antimeridian
    pub vertices: Vec<f32>,
    /// Triangle index triples into the row-major lattice
    pub indices: Vec<u32>,
    /// `(u, v)` in `[0, 1]` per vertex, in lattice order
    pub tex_coords: Vec<f32>,
    /// RGBA per vertex
    pub velocity: Vec<u8>,
    /// `[uMin, uMax, vMin, vMax]` used to normalize the raster
    pub data_extent: [f64; 4],
    /// Bounding box of the emitted (wrapped) vertex positions
    pub real_extent: Extent,
    /// Display range: `[uMin, uMax]` or `[0, max corner magnitude]` for vectors
    pub data_range: [f64; 2],
    /// Cell columns
    pub width: usize,
    /// Cell rows
    pub height: usize,
    /// Scalar field (no V component)
    pub single: bool,
}

impl MeshRasterResult {
    /// Vertices per row.
    pub fn vertex_cols(&self) -> usize {
        self.width + 1
    }

    /// Vertex rows.
    pub fn vertex_rows(&self) -> usize {
        self.height + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// RGBA texel of the vertex at `index` in emitted order.
    pub fn texel(&self, index: usize) -> Option<[u8; 4]> {
        let start = index * CHANNELS;
        let texel = self.velocity.get(start..start + CHANNELS)?;
        Some([texel[0], texel[1], texel[2], texel[3]])
    }

    pub fn vertices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn tex_coords_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tex_coords)
    }

    /// The velocity raster as a `(cols+1) × (rows+1)` image.
    pub fn image(&self) -> FieldResult<RgbaImage> {
        let width = self.vertex_cols() as u32;
        let height = self.vertex_rows() as u32;
        RgbaImage::from_raw(width, height, self.velocity.clone()).ok_or_else(|| {
            FieldError::Encoding(format!(
                "velocity buffer holds {} bytes, {}x{} raster needs {}",
                self.velocity.len(),
                width,
                height,
                width as usize * height as usize * CHANNELS
            ))
        })
    }
}

/// Per-component normalization domains.
#[derive(Debug, Clone, Copy)]
struct Ranges {
    u: (f64, f64),
    v: Option<(f64, f64)>,
}

/// Positions, colors and extent of one lattice row after partitioning.
struct RowBuffers {
    positions: Vec<f32>,
    colors: Vec<u8>,
    extent: Extent,
}

/// Generate mesh buffers and the velocity raster for a grid.
///
/// The lattice is `(grid.cols + 1) × (grid.rows + 1)`.
pub fn generate(grid: &CanonicalGrid) -> FieldResult<MeshRasterResult> {
    let start = Instant::now();
    grid.validate()?;

    let (cols, rows) = (grid.cols, grid.rows);
    let vertex_count = grid.vertex_count();
    if vertex_count > u32::MAX as usize {
        return Err(FieldError::generation_failed(format!(
            "{} vertices exceed 32-bit index range",
            vertex_count
        )));
    }

    let u_range = component_range(&grid.us);
    let v_range = grid.vs.as_deref().map(component_range);
    let ranges = Ranges {
        u: u_range.unwrap_or((0.0, 0.0)),
        v: v_range.map(|range| range.unwrap_or((0.0, 0.0))),
    };

    let row_buffers: Vec<RowBuffers> = (0..=rows)
        .into_par_iter()
        .map(|row| build_row(grid, row, &ranges))
        .collect();

    let mut vertices = Vec::with_capacity(vertex_count * 2);
    let mut velocity = Vec::with_capacity(vertex_count * CHANNELS);
    let mut real_extent = Extent::empty();
    for row in row_buffers {
        vertices.extend_from_slice(&row.positions);
        velocity.extend_from_slice(&row.colors);
        real_extent.include(row.extent.xmin, row.extent.ymin);
        real_extent.include(row.extent.xmax, row.extent.ymax);
    }

    let (u_min, u_max) = ranges.u;
    let (v_min, v_max) = ranges.v.unwrap_or((0.0, 0.0));
    let data_range = match ranges.v {
        Some(_) if v_min != 0.0 || v_max != 0.0 => [
            0.0,
            [(u_min, v_min), (u_min, v_max), (u_max, v_min), (u_max, v_max)]
                .iter()
                .map(|(u, v)| u.hypot(*v))
                .fold(0.0, f64::max),
        ],
        _ => [u_min, u_max],
    };

    let result = MeshRasterResult {
        vertices,
        indices: triangle_indices(cols, rows),
        tex_coords: texture_coordinates(cols, rows),
        velocity,
        data_extent: [u_min, u_max, v_min, v_max],
        real_extent,
        data_range,
        width: cols,
        height: rows,
        single: grid.is_scalar(),
    };

    debug!(
        cols,
        rows,
        vertices = result.vertex_count(),
        triangles = result.triangle_count(),
        real_extent = ?result.real_extent.to_array(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Generated mesh"
    );

    Ok(result)
}

/// `(min, max)` over present, finite samples.
pub fn component_range(samples: &[Option<f32>]) -> Option<(f64, f64)> {
    samples
        .iter()
        .flatten()
        .map(|v| *v as f64)
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Scale `value` into `0..=255`; a degenerate range maps to 0.
fn channel(value: f64, (min, max): (f64, f64)) -> u8 {
    let span = max - min;
    if span.is_nan() || span <= 0.0 {
        return 0;
    }
    // `as` saturates and truncates toward zero.
    (255.0 * (value - min) / span) as u8
}

fn vertex_color(grid: &CanonicalGrid, row: usize, col: usize, ranges: &Ranges) -> [u8; 4] {
    let u = grid.u_at(row, col).map(f64::from).filter(|v| v.is_finite());
    let (v, v_missing) = match ranges.v {
        Some(_) => {
            let v = grid.v_at(row, col).map(f64::from).filter(|v| v.is_finite());
            (v, v.is_none())
        }
        None => (None, false),
    };

    let r = u.map(|u| channel(u, ranges.u)).unwrap_or(0);
    let g = match (v, ranges.v) {
        (Some(v), Some(range)) => channel(v, range),
        _ => 0,
    };
    let a = if u.is_none() || v_missing { 0 } else { 255 };
    [r, g, 0, a]
}

fn build_row(grid: &CanonicalGrid, row: usize, ranges: &Ranges) -> RowBuffers {
    let vertex_cols = grid.vertex_cols();
    let y = grid.extent.ymax - row as f64 * grid.delta_y;

    let mut wrapped_positions = Vec::new();
    let mut wrapped_colors = Vec::new();
    let mut positions = Vec::with_capacity(vertex_cols * 2);
    let mut colors = Vec::with_capacity(vertex_cols * CHANNELS);
    let mut extent = Extent::empty();

    for col in 0..vertex_cols {
        let raw_x = grid.extent.xmin + col as f64 * grid.delta_x;
        let color = vertex_color(grid, row, col, ranges);

        if raw_x < -180.0 || raw_x > 180.0 {
            let x = normalize_longitude(raw_x);
            extent.include(x, y);
            wrapped_positions.extend_from_slice(&[x as f32, y as f32]);
            wrapped_colors.extend_from_slice(&color);
        } else {
            extent.include(raw_x, y);
            positions.extend_from_slice(&[raw_x as f32, y as f32]);
            colors.extend_from_slice(&color);
        }
    }

    wrapped_positions.append(&mut positions);
    wrapped_colors.append(&mut colors);
    RowBuffers {
        positions: wrapped_positions,
        colors: wrapped_colors,
        extent,
    }
}

/// Two triangles per cell: `(n, r, o)` and `(r, x, o)`.
fn triangle_indices(cols: usize, rows: usize) -> Vec<u32> {
    let w = (cols + 1) as u32;
    let mut indices = Vec::with_capacity(cols * rows * 6);
    for i in 0..rows as u32 {
        for j in 0..cols as u32 {
            let n = j + w * i;
            let r = j + w * (i + 1);
            let x = j + 1 + w * (i + 1);
            let o = j + 1 + w * i;
            indices.extend_from_slice(&[n, r, o, r, x, o]);
        }
    }
    indices
}

fn texture_coordinates(cols: usize, rows: usize) -> Vec<f32> {
    let mut coords = Vec::with_capacity((cols + 1) * (rows + 1) * 2);
    for i in 0..=rows {
        for j in 0..=cols {
            coords.push(j as f32 / cols as f32);
            coords.push(i as f32 / rows as f32);
        }
    }
    coords
}
