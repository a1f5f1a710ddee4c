//! Tests for mesh and velocity raster generation.

use field_common::{CanonicalGrid, Extent};
use field_renderer::mesh::{generate, CHANNELS};
use test_utils::{assert_approx_eq, create_test_lattice, present};

fn grid(
    extent: [f64; 4],
    delta: (f64, f64),
    cells: (usize, usize),
    us: Vec<Option<f32>>,
    vs: Option<Vec<Option<f32>>>,
) -> CanonicalGrid {
    CanonicalGrid::new(Extent::from(extent), delta.0, delta.1, cells.0, cells.1, us, vs).unwrap()
}

fn red(result: &field_renderer::MeshRasterResult, index: usize) -> u8 {
    result.texel(index).unwrap()[0]
}

fn alpha(result: &field_renderer::MeshRasterResult, index: usize) -> u8 {
    result.texel(index).unwrap()[3]
}

// =============================================================================
// Scalar Grid Tests
// =============================================================================

#[test]
fn test_scalar_single_cell() {
    let grid = grid(
        [-1.0, -1.0, 1.0, 1.0],
        (2.0, 2.0),
        (1, 1),
        present(&[0.0, 10.0, 20.0, 30.0]),
        None,
    );
    let result = generate(&grid).unwrap();

    assert_eq!(result.data_extent[0], 0.0);
    assert_eq!(result.data_extent[1], 30.0);
    assert_eq!(result.data_range, [0.0, 30.0]);
    assert!(result.single);

    assert_eq!(result.vertex_count(), 4);
    assert_eq!(result.triangle_count(), 2);
    assert!(result.indices.iter().all(|i| *i < 4));

    assert_eq!(red(&result, 0), 0);
    assert_eq!(red(&result, 1), 85);
    assert_eq!(red(&result, 3), 255);
    assert!((0..4).all(|i| alpha(&result, i) == 255));
    assert!((0..4).all(|i| result.texel(i).unwrap()[1] == 0));

    assert_eq!(result.vertices, vec![-1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, -1.0]);
    assert_eq!(result.real_extent.to_array(), [-1.0, -1.0, 1.0, 1.0]);
}

#[test]
fn test_lattice_consistency() {
    let grid = grid(
        [0.0, 0.0, 40.0, 20.0],
        (10.0, 10.0),
        (4, 2),
        present(&create_test_lattice(5, 3)),
        None,
    );
    let result = generate(&grid).unwrap();

    assert_eq!(result.vertex_count(), 15);
    assert_eq!(result.triangle_count(), 4 * 2 * 2);
    assert_eq!(result.tex_coords.len(), 15 * 2);
    assert_eq!(result.velocity.len(), 15 * CHANNELS);
    assert!(result.indices.iter().all(|i| (*i as usize) < result.vertex_count()));

    // Last vertex sits at the bottom-right corner with texture coordinate (1, 1).
    assert_eq!(&result.vertices[28..30], &[40.0, 0.0]);
    assert_eq!(&result.tex_coords[28..30], &[1.0, 1.0]);
}

#[test]
fn test_degenerate_range_maps_to_zero() {
    let grid = grid([0.0, 0.0, 1.0, 1.0], (1.0, 1.0), (1, 1), present(&[7.0; 4]), None);
    let result = generate(&grid).unwrap();

    assert_eq!(result.data_range, [7.0, 7.0]);
    assert!((0..4).all(|i| red(&result, i) == 0 && alpha(&result, i) == 255));
}

#[test]
fn test_missing_scalar_sample() {
    let grid = grid(
        [0.0, 0.0, 1.0, 1.0],
        (1.0, 1.0),
        (1, 1),
        vec![Some(1.0), None, Some(3.0), Some(5.0)],
        None,
    );
    let result = generate(&grid).unwrap();

    assert_eq!(result.data_extent[..2], [1.0, 5.0]);
    assert_eq!(alpha(&result, 1), 0);
    assert_eq!(red(&result, 1), 0);
    assert_eq!(red(&result, 2), 127);
}

// =============================================================================
// Vector Grid Tests
// =============================================================================

#[test]
fn test_vector_missing_sample_excluded_from_range() {
    let grid = grid(
        [0.0, 0.0, 1.0, 1.0],
        (1.0, 1.0),
        (1, 1),
        vec![Some(5.0), Some(10.0), None, Some(30.0)],
        Some(present(&[1.0, 2.0, 3.0, 4.0])),
    );
    let result = generate(&grid).unwrap();

    assert!(!result.single);
    assert_eq!(result.data_extent, [5.0, 30.0, 1.0, 4.0]);
    assert_eq!(alpha(&result, 2), 0);
    assert!([0, 1, 3].iter().all(|i| alpha(&result, *i) == 255));

    let texel = result.texel(3).unwrap();
    assert_eq!(texel, [255, 255, 0, 255]);

    assert_eq!(result.data_range[0], 0.0);
    assert_approx_eq!(result.data_range[1], 30.0_f64.hypot(4.0), 1e-9);
}

#[test]
fn test_missing_v_clears_alpha() {
    let grid = grid(
        [0.0, 0.0, 1.0, 1.0],
        (1.0, 1.0),
        (1, 1),
        present(&[1.0, 2.0, 3.0, 4.0]),
        Some(vec![Some(1.0), Some(2.0), Some(3.0), None]),
    );
    let result = generate(&grid).unwrap();
    assert_eq!(alpha(&result, 3), 0);
    assert_eq!(result.data_extent[2..], [1.0, 3.0]);
}

#[test]
fn test_zero_v_range_uses_u_range() {
    let grid = grid(
        [0.0, 0.0, 1.0, 1.0],
        (1.0, 1.0),
        (1, 1),
        present(&[-2.0, 0.0, 2.0, 4.0]),
        Some(present(&[0.0; 4])),
    );
    let result = generate(&grid).unwrap();
    assert_eq!(result.data_range, [-2.0, 4.0]);
}

// =============================================================================
// Antimeridian Tests
// =============================================================================

#[test]
fn test_antimeridian_partition() {
    // Columns at 160, 180, 200, 220; the last two wrap to -160 and -140.
    let row = [0.0, 1.0, 2.0, 3.0];
    let us: Vec<f32> = row.iter().chain(row.iter()).copied().collect();
    let grid = grid([160.0, -10.0, 220.0, 10.0], (20.0, 20.0), (3, 1), present(&us), None);
    let result = generate(&grid).unwrap();

    assert_eq!(result.vertex_count(), 8);
    let row0_x: Vec<f32> = result.vertices[0..8].iter().step_by(2).copied().collect();
    assert_eq!(row0_x, vec![-160.0, -140.0, 160.0, 180.0]);
    let row1_x: Vec<f32> = result.vertices[8..16].iter().step_by(2).copied().collect();
    assert_eq!(row1_x, vec![-160.0, -140.0, 160.0, 180.0]);

    // Colors follow their vertices.
    let reds: Vec<u8> = (0..4).map(|i| red(&result, i)).collect();
    assert_eq!(reds, vec![170, 255, 0, 85]);

    // Texture coordinates stay in lattice order.
    assert_eq!(&result.tex_coords[0..4], &[0.0, 0.0, 1.0 / 3.0, 0.0]);

    assert_eq!(result.real_extent.to_array(), [-160.0, -10.0, 180.0, 10.0]);
    assert!(!result.real_extent.crosses_antimeridian());
    assert!(result.indices.iter().all(|i| *i < 8));
}

#[test]
fn test_zero_to_360_grid_wraps_into_range() {
    let us = present(&create_test_lattice(5, 3));
    let grid = grid(test_utils::extent::GLOBAL_0_360, (90.0, 90.0), (4, 2), us, None);
    let result = generate(&grid).unwrap();

    for pair in result.vertices.chunks_exact(2) {
        assert!((-180.0..=180.0).contains(&pair[0]), "x = {}", pair[0]);
    }
    // 270 → -90 and 360 → 0 lead each row.
    assert_eq!(&result.vertices[0..4], &[-90.0, 90.0, 0.0, 90.0]);
    assert_eq!(result.real_extent.xmin, -90.0);
    assert_eq!(result.real_extent.xmax, 180.0);
}

// =============================================================================
// Output Tests
// =============================================================================

#[test]
fn test_image_and_byte_views() {
    let grid = grid(
        [0.0, 0.0, 2.0, 1.0],
        (1.0, 1.0),
        (2, 1),
        present(&create_test_lattice(3, 2)),
        None,
    );
    let result = generate(&grid).unwrap();

    let image = result.image().unwrap();
    assert_eq!(image.dimensions(), (3, 2));
    assert_eq!(image.as_raw(), &result.velocity);

    assert_eq!(result.vertices_bytes().len(), result.vertices.len() * 4);
    assert_eq!(result.indices_bytes().len(), result.indices.len() * 4);
    assert_eq!(result.tex_coords_bytes().len(), result.tex_coords.len() * 4);
}

#[test]
fn test_generation_is_deterministic() {
    let us = present(&create_test_lattice(41, 21));
    let grid = grid([0.0, 0.0, 400.0, 200.0], (10.0, 10.0), (40, 20), us, None);
    assert_eq!(generate(&grid).unwrap(), generate(&grid).unwrap());
}
