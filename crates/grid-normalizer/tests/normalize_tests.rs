//! Integration tests for document normalization.
//!
//! Lattices use `col * 1000 + row` so the final position of every sample is
//! easy to verify after reorientation.

use field_common::{Field, FieldError};
use grid_normalizer::{normalize, DataType, MaskOrder, NormalizeOptions, UnitConversion};
use serde_json::json;
use test_utils::{
    assert_approx_eq, band_document, band_header, create_test_lattice, present, single_document,
    BandGeometry,
};

fn values(samples: &[Option<f32>]) -> Vec<Option<f32>> {
    samples.to_vec()
}

// =============================================================================
// Band Array Tests
// =============================================================================

#[test]
fn test_north_to_south_band_is_canonical() {
    let geometry = BandGeometry::new(0.0, 10.0, 20.0, 0.0, 3, 2);
    let doc = band_document(&present(&create_test_lattice(3, 2)), None, &geometry);

    let normalized = normalize(&doc, &NormalizeOptions::default()).unwrap();
    let grid = &normalized.grid;

    assert!(normalized.single);
    assert_eq!(grid.cols, 2);
    assert_eq!(grid.rows, 1);
    assert_eq!(grid.extent.to_array(), [0.0, 0.0, 20.0, 10.0]);
    assert_approx_eq!(grid.delta_x, 10.0, 1e-12);
    assert_approx_eq!(grid.delta_y, 10.0, 1e-12);
    assert_eq!(grid.us, present(&create_test_lattice(3, 2)));
}

#[test]
fn test_south_to_north_band_rows_flipped() {
    let geometry = BandGeometry::new(0.0, 0.0, 20.0, 10.0, 3, 2);
    let doc = band_document(&present(&create_test_lattice(3, 2)), None, &geometry);

    let grid = normalize(&doc, &NormalizeOptions::default()).unwrap().grid;

    assert_eq!(grid.extent.to_array(), [0.0, 0.0, 20.0, 10.0]);
    assert_eq!(
        grid.us,
        present(&[1.0, 1001.0, 2001.0, 0.0, 1000.0, 2000.0])
    );
}

#[test]
fn test_descending_longitudes_reversed() {
    let geometry = BandGeometry::new(20.0, 10.0, 0.0, 0.0, 3, 2);
    let doc = band_document(&present(&create_test_lattice(3, 2)), None, &geometry);

    let grid = normalize(&doc, &NormalizeOptions::default()).unwrap().grid;

    assert_eq!(grid.extent.to_array(), [0.0, 0.0, 20.0, 10.0]);
    assert_eq!(
        grid.us,
        present(&[2000.0, 1000.0, 0.0, 2001.0, 1001.0, 1.0])
    );
}

#[test]
fn test_vector_bands() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let us = present(&[3.0, 3.0, 3.0, 3.0]);
    let vs = present(&[4.0, 4.0, 4.0, 4.0]);
    let doc = band_document(&us, Some(&vs), &geometry);

    let normalized = normalize(&doc, &NormalizeOptions::default()).unwrap();
    assert!(!normalized.single);
    assert_eq!(normalized.grid.vs, Some(vs));

    let field = Field::new(normalized.grid);
    assert_approx_eq!(field.value_at(0.5, 0.5).unwrap(), 5.0, 1e-9);
}

#[test]
fn test_unrecognized_bands_skipped() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let doc = json!([
        { "header": band_header(0, 0, &geometry), "data": [9.0, 9.0, 9.0, 9.0] },
        { "header": band_header(1, 2, &geometry), "data": [1.0, 2.0, 3.0, 4.0] },
    ]);

    let normalized = normalize(&doc, &NormalizeOptions::default()).unwrap();
    assert!(normalized.single);
    assert_eq!(normalized.grid.us, present(&[1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn test_null_samples_are_missing() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let doc = band_document(&[Some(1.0), None, Some(3.0), Some(4.0)], None, &geometry);

    let grid = normalize(&doc, &NormalizeOptions::default()).unwrap().grid;
    assert_eq!(grid.missing_count(), 1);
    assert_eq!(grid.u_at(0, 1), None);
}

// =============================================================================
// Single Document Tests
// =============================================================================

#[test]
fn test_single_document_axis_sequences() {
    let data: Vec<f32> = (0..9).map(|v| v as f32).collect();
    let doc = single_document((0.0, 1.0, 3), (-1.0, 1.0, 3), &present(&data));

    let normalized = normalize(&doc, &NormalizeOptions::default()).unwrap();
    let grid = &normalized.grid;

    assert!(normalized.single);
    assert_eq!(grid.extent.to_array(), [0.0, -1.0, 2.0, 1.0]);
    assert_eq!(
        grid.us,
        present(&[6.0, 7.0, 8.0, 3.0, 4.0, 5.0, 0.0, 1.0, 2.0])
    );
}

#[test]
fn test_single_document_inline_header_and_blocks() {
    let doc = json!({
        "header": {
            "lo1": -10.0, "la1": 5.0, "lo2": 10.0, "la2": -5.0,
            "nx": 3, "ny": 2,
            "missing_value": -999.0
        },
        "blocks": [1.0, 2.0, -999.0, 4.0, 5.0, 6.0]
    });

    let grid = normalize(&doc, &NormalizeOptions::default()).unwrap().grid;

    assert_eq!(grid.extent.to_array(), [-10.0, -5.0, 10.0, 5.0]);
    assert_approx_eq!(grid.delta_x, 10.0, 1e-12);
    assert_eq!(
        grid.us,
        values(&[Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)])
    );
}

// =============================================================================
// Transform Tests
// =============================================================================

#[test]
fn test_missing_value_masks_at_or_below() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2).with_missing_value(-999.0);
    let doc = band_document(&present(&[-999.0, -1000.0, 0.0, 5.0]), None, &geometry);

    let grid = normalize(&doc, &NormalizeOptions::default()).unwrap().grid;
    assert_eq!(grid.us, values(&[None, None, Some(0.0), Some(5.0)]));
}

#[test]
fn test_zero_missing_value_still_masks() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2).with_missing_value(0.0);
    let doc = band_document(&present(&[0.0, -1.0, 1.0, 2.0]), None, &geometry);

    let grid = normalize(&doc, &NormalizeOptions::default()).unwrap().grid;
    assert_eq!(grid.us, values(&[None, None, Some(1.0), Some(2.0)]));
}

#[test]
fn test_mask_order() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2).with_missing_value(0.0);
    let doc = band_document(&present(&[0.0, 300.0, 310.0, 400.0]), None, &geometry);

    let mask_first = NormalizeOptions::default().with_unit_conversion(UnitConversion::Subtract(300.0));
    let grid = normalize(&doc, &mask_first).unwrap().grid;
    assert_eq!(grid.us, values(&[None, Some(0.0), Some(10.0), Some(100.0)]));

    let convert_first = mask_first.with_mask_order(MaskOrder::ConvertThenMask);
    let grid = normalize(&doc, &convert_first).unwrap().grid;
    assert_eq!(grid.us, values(&[None, None, Some(10.0), Some(100.0)]));
}

#[test]
fn test_unit_conversion_applies_to_both_components() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let doc = band_document(
        &present(&[100.0; 4]),
        Some(&present(&[200.0; 4])),
        &geometry,
    );

    let options = NormalizeOptions::default().with_unit_conversion(UnitConversion::Divide(100.0));
    let grid = normalize(&doc, &options).unwrap().grid;
    assert_eq!(grid.us, present(&[1.0; 4]));
    assert_eq!(grid.vs, Some(present(&[2.0; 4])));
}

#[test]
fn test_wave_derivation() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    // Direction travels in the U band, height in the V band.
    let directions = [Some(0.0), Some(std::f32::consts::PI), Some(0.0), Some(std::f32::consts::FRAC_PI_2)];
    let heights = [Some(2.0), Some(2.0), None, Some(1.0)];
    let doc = band_document(&directions, Some(&heights), &geometry);

    let grid = normalize(&doc, &NormalizeOptions::default().with_wave(true))
        .unwrap()
        .grid;
    let vs = grid.vs.clone().unwrap();

    assert_approx_eq!(grid.us[0].unwrap(), 0.0, 1e-6);
    assert_approx_eq!(vs[0].unwrap(), -2.0, 1e-6);
    assert_approx_eq!(vs[1].unwrap(), 2.0, 1e-5);
    assert_eq!(grid.us[2], None);
    assert_eq!(vs[2], None);
    assert_approx_eq!(grid.us[3].unwrap(), -1.0, 1e-6);
    assert_approx_eq!(vs[3].unwrap(), 0.0, 1e-6);
}

// =============================================================================
// Payload Tests
// =============================================================================

#[test]
fn test_items_payload() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let payload = json!({ "items": band_document(&present(&[1.0; 4]), None, &geometry) });
    let bytes = serde_json::to_vec(&payload).unwrap();

    let options = NormalizeOptions::default().with_data_type(DataType::Items);
    let normalized = grid_normalizer::normalize_slice(&bytes, &options).unwrap();
    assert_eq!(normalized.grid.vertex_count(), 4);

    let err = grid_normalizer::normalize_slice(&bytes, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::MalformedField(_)));
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_single_point_axis_is_invalid_geometry() {
    let geometry = BandGeometry::new(0.0, 0.0, 0.0, 0.0, 1, 1);
    let doc = band_document(&present(&[1.0]), None, &geometry);

    let err = normalize(&doc, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::InvalidGridGeometry(_)));
}

#[test]
fn test_non_integer_dimensions_are_invalid_geometry() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let mut header = band_header(2, 2, &geometry);
    header["nx"] = json!(2.5);
    let doc = json!([{ "header": header, "data": [1.0, 2.0, 3.0, 4.0] }]);

    let err = normalize(&doc, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::InvalidGridGeometry(_)));
}

#[test]
fn test_overflowing_point_count_is_invalid_geometry() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let mut header = band_header(2, 2, &geometry);
    header["nx"] = json!(4294967296.0);
    header["ny"] = json!(4294967296.0);
    let doc = json!([{ "header": header, "data": [1.0, 2.0, 3.0, 4.0] }]);

    let err = normalize(&doc, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::InvalidGridGeometry(_)));

    let single = json!({
        "header": { "lo1": 0, "la1": 1, "lo2": 1, "la2": 0, "nx": 4294967296.0, "ny": 4294967296.0 },
        "data": [1.0, 2.0, 3.0, 4.0],
    });
    let err = normalize(&single, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::InvalidGridGeometry(_)));
}

#[test]
fn test_data_length_mismatch_is_malformed() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let doc = band_document(&present(&[1.0, 2.0, 3.0]), None, &geometry);

    let err = normalize(&doc, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::MalformedField(_)));
}

#[test]
fn test_missing_u_band_is_malformed() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let doc = json!([{ "header": band_header(2, 3, &geometry), "data": [1.0, 2.0, 3.0, 4.0] }]);

    let err = normalize(&doc, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::MalformedField(_)));
    assert!(err.is_document_error());
}

#[test]
fn test_duplicate_u_band_is_malformed() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let band = json!({ "header": band_header(2, 2, &geometry), "data": [1.0, 2.0, 3.0, 4.0] });
    let doc = json!([band.clone(), band]);

    let err = normalize(&doc, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::MalformedField(_)));
}

#[test]
fn test_mismatched_v_band_is_malformed() {
    let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2);
    let other = BandGeometry::new(0.0, 1.0, 2.0, 0.0, 3, 2);
    let doc = json!([
        { "header": band_header(2, 2, &geometry), "data": [1.0, 2.0, 3.0, 4.0] },
        { "header": band_header(2, 3, &other), "data": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] },
    ]);

    let err = normalize(&doc, &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::MalformedField(_)));
}

#[test]
fn test_unknown_document_shape_is_malformed() {
    let err = normalize(&json!("grid"), &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::MalformedField(_)));

    let err = normalize(&json!({ "header": {} }), &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, FieldError::MalformedField(_)));
}
