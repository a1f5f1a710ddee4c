//! Document → canonical grid.

use field_common::{CanonicalGrid, Extent, FieldError, FieldResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{parse_document, DataType, RawGrid};
use crate::transform::{convert_units, derive_wave_components, mask_missing, MaskOrder, UnitConversion};

/// Options controlling post-extraction transforms.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Treat the U/V slots as wave direction (radians) and height.
    pub wave: bool,
    /// Conversion applied to every present sample.
    pub unit_conversion: UnitConversion,
    /// Whether `missing_value` applies before or after conversion.
    pub mask_order: MaskOrder,
    /// How the payload wraps the document.
    pub data_type: DataType,
}

impl NormalizeOptions {
    pub fn with_wave(mut self, wave: bool) -> Self {
        self.wave = wave;
        self
    }

    pub fn with_unit_conversion(mut self, conversion: UnitConversion) -> Self {
        self.unit_conversion = conversion;
        self
    }

    pub fn with_mask_order(mut self, order: MaskOrder) -> Self {
        self.mask_order = order;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }
}

/// Result of normalization.
#[derive(Debug, Clone)]
pub struct NormalizedGrid {
    pub grid: CanonicalGrid,
    /// True for scalar fields (no V component).
    pub single: bool,
}

/// Parse a fetched JSON payload, unwrap it per `options.data_type` and normalize.
pub fn normalize_slice(bytes: &[u8], options: &NormalizeOptions) -> FieldResult<NormalizedGrid> {
    let payload: Value = serde_json::from_slice(bytes)?;
    normalize_payload(payload, options)
}

/// Unwrap an already parsed payload per `options.data_type` and normalize.
pub fn normalize_payload(payload: Value, options: &NormalizeOptions) -> FieldResult<NormalizedGrid> {
    let document = options.data_type.extract(payload)?;
    normalize(&document, options)
}

/// Normalize one source document into a canonical grid.
pub fn normalize(document: &Value, options: &NormalizeOptions) -> FieldResult<NormalizedGrid> {
    let mut raw = parse_document(document)?;

    if options.mask_order == MaskOrder::MaskThenConvert {
        apply_mask(&mut raw);
    }

    if options.wave {
        match raw.vs.as_mut() {
            Some(vs) => derive_wave_components(&mut raw.us, vs),
            None => {
                warn!("Wave derivation requested but the document has no height band");
                return Err(FieldError::malformed(
                    "wave derivation needs both direction (U) and height (V) bands",
                ));
            }
        }
    }

    convert_units(&mut raw.us, &options.unit_conversion);
    if let Some(vs) = raw.vs.as_mut() {
        convert_units(vs, &options.unit_conversion);
    }

    if options.mask_order == MaskOrder::ConvertThenMask {
        apply_mask(&mut raw);
    }

    let single = raw.vs.is_none();
    let grid = reorient(raw)?;

    debug!(
        cols = grid.cols,
        rows = grid.rows,
        single,
        missing = grid.missing_count(),
        extent = ?grid.extent.to_array(),
        "Normalized field document"
    );

    Ok(NormalizedGrid { grid, single })
}

fn apply_mask(raw: &mut RawGrid) {
    let Some(missing_value) = raw.missing_value else {
        return;
    };
    let mut masked = mask_missing(&mut raw.us, missing_value);
    if let Some(vs) = raw.vs.as_mut() {
        masked += mask_missing(vs, missing_value);
    }
    debug!(missing_value, masked, "Masked missing samples");
}

/// Reorder samples so rows run north→south and columns west→east.
fn reorient(raw: RawGrid) -> FieldResult<CanonicalGrid> {
    let RawGrid { x, y, us, vs, .. } = raw;
    let flip_cols = !x.ascending();
    let flip_rows = y.ascending();

    let reorder = |samples: Vec<Option<f32>>| -> Vec<Option<f32>> {
        if !flip_cols && !flip_rows {
            return samples;
        }
        let mut out = Vec::with_capacity(samples.len());
        for row in 0..y.count {
            let src_row = if flip_rows { y.count - 1 - row } else { row };
            let start = src_row * x.count;
            let row_samples = &samples[start..start + x.count];
            if flip_cols {
                out.extend(row_samples.iter().rev());
            } else {
                out.extend_from_slice(row_samples);
            }
        }
        out
    };

    let us = reorder(us);
    let vs = vs.map(reorder);

    CanonicalGrid::new(
        Extent::new(x.min(), y.min(), x.max(), y.max()),
        x.step,
        y.step,
        x.count - 1,
        y.count - 1,
        us,
        vs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn band(category: u32, number: u32, la1: f64, la2: f64, data: Value) -> Value {
        json!({
            "header": {
                "parameterCategory": category, "parameterNumber": number,
                "lo1": 0.0, "la1": la1, "lo2": 1.0, "la2": la2,
                "dx": 1.0, "dy": 1.0, "nx": 2, "ny": 2
            },
            "data": data
        })
    }

    #[test]
    fn test_south_to_north_rows_are_flipped() {
        let doc = json!([band(2, 2, 0.0, 1.0, json!([1.0, 2.0, 3.0, 4.0]))]);
        let normalized = normalize(&doc, &NormalizeOptions::default()).unwrap();
        assert_eq!(
            normalized.grid.us,
            vec![Some(3.0), Some(4.0), Some(1.0), Some(2.0)]
        );
        assert_eq!(normalized.grid.extent.to_array(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_north_to_south_rows_are_kept() {
        let doc = json!([band(2, 2, 1.0, 0.0, json!([1.0, 2.0, 3.0, 4.0]))]);
        let normalized = normalize(&doc, &NormalizeOptions::default()).unwrap();
        assert_eq!(
            normalized.grid.us,
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]
        );
        assert!(normalized.single);
    }

    #[test]
    fn test_wave_without_height_band() {
        let doc = json!([band(2, 2, 1.0, 0.0, json!([1.0, 2.0, 3.0, 4.0]))]);
        let err = normalize(&doc, &NormalizeOptions::default().with_wave(true)).unwrap_err();
        assert!(matches!(err, FieldError::MalformedField(_)));
    }

    #[test]
    fn test_items_payload() {
        let payload = json!({ "items": [band(2, 2, 1.0, 0.0, json!([1.0, 2.0, 3.0, 4.0]))] });
        let options = NormalizeOptions::default().with_data_type(DataType::Items);
        let bytes = serde_json::to_vec(&payload).unwrap();
        let normalized = normalize_slice(&bytes, &options).unwrap();
        assert_eq!(normalized.grid.cols, 1);

        let err = normalize_slice(b"not json", &options).unwrap_err();
        assert!(matches!(err, FieldError::MalformedField(_)));
    }
}
