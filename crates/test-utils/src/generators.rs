//! Generators for synthetic field documents and lattices.
//!
//! Values follow predictable patterns so tests can check exactly where each
//! sample ended up after normalization and mesh generation.

use std::io::Write;

use serde_json::{json, Value};

/// Creates a lattice where each sample is `col * 1000 + row`.
///
/// Row-major, `nx` samples per row, `ny` rows.
///
/// # Example
///
/// ```
/// use test_utils::create_test_lattice;
///
/// let lattice = create_test_lattice(10, 5);
/// assert_eq!(lattice.len(), 50);
/// assert_eq!(lattice[1], 1000.0);  // col=1, row=0
/// assert_eq!(lattice[10], 1.0);    // col=0, row=1
/// ```
pub fn create_test_lattice(nx: usize, ny: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        for col in 0..nx {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates temperature-like samples in Kelvin (250K..310K gradient).
pub fn create_temperature_lattice(nx: usize, ny: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        for col in 0..nx {
            let x_factor = col as f32 / nx.max(1) as f32;
            let y_factor = row as f32 / ny.max(1) as f32;
            data.push(250.0 + x_factor * 30.0 + y_factor * 30.0);
        }
    }
    data
}

/// Wraps every sample as present.
pub fn present(values: &[f32]) -> Vec<Option<f32>> {
    values.iter().copied().map(Some).collect()
}

/// Geometry of a synthetic band header.
#[derive(Debug, Clone, Copy)]
pub struct BandGeometry {
    pub lo1: f64,
    pub la1: f64,
    pub lo2: f64,
    pub la2: f64,
    pub nx: usize,
    pub ny: usize,
    pub missing_value: Option<f64>,
}

impl BandGeometry {
    /// A north-to-south scanned grid of `nx × ny` points.
    pub fn new(lo1: f64, la1: f64, lo2: f64, la2: f64, nx: usize, ny: usize) -> Self {
        Self {
            lo1,
            la1,
            lo2,
            la2,
            nx,
            ny,
            missing_value: None,
        }
    }

    pub fn with_missing_value(mut self, missing_value: f64) -> Self {
        self.missing_value = Some(missing_value);
        self
    }

    pub fn dx(&self) -> f64 {
        if self.nx > 1 {
            ((self.lo2 - self.lo1) / (self.nx - 1) as f64).abs()
        } else {
            0.0
        }
    }

    pub fn dy(&self) -> f64 {
        if self.ny > 1 {
            ((self.la2 - self.la1) / (self.ny - 1) as f64).abs()
        } else {
            0.0
        }
    }
}

/// Build a band header object.
pub fn band_header(category: u32, number: u32, geometry: &BandGeometry) -> Value {
    let mut header = json!({
        "parameterCategory": category,
        "parameterNumber": number,
        "lo1": geometry.lo1,
        "la1": geometry.la1,
        "lo2": geometry.lo2,
        "la2": geometry.la2,
        "dx": geometry.dx(),
        "dy": geometry.dy(),
        "nx": geometry.nx,
        "ny": geometry.ny,
    });
    if let Some(missing) = geometry.missing_value {
        header["missing_value"] = json!(missing);
    }
    header
}

/// Build an array-of-bands document with a U band `(2, 2)` and optional V band `(2, 3)`.
pub fn band_document(
    us: &[Option<f32>],
    vs: Option<&[Option<f32>]>,
    geometry: &BandGeometry,
) -> Value {
    let mut bands = vec![json!({
        "header": band_header(2, 2, geometry),
        "data": us,
    })];
    if let Some(vs) = vs {
        bands.push(json!({
            "header": band_header(2, 3, geometry),
            "data": vs,
        }));
    }
    Value::Array(bands)
}

/// Build a single-document source using named axis sequences.
pub fn single_document(
    lon: (f64, f64, usize),
    lat: (f64, f64, usize),
    data: &[Option<f32>],
) -> Value {
    json!({
        "header": {
            "variables": {
                "lon": { "sequence": { "start": lon.0, "delta": lon.1, "size": lon.2 } },
                "lat": { "sequence": { "start": lat.0, "delta": lat.1, "size": lat.2 } },
            }
        },
        "data": data,
    })
}

/// Write a document into a temporary `.json` file.
pub fn write_document(document: &Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("create temp document");
    file.write_all(document.to_string().as_bytes())
        .expect("write temp document");
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_lattice() {
        let lattice = create_test_lattice(3, 2);
        assert_eq!(lattice, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_band_geometry_spacing() {
        let geometry = BandGeometry::new(0.0, 90.0, 359.0, -90.0, 360, 181);
        assert!((geometry.dx() - 1.0).abs() < 1e-12);
        assert!((geometry.dy() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_band_document_shape() {
        let geometry = BandGeometry::new(0.0, 1.0, 1.0, 0.0, 2, 2).with_missing_value(-999.0);
        let doc = band_document(&present(&[1.0; 4]), Some(&present(&[2.0; 4])), &geometry);
        let bands = doc.as_array().unwrap();
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[1]["header"]["parameterNumber"], 3);
        assert_eq!(bands[0]["header"]["missing_value"], -999.0);
    }
}
