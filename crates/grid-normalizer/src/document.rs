//! Source document schemas.
//!
//! Documents are parsed into a [`RawGrid`] that still follows the source scan
//! order; reorientation happens in [`crate::normalize`].

use field_common::{FieldError, FieldResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// How the fetched payload wraps the field document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// The payload is the document.
    #[default]
    Json,
    /// The document sits under a top-level `items` member.
    Items,
}

impl DataType {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "items" | "zip" => Self::Items,
            _ => Self::Json,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Items => "items",
        }
    }

    /// Pull the field document out of a fetched payload.
    pub fn extract(&self, payload: Value) -> FieldResult<Value> {
        match self {
            Self::Json => Ok(payload),
            Self::Items => match payload {
                Value::Object(mut map) => map
                    .remove("items")
                    .ok_or_else(|| FieldError::malformed("bundled document has no `items` member")),
                _ => Err(FieldError::malformed("bundled document must be an object")),
            },
        }
    }
}

/// Which vector component a band carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRole {
    U,
    V,
}

impl ComponentRole {
    /// Map a `(parameterCategory, parameterNumber)` pair to a component.
    pub fn from_parameter(category: i64, number: i64) -> Option<Self> {
        match (category, number) {
            (1, 2) | (2, 2) => Some(Self::U),
            (1, 3) | (2, 3) => Some(Self::V),
            _ => None,
        }
    }
}

/// Header of one band in the array-of-bands form.
#[derive(Debug, Clone, Deserialize)]
pub struct BandHeader {
    #[serde(rename = "parameterCategory", default, deserialize_with = "parameter_code")]
    pub parameter_category: Option<i64>,
    #[serde(rename = "parameterNumber", default, deserialize_with = "parameter_code")]
    pub parameter_number: Option<i64>,
    pub lo1: f64,
    pub la1: f64,
    pub lo2: f64,
    pub la2: f64,
    #[serde(default)]
    pub dx: Option<f64>,
    #[serde(default)]
    pub dy: Option<f64>,
    pub nx: f64,
    pub ny: f64,
    #[serde(default)]
    pub missing_value: Option<f64>,
}

impl BandHeader {
    pub fn role(&self) -> Option<ComponentRole> {
        ComponentRole::from_parameter(self.parameter_category?, self.parameter_number?)
    }
}

/// `{start, delta, size}` description of a regularly spaced axis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisSequence {
    pub start: f64,
    pub delta: f64,
    pub size: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct AxisVariable {
    sequence: AxisSequence,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Variables {
    lat: Option<AxisVariable>,
    latitude: Option<AxisVariable>,
    lon: Option<AxisVariable>,
    longitude: Option<AxisVariable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SingleHeader {
    #[serde(default)]
    variables: Variables,
    lo1: Option<f64>,
    la1: Option<f64>,
    lo2: Option<f64>,
    la2: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    nx: Option<f64>,
    ny: Option<f64>,
    missing_value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct SingleDocument {
    header: SingleHeader,
    #[serde(default)]
    data: Option<Vec<Option<f32>>>,
    #[serde(default)]
    blocks: Option<Vec<Option<f32>>>,
}

/// One axis of a grid in source scan order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    /// Coordinate of the first sample along the axis
    pub first: f64,
    /// Coordinate of the last sample along the axis
    pub last: f64,
    /// Absolute spacing between samples
    pub step: f64,
    /// Number of samples
    pub count: usize,
}

impl Axis {
    fn from_bounds(name: &str, first: f64, last: f64, step: Option<f64>, count: f64) -> FieldResult<Self> {
        let count = point_count(name, count)?;
        let step = match step {
            Some(step) if step.is_finite() && step != 0.0 => step.abs(),
            _ => ((last - first) / (count - 1) as f64).abs(),
        };
        Ok(Self {
            first,
            last,
            step,
            count,
        })
    }

    fn from_sequence(name: &str, sequence: &AxisSequence) -> FieldResult<Self> {
        let count = point_count(name, sequence.size)?;
        Ok(Self {
            first: sequence.start,
            last: sequence.start + sequence.delta * (count - 1) as f64,
            step: sequence.delta.abs(),
            count,
        })
    }

    /// Samples run toward increasing coordinates.
    pub fn ascending(&self) -> bool {
        self.last >= self.first
    }

    pub fn min(&self) -> f64 {
        self.first.min(self.last)
    }

    pub fn max(&self) -> f64 {
        self.first.max(self.last)
    }
}

/// Grid as read from the source, before masking and reorientation.
#[derive(Debug, Clone)]
pub struct RawGrid {
    pub x: Axis,
    pub y: Axis,
    pub us: Vec<Option<f32>>,
    pub vs: Option<Vec<Option<f32>>>,
    pub missing_value: Option<f64>,
}

/// Parse either document shape.
pub fn parse_document(document: &Value) -> FieldResult<RawGrid> {
    match document {
        Value::Array(bands) => parse_bands(bands),
        Value::Object(_) => parse_single(document),
        _ => Err(FieldError::malformed(
            "document must be an array of bands or an object with a header",
        )),
    }
}

fn parse_bands(bands: &[Value]) -> FieldResult<RawGrid> {
    let mut u_band: Option<(BandHeader, &Value)> = None;
    let mut v_band: Option<(BandHeader, &Value)> = None;

    for (index, band) in bands.iter().enumerate() {
        let header_value = band
            .get("header")
            .ok_or_else(|| FieldError::malformed(format!("band {} has no header", index)))?;

        let category = header_value.get("parameterCategory").and_then(code_value);
        let number = header_value.get("parameterNumber").and_then(code_value);
        let role = match (category, number) {
            (Some(category), Some(number)) => ComponentRole::from_parameter(category, number),
            _ => None,
        };
        let Some(role) = role else {
            debug!(index, ?category, ?number, "Skipping band with unrecognized parameter");
            continue;
        };

        let header: BandHeader = serde_json::from_value(header_value.clone())?;
        let slot = match role {
            ComponentRole::U => &mut u_band,
            ComponentRole::V => &mut v_band,
        };
        if slot.is_some() {
            return Err(FieldError::malformed(format!(
                "document carries more than one {:?} band",
                role
            )));
        }
        *slot = Some((header, band));
    }

    let (u_header, u_band) =
        u_band.ok_or_else(|| FieldError::malformed("no U-component band (category/number 1|2,2)"))?;

    let x = Axis::from_bounds("nx", u_header.lo1, u_header.lo2, u_header.dx, u_header.nx)?;
    let y = Axis::from_bounds("ny", u_header.la1, u_header.la2, u_header.dy, u_header.ny)?;
    let expected = total_points(&x, &y)?;

    let us = band_data(u_band, expected, "U")?;
    let vs = match v_band {
        Some((v_header, v_band)) => {
            if v_header.nx != u_header.nx || v_header.ny != u_header.ny {
                return Err(FieldError::malformed(format!(
                    "V band is {}x{} but U band is {}x{}",
                    v_header.nx, v_header.ny, u_header.nx, u_header.ny
                )));
            }
            Some(band_data(v_band, expected, "V")?)
        }
        None => None,
    };

    debug!(
        nx = x.count,
        ny = y.count,
        vector = vs.is_some(),
        "Selected band components"
    );

    Ok(RawGrid {
        x,
        y,
        us,
        vs,
        missing_value: u_header.missing_value,
    })
}

fn parse_single(document: &Value) -> FieldResult<RawGrid> {
    let document: SingleDocument = serde_json::from_value(document.clone())?;
    let header = &document.header;

    let lat = header
        .variables
        .lat
        .as_ref()
        .or(header.variables.latitude.as_ref());
    let y = match lat {
        Some(variable) => Axis::from_sequence("lat size", &variable.sequence)?,
        None => Axis::from_bounds(
            "ny",
            require(header.la1, "la1")?,
            require(header.la2, "la2")?,
            header.dy,
            require(header.ny, "ny")?,
        )?,
    };

    let lon = header
        .variables
        .lon
        .as_ref()
        .or(header.variables.longitude.as_ref());
    let x = match lon {
        Some(variable) => Axis::from_sequence("lon size", &variable.sequence)?,
        None => Axis::from_bounds(
            "nx",
            require(header.lo1, "lo1")?,
            require(header.lo2, "lo2")?,
            header.dx,
            require(header.nx, "nx")?,
        )?,
    };

    let us = document
        .data
        .or(document.blocks)
        .ok_or_else(|| FieldError::malformed("document has neither `data` nor `blocks`"))?;
    check_len(&us, total_points(&x, &y)?, "data")?;

    Ok(RawGrid {
        x,
        y,
        us,
        vs: None,
        missing_value: header.missing_value,
    })
}

fn band_data(band: &Value, expected: usize, name: &str) -> FieldResult<Vec<Option<f32>>> {
    let data = band
        .get("data")
        .ok_or_else(|| FieldError::malformed(format!("{} band has no data", name)))?;
    let data: Vec<Option<f32>> = serde_json::from_value(data.clone())?;
    check_len(&data, expected, name)?;
    Ok(data)
}

fn check_len(data: &[Option<f32>], expected: usize, name: &str) -> FieldResult<()> {
    if data.len() != expected {
        return Err(FieldError::malformed(format!(
            "{} has {} samples, header declares {}",
            name,
            data.len(),
            expected
        )));
    }
    Ok(())
}

fn require(value: Option<f64>, name: &str) -> FieldResult<f64> {
    value.ok_or_else(|| FieldError::malformed(format!("header is missing `{}`", name)))
}

/// Validate a declared point count. A grid needs two points per axis to span one cell.
/// Sample count of an `x × y` lattice.
fn total_points(x: &Axis, y: &Axis) -> FieldResult<usize> {
    x.count.checked_mul(y.count).ok_or_else(|| {
        FieldError::invalid_geometry(format!("{} x {} points overflow", x.count, y.count))
    })
}

fn point_count(name: &str, value: f64) -> FieldResult<usize> {
    if !value.is_finite() || value <= 0.0 || value.fract() != 0.0 {
        return Err(FieldError::invalid_geometry(format!(
            "{} must be a positive integer, got {}",
            name, value
        )));
    }
    if value < 2.0 {
        return Err(FieldError::invalid_geometry(format!(
            "{} = {} spans no grid cell",
            name, value
        )));
    }
    Ok(value as usize)
}

/// Parameter codes show up both as numbers and as numeric strings.
fn code_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parameter_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(code_value))
}
