//! Sample transforms applied after extraction: wave derivation, unit
//! conversion and missing-value masking.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Unit conversion applied to every present sample.
///
/// Supports subtraction (K→°C), division (Pa→hPa), linear (scale + offset)
/// and arbitrary caller-supplied functions.
#[derive(Clone, Default)]
pub enum UnitConversion {
    /// No conversion
    #[default]
    None,
    /// Subtract a value (e.g. K→°C: subtract 273.15)
    Subtract(f64),
    /// Divide by a value (e.g. Pa→hPa: divide by 100)
    Divide(f64),
    /// `value * scale + offset`
    Linear { scale: f64, offset: f64 },
    /// Caller-supplied conversion
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl UnitConversion {
    /// Kelvin to degrees Celsius.
    pub fn kelvin_to_celsius() -> Self {
        Self::Subtract(273.15)
    }

    /// Wrap a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Apply the conversion to a value.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::Subtract(offset) => value - offset,
            Self::Divide(divisor) => value / divisor,
            Self::Linear { scale, offset } => value * scale + offset,
            Self::Custom(f) => f(value),
        }
    }

    /// Parse a conversion spec: `none`, `k_to_c`, `subtract:<v>`, `divide:<v>`,
    /// `linear:<scale>:<offset>`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim().to_lowercase();
        let mut parts = spec.split(':');
        let kind = parts.next()?;
        let mut number = || parts.next().and_then(|p| p.trim().parse::<f64>().ok());
        match kind {
            "" | "none" => Some(Self::None),
            "k_to_c" | "kelvin_to_celsius" => Some(Self::kelvin_to_celsius()),
            "subtract" => number().map(Self::Subtract),
            "divide" => number().filter(|d| *d != 0.0).map(Self::Divide),
            "linear" => {
                let scale = number()?;
                let offset = number()?;
                Some(Self::Linear { scale, offset })
            }
            _ => None,
        }
    }
}

impl fmt::Debug for UnitConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Subtract(v) => write!(f, "Subtract({})", v),
            Self::Divide(v) => write!(f, "Divide({})", v),
            Self::Linear { scale, offset } => write!(f, "Linear {{ scale: {}, offset: {} }}", scale, offset),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Whether `missing_value` is compared against raw or converted samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskOrder {
    /// Mask raw source values, then derive and convert the survivors.
    #[default]
    MaskThenConvert,
    /// Derive and convert first, then mask converted values.
    ConvertThenMask,
}

impl MaskOrder {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "convert_then_mask" => Self::ConvertThenMask,
            _ => Self::MaskThenConvert,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaskThenConvert => "mask_then_convert",
            Self::ConvertThenMask => "convert_then_mask",
        }
    }
}

/// Replace samples `<= missing_value` with the missing marker.
///
/// Returns the number of newly masked samples.
pub fn mask_missing(samples: &mut [Option<f32>], missing_value: f64) -> usize {
    let mut masked = 0;
    for sample in samples.iter_mut() {
        if let Some(value) = *sample {
            if value as f64 <= missing_value {
                *sample = None;
                masked += 1;
            }
        }
    }
    masked
}

/// Apply a unit conversion to every present sample.
pub fn convert_units(samples: &mut [Option<f32>], conversion: &UnitConversion) {
    if conversion.is_none() {
        return;
    }
    for value in samples.iter_mut().flatten() {
        *value = conversion.apply(*value as f64) as f32;
    }
}

/// Turn wave direction in radians (U slot) and height (V slot) into components.
///
/// `u = -height·sin(direction)`, `v = -height·cos(direction)`, written back
/// into the U and V slots; a missing input makes both outputs missing.
pub fn derive_wave_components(directions: &mut [Option<f32>], heights: &mut [Option<f32>]) {
    for (u, v) in directions.iter_mut().zip(heights.iter_mut()) {
        match (*u, *v) {
            (Some(direction), Some(height)) => {
                let direction = direction as f64;
                let height = height as f64;
                *u = Some((-height * direction.sin()) as f32);
                *v = Some((-height * direction.cos()) as f32);
            }
            _ => {
                *u = None;
                *v = None;
            }
        }
    }
}
