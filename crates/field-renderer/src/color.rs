//! Color parsing and ramp interpolation.

use image::Rgba;

/// Parse `#RRGGBB`, `#RRGGBBAA` or `#RGB` (leading `#` optional).
pub fn parse_color(hex: &str) -> Option<Rgba<u8>> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
            Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255]))
        }
        _ => None,
    }
}

/// Linear color interpolation.
pub fn interpolate_color(from: Rgba<u8>, to: Rgba<u8>, t: f64) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;
    let mix = |a: u8, b: u8| (a as f64 * t_inv + b as f64 * t) as u8;
    Rgba([
        mix(from[0], to[0]),
        mix(from[1], to[1]),
        mix(from[2], to[2]),
        mix(from[3], to[3]),
    ])
}

/// A color stop at a normalized ramp position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba<u8>,
}

/// Color of a linear gradient at `t`.
///
/// Stops must be sorted by offset. Positions before the first stop take the
/// first color, positions after the last stop the last color.
pub fn gradient_color(stops: &[GradientStop], t: f64) -> Rgba<u8> {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Rgba([0, 0, 0, 0]);
    };
    if t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }

    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.offset && t <= b.offset {
            let span = b.offset - a.offset;
            if span <= 0.0 {
                return b.color;
            }
            return interpolate_color(a.color, b.color, (t - a.offset) / span);
        }
    }
    last.color
}

/// Color of a stepped ramp at `t`: the last stop whose offset is `<= t`.
pub fn stepped_color(stops: &[GradientStop], t: f64) -> Rgba<u8> {
    let Some(first) = stops.first() else {
        return Rgba([0, 0, 0, 0]);
    };
    stops
        .iter()
        .take_while(|stop| stop.offset <= t)
        .last()
        .unwrap_or(first)
        .color
}
