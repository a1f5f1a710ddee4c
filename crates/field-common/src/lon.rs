//! Longitude wrapping.

/// Floored modulo: the result has the sign of `modulus`.
///
/// `wrap(-10.0, 360.0) == 350.0`, `wrap(370.0, 360.0) == 10.0`.
pub fn wrap(value: f64, modulus: f64) -> f64 {
    let n = value % modulus;
    if n * modulus < 0.0 {
        n + modulus
    } else {
        n
    }
}

/// Wrap a longitude into `[-180, 180)`.
///
/// In-range values come back bit-for-bit unchanged.
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        return lon;
    }
    wrap(lon + 180.0, 360.0) - 180.0
}
