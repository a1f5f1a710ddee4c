//! Test support for the field pipeline crates.
//!
//! - [`generators`]: lattices and synthetic field documents (bands, single documents)
//! - [`fixtures`]: reusable extents and color ramps
//! - [`assert_approx_eq!`]: float comparison with an explicit tolerance
//!
//! Pulled in as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert two numbers differ by at most `tolerance`, comparing as `f64`.
///
/// NaN never compares equal.
///
/// ```ignore
/// assert_approx_eq!(field.value_at(5.0, 5.0).unwrap(), 4.0, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let tolerance = $tolerance as f64;
        let within = (actual - expected).abs() <= tolerance;
        assert!(
            within,
            "{} = {} is not within {} of {}",
            stringify!($actual),
            actual,
            tolerance,
            expected
        );
    }};
}
