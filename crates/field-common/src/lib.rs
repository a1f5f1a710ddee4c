//! Common types shared by the field pipeline crates.
//!
//! - [`CanonicalGrid`]: the normalized lon/lat grid every source schema is reduced to
//! - [`Field`]: an immutable, queryable wrapper with bilinear interpolation
//! - [`Extent`]: geographic bounding boxes in degrees
//! - [`FieldError`]: the error taxonomy used across normalization, generation and loading

pub mod error;
pub mod extent;
pub mod field;
pub mod grid;
pub mod lon;

pub use error::{FieldError, FieldResult};
pub use extent::Extent;
pub use field::{Field, FieldValue};
pub use grid::CanonicalGrid;
pub use lon::{normalize_longitude, wrap};
