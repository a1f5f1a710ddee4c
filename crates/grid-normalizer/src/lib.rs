//! Grid normalization for heterogeneous field documents.
//!
//! Two JSON source shapes are understood:
//!
//! - **Array of bands**: `[{header, data}, ...]`, components picked by
//!   `parameterCategory`/`parameterNumber` (`(1|2, 2)` = U, `(1|2, 3)` = V)
//! - **Single document**: `{header, data | blocks}` with the geometry either
//!   inline (`lo1/la1/lo2/la2/dx/dy/nx/ny`) or as named axis sequences
//!
//! Both are reduced to a [`CanonicalGrid`] with row 0 on the northern edge.
//!
//! # Pipeline
//!
//! ```text
//! raw document
//!      │
//!      ├─► DataType::extract (unwrap bundled `items`)
//!      │
//!      ├─► parse bands / single header  ──► RawGrid (source scan order)
//!      │
//!      ├─► mask raw values*  ─► wave derivation ─► unit conversion ─► mask*
//!      │        (* exactly one, chosen by MaskOrder)
//!      │
//!      └─► reorient rows/columns ──► CanonicalGrid
//! ```

pub mod document;
pub mod normalize;
pub mod transform;

pub use document::{AxisSequence, BandHeader, ComponentRole, DataType};
pub use normalize::{normalize, normalize_payload, normalize_slice, NormalizeOptions, NormalizedGrid};
pub use transform::{MaskOrder, UnitConversion};
