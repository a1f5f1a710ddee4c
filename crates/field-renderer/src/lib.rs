//! Rendering primitives for gridded fields.
//!
//! - [`mesh`]: antimeridian-safe triangle mesh and value-encoded raster
//! - [`legend`]: color legend display and GPU lookup strip
//! - [`color`]: hex parsing and ramp interpolation
//! - [`png`]: PNG encoding (indexed or RGBA)

pub mod color;
pub mod legend;
pub mod mesh;
pub mod png;

pub use legend::{
    ColorLegend, LabelKind, LegendDisplay, LegendLabel, LegendOptions, LegendType, LookupStrip, Ramp,
    ShowType,
};
pub use mesh::{generate, MeshRasterResult};
