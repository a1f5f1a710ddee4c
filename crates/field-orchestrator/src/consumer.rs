//! Downstream consumers of published fields.

use std::sync::Arc;

use field_renderer::MeshRasterResult;
use image::RgbaImage;

/// Everything a renderer needs to draw one generated field.
#[derive(Debug, Clone)]
pub struct PublishedField {
    /// Value-encoded raster, one texel per lattice vertex.
    pub image: RgbaImage,
    /// Geographic rectangle covered by the mesh, in [-180, 180].
    pub extent: [f64; 4],
    /// `[minU, maxU, minV, maxV]` over valid samples.
    pub data_extent: [f64; 4],
    /// Value range used to encode the raster channels.
    pub data_range: [f64; 2],
    /// Vertex lattice width.
    pub width: u32,
    /// Vertex lattice height.
    pub height: u32,
    /// True for scalar fields.
    pub single: bool,
    /// Mesh buffers for GPU upload.
    pub mesh: Arc<MeshRasterResult>,
}

impl PublishedField {
    pub fn from_mesh(mesh: Arc<MeshRasterResult>, image: RgbaImage) -> Self {
        Self {
            extent: mesh.real_extent.to_array(),
            data_extent: mesh.data_extent,
            data_range: mesh.data_range,
            width: image.width(),
            height: image.height(),
            single: mesh.single,
            image,
            mesh,
        }
    }
}

/// Receives published fields. `None` means the consumer should clear its state.
///
/// Called with the orchestrator's state locked, so updates arrive in order and
/// nothing follows the final `None`. Implementations must not call back into
/// the orchestrator that drives them.
pub trait FieldConsumer: Send + Sync {
    fn set_data(&self, data: Option<&PublishedField>);
}

/// Consumer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConsumer;

impl FieldConsumer for NoopConsumer {
    fn set_data(&self, _data: Option<&PublishedField>) {}
}
