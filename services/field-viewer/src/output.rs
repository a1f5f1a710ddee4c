//! Consumer that writes each published field to disk.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use field_orchestrator::{FieldConsumer, PublishedField};
use field_renderer::png;
use serde::Serialize;
use tracing::{error, info};

/// Metadata written next to the raster.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldSummary {
    extent: [f64; 4],
    data_extent: [f64; 4],
    data_range: [f64; 2],
    width: u32,
    height: u32,
    single: bool,
    vertex_count: usize,
    triangle_count: usize,
}

impl From<&PublishedField> for FieldSummary {
    fn from(field: &PublishedField) -> Self {
        Self {
            extent: field.extent,
            data_extent: field.data_extent,
            data_range: field.data_range,
            width: field.width,
            height: field.height,
            single: field.single,
            vertex_count: field.mesh.vertex_count(),
            triangle_count: field.mesh.triangle_count(),
        }
    }
}

/// Writes `field.png` and `field.json` into a directory on every publish.
pub struct PngWriter {
    dir: PathBuf,
    written: Mutex<Vec<PathBuf>>,
}

impl PngWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Mutex::new(Vec::new()),
        }
    }

    /// Files written so far.
    pub fn written(&self) -> Vec<PathBuf> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    fn write(&self, field: &PublishedField) -> Result<Vec<PathBuf>> {
        let raster = self.dir.join("field.png");
        write_file(&raster, &png::encode_image(&field.image)?)?;

        let summary = self.dir.join("field.json");
        write_file(&summary, &serde_json::to_vec_pretty(&FieldSummary::from(field))?)?;

        Ok(vec![raster, summary])
    }
}

impl FieldConsumer for PngWriter {
    fn set_data(&self, data: Option<&PublishedField>) {
        let Some(field) = data else {
            info!("Field cleared");
            return;
        };

        match self.write(field) {
            Ok(paths) => {
                info!(
                    dir = %self.dir.display(),
                    width = field.width,
                    height = field.height,
                    "Wrote field raster"
                );
                if let Ok(mut written) = self.written.lock() {
                    written.extend(paths);
                }
            }
            Err(e) => error!(error = %e, "Failed to write field raster"),
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use field_orchestrator::{FieldOrchestrator, OrchestratorConfig, ResultCache};
    use serde_json::json;

    #[test]
    fn test_writes_raster_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(PngWriter::new(dir.path()));

        let orch = FieldOrchestrator::new(writer.clone(), &OrchestratorConfig::default())
            .unwrap()
            .with_cache(Arc::new(ResultCache::new(1)));

        let document = json!({
            "header": { "lo1": 0, "la1": 1, "lo2": 1, "la2": 0, "dx": 1, "dy": 1, "nx": 2, "ny": 2 },
            "data": [0.0, 1.0, 2.0, 3.0],
        });
        let published = tokio_test::block_on(orch.set_data(document)).unwrap();
        assert!(published.is_some());

        let written = writer.written();
        assert_eq!(written.len(), 2);
        let png_bytes = std::fs::read(dir.path().join("field.png")).unwrap();
        assert_eq!(&png_bytes[0..8], &png::PNG_SIGNATURE);

        let summary: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("field.json")).unwrap()).unwrap();
        assert_eq!(summary["dataRange"], json!([0.0, 3.0]));
        assert_eq!(summary["width"], json!(2));

        orch.destroy();
    }
}
