//! Legend configuration loading and rendering.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use field_renderer::{ColorLegend, LegendOptions};
use tracing::info;

/// Load legend options from a `.json`, `.yaml` or `.yml` file.
pub fn load_options(path: &Path) -> Result<LegendOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read legend config {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let options = match extension.as_str() {
        "json" => serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON legend config {}", path.display()))?,
        "yaml" | "yml" => serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid YAML legend config {}", path.display()))?,
        other => bail!("Unsupported legend config extension: {:?}", other),
    };

    Ok(options)
}

/// Render the legend display, its labels and the lookup strip into `dir`.
pub fn write_outputs(legend: &ColorLegend, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let display = legend.display();
    if display.visible {
        let path = dir.join("legend.png");
        std::fs::write(&path, display.to_png()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);

        let path = dir.join("legend-labels.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&display.labels)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    } else {
        info!("Legend hidden, skipping display");
    }

    let path = dir.join("legend-strip.png");
    std::fs::write(&path, legend.lookup_strip().to_png()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    written.push(path);

    let [min, max] = legend.color_range();
    info!(min, max, files = written.len(), "Wrote legend outputs");
    Ok(written)
}
