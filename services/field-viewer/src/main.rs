//! Field viewer.
//!
//! Loads one gridded field from a URL or file, writes its value-encoded
//! raster and summary, optionally renders a color legend, and answers
//! point queries against the loaded field.

mod legend;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use field_orchestrator::{FieldOrchestrator, FieldSource, OrchestratorConfig};
use field_renderer::ColorLegend;
use grid_normalizer::{DataType, MaskOrder, NormalizeOptions, UnitConversion};
use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use output::PngWriter;

#[derive(Parser, Debug)]
#[command(name = "field-viewer")]
#[command(about = "Render a gridded field and answer point queries")]
struct Args {
    /// Field document URL (http/https) or file path
    source: String,

    /// Output directory for rasters and legends
    #[arg(short, long, env = "FIELD_VIEWER_OUTPUT", default_value = "field-output")]
    output_dir: PathBuf,

    /// Legend config (.json, .yaml or .yml)
    #[arg(long, env = "FIELD_VIEWER_LEGEND")]
    legend: Option<PathBuf>,

    /// Point query as `lon,lat` (repeatable)
    #[arg(short, long = "query", value_name = "LON,LAT", allow_hyphen_values = true)]
    queries: Vec<String>,

    /// Treat components as wave direction (U) and height (V)
    #[arg(long)]
    wave: bool,

    /// Unit conversion: none, k_to_c, subtract:<v>, divide:<v>, linear:<scale>:<offset>
    #[arg(long, default_value = "none")]
    unit_conversion: String,

    /// Payload wrapping: json or items
    #[arg(long, default_value = "json")]
    data_type: String,

    /// Mask order: mask_then_convert or convert_then_mask (overrides FIELD_MASK_ORDER)
    #[arg(long)]
    mask_order: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = OrchestratorConfig::from_env();
    config.validate()?;

    let mask_order = args
        .mask_order
        .as_deref()
        .map(MaskOrder::from_str)
        .unwrap_or(config.mask_order);
    let unit_conversion = UnitConversion::parse(&args.unit_conversion)
        .ok_or_else(|| anyhow!("Invalid unit conversion: {}", args.unit_conversion))?;
    let options = NormalizeOptions::default()
        .with_wave(args.wave)
        .with_unit_conversion(unit_conversion)
        .with_mask_order(mask_order)
        .with_data_type(DataType::from_str(&args.data_type));

    info!(
        source = %args.source,
        output_dir = %args.output_dir.display(),
        mask_order = mask_order.as_str(),
        "Starting field viewer"
    );

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let writer = Arc::new(PngWriter::new(&args.output_dir));
    let orchestrator = FieldOrchestrator::new(writer.clone(), &config)?.with_options(options);

    let source = parse_source(&args.source);
    let published = orchestrator
        .load(source)
        .await?
        .ok_or_else(|| anyhow!("Field was discarded before publishing"))?;

    info!(
        width = published.width,
        height = published.height,
        single = published.single,
        min = published.data_range[0],
        max = published.data_range[1],
        "Field loaded"
    );

    for query in &args.queries {
        let position = parse_position(query)?;
        let value = orchestrator.value_from_position(position);
        if value.is_none() {
            warn!(lon = position[0], lat = position[1], "No value at position");
        }
        println!(
            "{}",
            json!({ "lon": position[0], "lat": position[1], "value": value })
        );
    }

    if let Some(path) = &args.legend {
        let legend = ColorLegend::new(legend::load_options(path)?)?;
        legend::write_outputs(&legend, &args.output_dir)?;
    }

    orchestrator.destroy();
    info!(files = writer.written().len(), "Field viewer finished");
    Ok(())
}

/// `http(s)://` sources are fetched, anything else is read from disk.
fn parse_source(source: &str) -> FieldSource {
    if source.starts_with("http://") || source.starts_with("https://") {
        FieldSource::url(source)
    } else {
        FieldSource::file(source)
    }
}

/// Parse `lon,lat`.
fn parse_position(query: &str) -> Result<[f64; 2]> {
    let Some((lon, lat)) = query.split_once(',') else {
        bail!("Query must be `lon,lat`: {}", query);
    };
    let lon: f64 = lon.trim().parse().with_context(|| format!("Invalid longitude in {}", query))?;
    let lat: f64 = lat.trim().parse().with_context(|| format!("Invalid latitude in {}", query))?;
    if !(-90.0..=90.0).contains(&lat) {
        bail!("Latitude out of range: {}", lat);
    }
    Ok([lon, lat])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert!(matches!(parse_source("https://example.com/wind.json"), FieldSource::Url(_)));
        assert!(matches!(parse_source("data/wind.json"), FieldSource::File(_)));
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("315, 45.5").unwrap(), [315.0, 45.5]);
        assert!(parse_position("10").is_err());
        assert!(parse_position("a,b").is_err());
        assert!(parse_position("0,91").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "field-viewer",
            "wind.json",
            "-q",
            "10,20",
            "--query=-170,5",
            "--unit-conversion",
            "k_to_c",
        ])
        .unwrap();
        assert_eq!(args.queries, vec!["10,20", "-170,5"]);
        assert_eq!(args.data_type, "json");
    }
}
