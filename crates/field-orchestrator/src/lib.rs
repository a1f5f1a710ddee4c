//! Field lifecycle orchestration.
//!
//! A [`FieldOrchestrator`] owns one field: it fetches the source document,
//! normalizes it, hands the grid to a dedicated [`MeshWorker`] thread for
//! mesh and raster generation, caches the result in a shared [`ResultCache`]
//! and publishes it to a [`FieldConsumer`].
//!
//! ```text
//! FieldSource ──► DocumentFetcher ──► normalize_payload ──► MeshWorker
//!      │                                                       │
//!      └──────────── ResultCache (hit) ───────────────► publish ──► FieldConsumer
//! ```

pub mod cache;
pub mod config;
pub mod consumer;
pub mod fetch;
pub mod orchestrator;
pub mod worker;

pub use cache::{CachedField, ResultCache, ResultCacheStats};
pub use config::OrchestratorConfig;
pub use consumer::{FieldConsumer, NoopConsumer, PublishedField};
pub use fetch::{DocumentFetcher, FieldSource, FileFetcher, HttpFetcher, SourceFetcher};
pub use orchestrator::FieldOrchestrator;
pub use worker::MeshWorker;
