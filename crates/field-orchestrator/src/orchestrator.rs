//! Lifecycle of one field: fetch, normalize, generate, cache, publish, destroy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use field_common::{normalize_longitude, Extent, Field, FieldError, FieldResult, FieldValue};
use field_renderer::MeshRasterResult;
use grid_normalizer::{normalize_payload, NormalizeOptions};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cache::{CachedField, ResultCache};
use crate::config::OrchestratorConfig;
use crate::consumer::{FieldConsumer, PublishedField};
use crate::fetch::{DocumentFetcher, FieldSource, SourceFetcher};
use crate::worker::MeshWorker;

#[derive(Default)]
struct PublishedState {
    field: Option<Field>,
    published: Option<Arc<PublishedField>>,
}

/// Clears a busy flag when the guarded stage finishes, however it finishes.
struct BusyFlag<'a>(&'a AtomicBool);

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one field from source to consumer.
///
/// At most one load runs at a time; a second request while one is in flight
/// fails with [`FieldError::GenerationInProgress`]. After [`destroy`](Self::destroy)
/// nothing is published again, and a generation still running at that point
/// has its result dropped.
pub struct FieldOrchestrator {
    id: Uuid,
    options: NormalizeOptions,
    fetcher: Arc<dyn DocumentFetcher>,
    cache: Arc<ResultCache>,
    consumer: Arc<dyn FieldConsumer>,
    worker: Mutex<Option<MeshWorker>>,
    worker_name: String,
    state: Mutex<PublishedState>,
    in_flight: AtomicBool,
    generating: AtomicBool,
    alive: AtomicBool,
    destroyed: Notify,
}

impl FieldOrchestrator {
    /// Create an orchestrator with HTTP and file fetching and the process-wide cache.
    pub fn new(consumer: Arc<dyn FieldConsumer>, config: &OrchestratorConfig) -> FieldResult<Self> {
        config.validate()?;

        let fetcher = SourceFetcher::new(config.fetch_timeout())?;
        Ok(Self {
            id: Uuid::new_v4(),
            options: NormalizeOptions::default().with_mask_order(config.mask_order),
            fetcher: Arc::new(fetcher),
            cache: ResultCache::shared(config.cache_capacity),
            consumer,
            worker: Mutex::new(None),
            worker_name: config.worker_thread_name.clone(),
            state: Mutex::new(PublishedState::default()),
            in_flight: AtomicBool::new(false),
            generating: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            destroyed: Notify::new(),
        })
    }

    pub fn with_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Load a field from `source` and publish it.
    ///
    /// URL and file sources consult the result cache first; a hit is
    /// republished without fetching or generating. Returns `Ok(None)` when
    /// the orchestrator was destroyed before the result could be published.
    #[instrument(skip(self, source), fields(orchestrator = %self.id, source = %source))]
    pub async fn load(&self, source: FieldSource) -> FieldResult<Option<Arc<PublishedField>>> {
        let remote = match source {
            FieldSource::Inline(payload) => return self.set_data(payload).await,
            remote => remote,
        };

        self.ensure_alive()?;
        let _in_flight = self.begin_load()?;

        let key = cache_key(&remote).await;
        if let Some(hit) = self.cache.get(&key).await {
            debug!(key = %key, "Republishing cached field");
            return self.publish(hit.field, hit.mesh);
        }

        let bytes = self.fetcher.fetch(&remote).await?;
        if !self.is_alive() {
            debug!("Destroyed during fetch, dropping document");
            return Ok(None);
        }

        let document: Value = serde_json::from_slice(&bytes)?;
        let Some((field, mesh)) = self.process(document).await? else {
            return Ok(None);
        };

        self.cache
            .insert(key, CachedField::new(field.clone(), mesh.clone()))
            .await;
        self.publish(field, mesh)
    }

    /// Normalize, generate and publish an already parsed payload. Not cached.
    #[instrument(skip(self, payload), fields(orchestrator = %self.id))]
    pub async fn set_data(&self, payload: Value) -> FieldResult<Option<Arc<PublishedField>>> {
        self.ensure_alive()?;
        let _in_flight = self.begin_load()?;

        match self.process(payload).await? {
            Some((field, mesh)) => self.publish(field, mesh),
            None => Ok(None),
        }
    }

    /// Scalar value (or vector magnitude) at `[lon, lat]`, any longitude convention.
    pub fn value_from_position(&self, position: [f64; 2]) -> Option<f64> {
        let field = self.field()?;
        field.value_at(normalize_longitude(position[0]), position[1])
    }

    /// Interpolated components at `[lon, lat]`.
    pub fn sample_from_position(&self, position: [f64; 2]) -> Option<FieldValue> {
        let field = self.field()?;
        field.interpolated_value_at(normalize_longitude(position[0]), position[1])
    }

    /// Tear down: stop the worker, clear published state and notify the consumer.
    ///
    /// Idempotent. An in-flight load resolves with `Ok(None)`.
    pub fn destroy(&self) {
        {
            // Same lock as publish: the clear is always the consumer's last update.
            let mut state = lock(&self.state);
            if !self.alive.swap(false, Ordering::AcqRel) {
                return;
            }
            state.field = None;
            state.published = None;
            self.consumer.set_data(None);
        }

        if let Some(mut worker) = lock(&self.worker).take() {
            worker.terminate();
        }

        self.destroyed.notify_waiters();
        info!(orchestrator = %self.id, "Field orchestrator destroyed");
    }

    /// Whether a field has been published and the orchestrator is still alive.
    pub fn is_ready(&self) -> bool {
        lock(&self.state).published.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        !self.is_alive()
    }

    /// Whether a load is currently running.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether a grid is queued on or running in the mesh worker.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// The most recently published field.
    pub fn published(&self) -> Option<Arc<PublishedField>> {
        lock(&self.state).published.clone()
    }

    /// The queryable field behind the most recent publication.
    pub fn field(&self) -> Option<Field> {
        lock(&self.state).field.clone()
    }

    /// Geographic rectangle of the published mesh.
    pub fn extent(&self) -> Option<Extent> {
        lock(&self.state)
            .published
            .as_ref()
            .map(|p| p.mesh.real_extent)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn ensure_alive(&self) -> FieldResult<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(FieldError::generation_failed("orchestrator has been destroyed"))
        }
    }

    fn begin_load(&self) -> FieldResult<BusyFlag<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FieldError::GenerationInProgress)?;
        Ok(BusyFlag(&self.in_flight))
    }

    /// Normalize on the calling task, generate on the worker thread.
    ///
    /// `None` when destroyed before generation completed.
    async fn process(&self, payload: Value) -> FieldResult<Option<(Field, Arc<MeshRasterResult>)>> {
        let normalized = normalize_payload(payload, &self.options)?;
        let grid = Arc::new(normalized.grid);

        let reply = {
            let mut worker = lock(&self.worker);
            if !self.is_alive() {
                return Ok(None);
            }
            if worker.as_ref().map_or(true, |w| !w.is_running()) {
                *worker = Some(MeshWorker::spawn(&self.worker_name)?);
            }
            match worker.as_ref() {
                Some(w) => w.submit(grid.clone()),
                None => Err(FieldError::generation_failed("mesh worker unavailable")),
            }
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                lock(&self.worker).take();
                return Err(e);
            }
        };
        self.generating.store(true, Ordering::Release);
        let _generating = BusyFlag(&self.generating);

        let start = Instant::now();
        let destroyed = self.destroyed.notified();
        tokio::pin!(destroyed);
        destroyed.as_mut().enable();
        if !self.is_alive() {
            return Ok(None);
        }

        let outcome = tokio::select! {
            outcome = reply => outcome,
            _ = &mut destroyed => {
                debug!("Destroyed during generation, dropping result");
                return Ok(None);
            }
        };

        let mesh = outcome
            .map_err(|_| FieldError::generation_failed("mesh worker dropped the request"))??;

        let elapsed = start.elapsed();
        metrics::counter!("field_generations_total").increment(1);
        metrics::histogram!("field_generation_duration_seconds").record(elapsed.as_secs_f64());
        debug!(
            vertices = mesh.vertex_count(),
            single = mesh.single,
            elapsed_ms = elapsed.as_millis() as u64,
            "Mesh generation complete"
        );

        if !self.is_alive() {
            return Ok(None);
        }

        Ok(Some((Field::from_shared(grid), Arc::new(mesh))))
    }

    fn publish(
        &self,
        field: Field,
        mesh: Arc<MeshRasterResult>,
    ) -> FieldResult<Option<Arc<PublishedField>>> {
        let image = mesh.image()?;
        let published = Arc::new(PublishedField::from_mesh(mesh, image));

        {
            let mut state = lock(&self.state);
            // Checked under the lock so destroy cannot interleave with the store.
            if !self.is_alive() {
                debug!("Destroyed before publish, dropping result");
                return Ok(None);
            }
            state.field = Some(field);
            state.published = Some(published.clone());
            self.consumer.set_data(Some(&published));
        }

        info!(
            width = published.width,
            height = published.height,
            single = published.single,
            "Published field"
        );

        Ok(Some(published))
    }
}

impl Drop for FieldOrchestrator {
    fn drop(&mut self) {
        if self.is_alive() {
            debug!(orchestrator = %self.id, "Field orchestrator dropped without destroy");
            self.destroy();
        }
    }
}

/// Cache key for a remote source: the URL, or the canonical file path.
async fn cache_key(source: &FieldSource) -> String {
    match source {
        FieldSource::Url(url) => url.clone(),
        FieldSource::File(path) => {
            let canonical = tokio::fs::canonicalize(path)
                .await
                .unwrap_or_else(|_| path.clone());
            format!("file://{}", canonical.display())
        }
        FieldSource::Inline(_) => String::new(),
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
