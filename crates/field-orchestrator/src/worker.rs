//! Dedicated mesh generation thread.
//!
//! Each orchestrator owns at most one worker. Jobs travel over a channel to a
//! named OS thread and results come back on a oneshot, so the async side never
//! blocks on generation. Terminating drops the job channel; the thread exits
//! once it finishes whatever it is working on and its reply goes nowhere.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use field_common::{CanonicalGrid, FieldError, FieldResult};
use field_renderer::MeshRasterResult;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Receiver for one generation result.
pub type GenerationReply = oneshot::Receiver<FieldResult<MeshRasterResult>>;

struct GenerationJob {
    grid: Arc<CanonicalGrid>,
    reply: oneshot::Sender<FieldResult<MeshRasterResult>>,
}

/// Handle to a mesh generation thread.
pub struct MeshWorker {
    tx: Option<Sender<GenerationJob>>,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl MeshWorker {
    /// Start a worker thread called `name`.
    pub fn spawn(name: &str) -> FieldResult<Self> {
        let (tx, rx) = channel();
        let handle = spawn_worker_thread(name, rx)?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the worker still accepts jobs.
    pub fn is_running(&self) -> bool {
        self.tx.is_some() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Queue a grid for generation.
    pub fn submit(&self, grid: Arc<CanonicalGrid>) -> FieldResult<GenerationReply> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| FieldError::generation_failed("worker has been terminated"))?;

        let (reply, rx) = oneshot::channel();
        tx.send(GenerationJob { grid, reply }).map_err(|_| {
            error!(worker = %self.name, "Mesh worker thread died");
            FieldError::generation_failed("worker thread is not running")
        })?;

        Ok(rx)
    }

    /// Stop accepting jobs. Does not wait for a job already in progress.
    pub fn terminate(&mut self) {
        if self.tx.take().is_none() {
            return;
        }

        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    error!(worker = %self.name, "Mesh worker thread panicked: {:?}", e);
                }
            } else {
                debug!(worker = %self.name, "Detaching busy mesh worker");
            }
        }
    }

    /// Stop accepting jobs and wait for the thread to exit.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                error!(worker = %self.name, "Mesh worker thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for MeshWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn spawn_worker_thread(name: &str, rx: Receiver<GenerationJob>) -> FieldResult<JoinHandle<()>> {
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            info!(worker = %thread_name, "Mesh worker thread started");

            while let Ok(job) = rx.recv() {
                let start = Instant::now();
                let result = panic::catch_unwind(AssertUnwindSafe(|| field_renderer::generate(&job.grid)))
                    .unwrap_or_else(|_| Err(FieldError::generation_failed("mesh generation panicked")));

                match &result {
                    Ok(mesh) => debug!(
                        worker = %thread_name,
                        vertices = mesh.vertex_count(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Generated mesh"
                    ),
                    Err(e) => warn!(worker = %thread_name, error = %e, "Mesh generation failed"),
                }

                if job.reply.send(result).is_err() {
                    debug!(worker = %thread_name, "Generation result discarded, requester gone");
                }
            }

            info!(worker = %thread_name, "Mesh worker thread shutting down");
        })
        .map_err(|e| FieldError::generation_failed(format!("failed to spawn worker thread: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::Extent;

    fn grid() -> Arc<CanonicalGrid> {
        let grid = CanonicalGrid::new(
            Extent::new(0.0, 0.0, 2.0, 1.0),
            1.0,
            1.0,
            2,
            1,
            (0..6).map(|v| Some(v as f32)).collect(),
            None,
        )
        .unwrap();
        Arc::new(grid)
    }

    #[tokio::test]
    async fn test_worker_generates_mesh() {
        let worker = MeshWorker::spawn("mesh-worker-test").unwrap();
        assert!(worker.is_running());
        assert_eq!(worker.name(), "mesh-worker-test");

        let mesh = worker.submit(grid()).unwrap().await.unwrap().unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.data_range, [0.0, 5.0]);

        worker.shutdown();
    }

    #[tokio::test]
    async fn test_jobs_processed_in_order() {
        let worker = MeshWorker::spawn("mesh-worker-order").unwrap();
        let first = worker.submit(grid()).unwrap();
        let second = worker.submit(grid()).unwrap();

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
    }

    #[test]
    fn test_terminated_worker_rejects_jobs() {
        let mut worker = MeshWorker::spawn("mesh-worker-stop").unwrap();
        worker.terminate();

        assert!(!worker.is_running());
        let err = worker.submit(grid()).unwrap_err();
        assert!(matches!(err, FieldError::GenerationFailure(_)));

        // Idempotent.
        worker.terminate();
    }
}
