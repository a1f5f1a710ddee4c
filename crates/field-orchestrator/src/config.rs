//! Configuration for field orchestrators.

use std::time::Duration;

use field_common::{FieldError, FieldResult};
use grid_normalizer::MaskOrder;
use serde::{Deserialize, Serialize};

/// Configuration shared by the orchestrators of one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of generated fields kept in the result cache.
    pub cache_capacity: usize,

    /// HTTP request timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Whether `missing_value` masks raw or converted samples.
    pub mask_order: MaskOrder,

    /// Name given to each orchestrator's generation thread.
    pub worker_thread_name: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            fetch_timeout_secs: 60,
            mask_order: MaskOrder::MaskThenConvert,
            worker_thread_name: "mesh-worker".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FIELD_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("FIELD_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.fetch_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("FIELD_MASK_ORDER") {
            config.mask_order = MaskOrder::from_str(&val);
        }

        if let Ok(val) = std::env::var("FIELD_WORKER_THREAD_NAME") {
            if !val.trim().is_empty() {
                config.worker_thread_name = val;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> FieldResult<()> {
        if self.cache_capacity == 0 {
            return Err(FieldError::Config("cache_capacity must be > 0".to_string()));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(FieldError::Config("fetch_timeout_secs must be > 0".to_string()));
        }

        if self.worker_thread_name.trim().is_empty() {
            return Err(FieldError::Config("worker_thread_name must not be empty".to_string()));
        }

        Ok(())
    }

    /// HTTP request timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
