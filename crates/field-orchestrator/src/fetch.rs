//! Field document sources and fetchers.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use field_common::{FieldError, FieldResult};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

/// Where a field document comes from.
#[derive(Debug, Clone)]
pub enum FieldSource {
    /// Fetched over HTTP(S).
    Url(String),
    /// Read from the local filesystem.
    File(PathBuf),
    /// An already parsed payload.
    Inline(Value),
}

impl FieldSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Whether this source goes through a fetcher (and the result cache).
    pub fn is_remote(&self) -> bool {
        !matches!(self, FieldSource::Inline(_))
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::Url(url) => write!(f, "{}", url),
            FieldSource::File(path) => write!(f, "file://{}", path.display()),
            FieldSource::Inline(_) => write!(f, "inline"),
        }
    }
}

/// Retrieves raw document bytes for a source.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, source: &FieldSource) -> FieldResult<Bytes>;
}

/// Fetches `Url` sources over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> FieldResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FieldError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> FieldResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FieldError::fetch_failed(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FieldError::fetch_failed(format!("HTTP {} for {}", status, url)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FieldError::fetch_failed(format!("{}: {}", url, e)))?;

        debug!(bytes = body.len(), "Fetched field document");
        Ok(body)
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, source: &FieldSource) -> FieldResult<Bytes> {
        match source {
            FieldSource::Url(url) => self.get(url).await,
            other => Err(FieldError::fetch_failed(format!(
                "HTTP fetcher cannot load {}",
                other
            ))),
        }
    }
}

/// Reads `File` sources from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl DocumentFetcher for FileFetcher {
    async fn fetch(&self, source: &FieldSource) -> FieldResult<Bytes> {
        match source {
            FieldSource::File(path) => {
                let data = tokio::fs::read(path).await.map_err(|e| {
                    FieldError::fetch_failed(format!("{}: {}", path.display(), e))
                })?;
                debug!(path = %path.display(), bytes = data.len(), "Read field document");
                Ok(Bytes::from(data))
            }
            other => Err(FieldError::fetch_failed(format!(
                "file fetcher cannot load {}",
                other
            ))),
        }
    }
}

/// Dispatches `Url` sources to HTTP and `File` sources to disk.
#[derive(Clone)]
pub struct SourceFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> FieldResult<Self> {
        Ok(Self {
            http: HttpFetcher::new(timeout)?,
            file: FileFetcher,
        })
    }
}

#[async_trait]
impl DocumentFetcher for SourceFetcher {
    async fn fetch(&self, source: &FieldSource) -> FieldResult<Bytes> {
        match source {
            FieldSource::Url(_) => self.http.fetch(source).await,
            FieldSource::File(_) => self.file.fetch(source).await,
            FieldSource::Inline(_) => Err(FieldError::fetch_failed(
                "inline payloads are not fetched",
            )),
        }
    }
}
