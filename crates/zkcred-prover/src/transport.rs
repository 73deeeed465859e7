//! Artifact transports.
//!
//! A fetcher resolves a location string to bytes. [`HttpFetcher`] streams
//! over HTTP(S) and reports byte progress as chunks arrive;
//! [`FsFetcher`] and [`MapFetcher`] are whole-buffer and report a single
//! completion callback. The loader treats all three identically.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use thiserror::Error;

/// Byte-level progress callback: `(bytes_received, total_bytes_if_known)`.
/// The lifetime lets callers pass closures borrowing local state.
pub type ByteProgress<'a> = dyn Fn(u64, Option<u64>) + Send + Sync + 'a;

/// Errors resolving a location to bytes.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http fetch of {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("http fetch of {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("reading {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no artifact registered at '{location}'")]
    NotFound { location: String },
}

/// Resolves artifact locations to raw bytes.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch the resource at `location`, invoking `progress` as bytes
    /// arrive when the transport streams, or once on completion
    /// otherwise.
    async fn fetch(
        &self,
        location: &str,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Streaming HTTP(S) transport.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(
        &self,
        location: &str,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: location.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: location.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Http {
                url: location.to_string(),
                message: e.to_string(),
            })?;
            body.extend_from_slice(&chunk);
            if let Some(report) = progress {
                report(body.len() as u64, total);
            }
        }
        Ok(body)
    }
}

/// Local-filesystem transport, whole-buffer.
#[derive(Debug, Clone, Default)]
pub struct FsFetcher;

impl FsFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactFetcher for FsFetcher {
    async fn fetch(
        &self,
        location: &str,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<u8>, FetchError> {
        let bytes = tokio::fs::read(location)
            .await
            .map_err(|source| FetchError::Io {
                path: location.to_string(),
                source,
            })?;
        if let Some(report) = progress {
            report(bytes.len() as u64, Some(bytes.len() as u64));
        }
        Ok(bytes)
    }
}

/// In-memory transport for tests and embedded artifact bundles.
#[derive(Debug, Clone, Default)]
pub struct MapFetcher {
    entries: HashMap<String, Vec<u8>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(location.into(), bytes.into());
    }

    pub fn with(mut self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(location, bytes);
        self
    }
}

#[async_trait]
impl ArtifactFetcher for MapFetcher {
    async fn fetch(
        &self,
        location: &str,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .entries
            .get(location)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                location: location.to_string(),
            })?;
        if let Some(report) = progress {
            report(bytes.len() as u64, Some(bytes.len() as u64));
        }
        Ok(bytes)
    }
}
