//! Remote listing resolver
//!
//! Turns the base URL of an arbitrary peer into a file manifest:
//! 1. Structured probe of `{base}/api/files`; trusted when it decodes.
//! 2. Otherwise the peer's root page is mined as an HTML directory listing,
//!    with sizes recovered from markup or, failing that, a HEAD probe.
//!
//! Per-file failures only degrade that entry's size to unknown. HEAD probes
//! are bounded by a semaphore and every request carries a timeout.

pub mod html;
pub mod size;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::ResolverConfig;
use crate::protocol::{ManifestSource, RemoteFileRecord, RemoteManifest, encode_component};
use html::AnchorContext;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid peer URL: {0}")]
    InvalidUrl(String),

    #[error("Peer unreachable: {0}")]
    NetworkFailure(String),

    #[error("Unreadable peer response: {0}")]
    ParseFailure(String),

    #[error("HTTP client setup failed: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Record shape expected from a structured `/api/files` endpoint
#[derive(Debug, Deserialize)]
struct StructuredRecord {
    name: String,
    size: u64,
    modified: DateTime<Utc>,
    url: String,
}

impl From<StructuredRecord> for RemoteFileRecord {
    fn from(r: StructuredRecord) -> Self {
        Self {
            name: r.name,
            size: r.size,
            modified: r.modified,
            url: r.url,
        }
    }
}

/// Client that resolves foreign listings into manifests
#[derive(Debug, Clone)]
pub struct RemoteListingResolver {
    client: Client,
    probe_concurrency: usize,
}

impl RemoteListingResolver {
    /// Create a resolver with its own HTTP client
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ResolveError::ClientBuild)?;

        Ok(Self::with_client(client, config.probe_concurrency))
    }

    /// Create a resolver around an existing client
    pub fn with_client(client: Client, probe_concurrency: usize) -> Self {
        Self {
            client,
            probe_concurrency: probe_concurrency.max(1),
        }
    }

    /// Resolve the manifest of the peer at `base_url`
    pub async fn resolve(&self, base_url: &str) -> Result<RemoteManifest, ResolveError> {
        let base = normalize_base(base_url)?;

        if let Some(files) = self.probe_structured(&base).await {
            tracing::info!(peer = %base, files = files.len(), "resolved structured manifest");
            return Ok(RemoteManifest {
                source: ManifestSource::Structured,
                files,
            });
        }

        let files = self.resolve_html(&base).await?;
        tracing::info!(peer = %base, files = files.len(), "resolved HTML listing");
        Ok(RemoteManifest {
            source: ManifestSource::Html,
            files,
        })
    }

    /// Step 1: any mismatch yields `None` and falls through to HTML
    async fn probe_structured(&self, base: &str) -> Option<Vec<RemoteFileRecord>> {
        let url = format!("{}/api/files", base);

        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "structured probe failed");
                return None;
            }
        };

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if !resp.status().is_success() || !is_json {
            tracing::debug!(url = %url, status = %resp.status(), is_json, "no structured API");
            return None;
        }

        let body = resp.bytes().await.ok()?;
        match serde_json::from_slice::<Vec<StructuredRecord>>(&body) {
            Ok(records) => Some(records.into_iter().map(RemoteFileRecord::from).collect()),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "structured probe returned unexpected shape");
                None
            }
        }
    }

    /// Step 2: mine the root page
    async fn resolve_html(&self, base: &str) -> Result<Vec<RemoteFileRecord>, ResolveError> {
        let resp = self
            .client
            .get(base)
            .send()
            .await
            .map_err(|e| ResolveError::NetworkFailure(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ResolveError::NetworkFailure(format!("HTTP {} from {}", status.as_u16(), base)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ResolveError::ParseFailure(e.to_string()))?;

        let anchors = html::extract_anchors(&body);
        tracing::debug!(peer = base, anchors = anchors.len(), bytes = body.len(), "parsed listing");

        let probes = Semaphore::new(self.probe_concurrency);
        let now = Utc::now();
        let pipelines = anchors
            .iter()
            .map(|anchor| self.resolve_anchor(base, anchor, &probes, now));

        let files: Vec<RemoteFileRecord> = join_all(pipelines).await.into_iter().flatten().collect();
        if files.is_empty() {
            tracing::warn!(peer = base, "no usable entries in listing");
        }
        Ok(files)
    }

    async fn resolve_anchor(
        &self,
        base: &str,
        anchor: &AnchorContext,
        probes: &Semaphore,
        now: DateTime<Utc>,
    ) -> Option<RemoteFileRecord> {
        let name = candidate_name(anchor)?;
        let encoded = encode_component(&name);

        let size = match size::extract_size(anchor) {
            Some(size) => size,
            None => self.probe_size(&format!("{}/{}", base, encoded), probes).await.unwrap_or(0),
        };

        Some(RemoteFileRecord {
            name,
            size,
            modified: now,
            url: format!("/{}", encoded),
        })
    }

    /// HEAD the file and read `content-length`
    async fn probe_size(&self, url: &str, probes: &Semaphore) -> Option<u64> {
        let _permit = probes.acquire().await.ok()?;

        let resp = match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::debug!(url = %url, status = %resp.status(), "HEAD probe rejected");
                return None;
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "HEAD probe failed");
                return None;
            }
        };

        resp.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

/// Decoded filename of a file anchor, `None` for anything to skip
pub fn candidate_name(anchor: &AnchorContext) -> Option<String> {
    let href = anchor.href.as_deref().filter(|h| !h.is_empty())?;
    if href == "../" || href.ends_with('/') || href.starts_with('?') {
        return None;
    }

    let path = href.split('?').next().unwrap_or(href);
    let name = percent_decode_str(path).decode_utf8_lossy().into_owned();
    (!name.is_empty()).then_some(name)
}

/// Validate the peer URL and reduce it to scheme, authority and path
/// without a trailing slash
fn normalize_base(base_url: &str) -> Result<String, ResolveError> {
    let trimmed = base_url.trim();
    let mut url = Url::parse(trimmed).map_err(|e| ResolveError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ResolveError::InvalidUrl(format!("{}: expected an http(s) URL", trimmed)));
    }

    url.set_query(None);
    url.set_fragment(None);
    Ok(url.as_str().trim_end_matches('/').to_string())
}
