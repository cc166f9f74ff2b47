//! HTTP protocol types for pyshare communication
//!
//! All bodies are JSON with camelCase field names. The protocol covers:
//! - Server identity and sharing status
//! - Connection log snapshots
//! - Local manifest listing, upload, and delete
//! - Remote manifests produced by the listing resolver

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Characters escaped in a single URL path component (leaves `-_.!~*'()` intact)
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a filename for use as one URL path segment
pub fn encode_component(name: &str) -> String {
    utf8_percent_encode(name, URI_COMPONENT).to_string()
}

/// Access URL of a locally shared file
pub fn local_file_url(name: &str) -> String {
    format!("/files/{}", encode_component(name))
}

/// A file physically present under the shared root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Relative access URL (`/files/<encoded name>`)
    pub url: String,
}

/// One recorded request (or a synthetic session transition)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionLogEntry {
    /// Source address, or `SYSTEM` for synthetic entries
    pub ip: String,
    pub path: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
}

/// Marker used for synthetic log entries
pub const SYSTEM_SOURCE: &str = "SYSTEM";

impl ConnectionLogEntry {
    pub fn request(
        ip: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        user_agent: Option<&str>,
    ) -> Self {
        Self {
            ip: ip.into(),
            path: path.into(),
            method: method.into(),
            timestamp: Utc::now(),
            user_agent: user_agent.unwrap_or("Unknown").to_string(),
        }
    }

    /// Synthetic entry recording a session transition
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            ip: SYSTEM_SOURCE.to_string(),
            path: "/system".to_string(),
            method: SYSTEM_SOURCE.to_string(),
            timestamp: Utc::now(),
            user_agent: message.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.method == SYSTEM_SOURCE
    }
}

/// Response for `GET /api/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub ip: String,
    pub port: u16,
    pub hostname: String,
    pub is_active: bool,
}

/// Response for `POST /api/toggle-server`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub is_active: bool,
    pub message: String,
}

/// Metadata of a freshly stored upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Name on disk (may carry a collision prefix)
    pub name: String,
    pub original_name: String,
    pub size: u64,
}

/// Response for `POST /api/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: UploadedFile,
}

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Request body for `POST /api/fetch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
}

/// Response for `POST /api/scan`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub message: String,
    pub info: String,
}

/// A file reported by a foreign server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileRecord {
    pub name: String,
    /// Size in bytes, 0 when unknown
    pub size: u64,
    /// Best effort; resolution time when the peer does not report one
    pub modified: DateTime<Utc>,
    /// URL relative to the peer's base URL
    pub url: String,
}

impl RemoteFileRecord {
    pub fn has_known_size(&self) -> bool {
        self.size > 0
    }
}

/// Where a remote manifest came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSource {
    /// Peer answered `/api/files` with well-formed JSON
    Structured,
    /// Mined from the peer's HTML directory listing
    Html,
}

/// Manifest of a remote peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteManifest {
    pub source: ManifestSource,
    pub files: Vec<RemoteFileRecord>,
}

impl RemoteManifest {
    /// Only structured peers are trusted for bulk archive download
    pub fn supports_bulk_download(&self) -> bool {
        self.source == ManifestSource::Structured
    }
}

/// Response for `POST /api/fetch`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub source: ManifestSource,
    pub supports_bulk_download: bool,
    pub files: Vec<RemoteFileRecord>,
}

impl From<RemoteManifest> for FetchResponse {
    fn from(manifest: RemoteManifest) -> Self {
        Self {
            source: manifest.source,
            supports_bulk_download: manifest.supports_bulk_download(),
            files: manifest.files,
        }
    }
}
