//! Shared server state

use std::sync::Arc;

use pyshare_core::config::Config;
use pyshare_core::{
    ArchiveExporter, ConnectionLog, FileManifestStore, MAX_LOG_ENTRIES, RemoteListingResolver, SharingSession,
    ZipArchiveExporter,
};

pub type SharedState = Arc<AppContext>;

/// Everything request handlers need, owned in one place
pub struct AppContext {
    /// Sharing session gating the store and log
    pub session: SharingSession,

    /// Client for browsing other peers
    pub resolver: RemoteListingResolver,

    /// Archive encoder for bulk download
    pub exporter: Arc<dyn ArchiveExporter>,

    /// Advertised HTTP port
    pub port: u16,

    /// Upload body limit in bytes
    pub max_upload_bytes: usize,
}

impl AppContext {
    pub fn new(session: SharingSession, resolver: RemoteListingResolver, port: u16, max_upload_bytes: usize) -> Self {
        Self {
            session,
            resolver,
            exporter: Arc::new(ZipArchiveExporter),
            port,
            max_upload_bytes,
        }
    }

    /// Build the context described by `config`, creating the shared folder
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = FileManifestStore::open(&config.server.shared_dir).await?;
        let log = ConnectionLog::with_prefixes(MAX_LOG_ENTRIES, config.server.tracked_prefixes.clone());
        let resolver = RemoteListingResolver::new(&config.resolver)?;

        let max_upload_bytes = usize::try_from(config.server.max_upload_mb.saturating_mul(1024 * 1024))
            .unwrap_or(usize::MAX);

        Ok(Self::new(
            SharingSession::new(store, log),
            resolver,
            config.server.port,
            max_upload_bytes,
        ))
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn ArchiveExporter>) -> Self {
        self.exporter = exporter;
        self
    }
}
