//! pyshare-core: Shared library for local network file sharing
//!
//! This crate provides:
//! - Wire types for the sharing HTTP API
//! - Bounded connection log
//! - Filesystem-backed manifest store with zip export
//! - Sharing session state machine (purges on deactivate)
//! - Remote listing resolver for foreign file servers

pub mod archive;
pub mod config;
pub mod connection_log;
pub mod protocol;
pub mod resolver;
pub mod session;
pub mod store;

pub use archive::{ArchiveExporter, SpooledArchive, ZipArchiveExporter};
pub use config::Config;
pub use connection_log::ConnectionLog;
pub use protocol::{ConnectionLogEntry, FileRecord, ManifestSource, RemoteFileRecord, RemoteManifest};
pub use resolver::{RemoteListingResolver, ResolveError};
pub use session::{SessionState, SharingSession, ToggleOutcome};
pub use store::{FileManifestStore, StoreError};

/// Default HTTP port for pyshare-server
pub const DEFAULT_PORT: u16 = 8000;

/// Maximum number of connection log entries kept in memory
pub const MAX_LOG_ENTRIES: usize = 50;
