//! Sharing session state machine
//!
//! Two states, `Inactive` (initial) and `Active`, flipped by `toggle()`.
//! Deactivation is authoritative: it deletes every shared file and wipes
//! the connection log before recording the transition.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::connection_log::ConnectionLog;
use crate::protocol::ConnectionLogEntry;
use crate::store::{FileManifestStore, PurgeReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Inactive,
    Active,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Active)
    }

    pub fn flipped(self) -> Self {
        match self {
            SessionState::Inactive => SessionState::Active,
            SessionState::Active => SessionState::Inactive,
        }
    }

    fn message(self) -> &'static str {
        match self {
            SessionState::Active => "Sharing activated",
            SessionState::Inactive => "Sharing deactivated",
        }
    }
}

/// Result of a single toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub state: SessionState,
    pub message: String,
    pub purged: usize,
    pub purge_failures: usize,
}

/// Session state plus the store and log it governs
pub struct SharingSession {
    state: RwLock<SessionState>,
    log: RwLock<ConnectionLog>,
    store: FileManifestStore,
}

impl SharingSession {
    pub fn new(store: FileManifestStore, log: ConnectionLog) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            log: RwLock::new(log),
            store,
        }
    }

    pub fn store(&self) -> &FileManifestStore {
        &self.store
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn is_active(&self) -> bool {
        self.state().await.is_active()
    }

    /// Flip the session, running deactivation side effects when leaving `Active`
    ///
    /// Not atomic with respect to concurrent uploads: an upload racing a
    /// deactivation may land after the purge and survive.
    pub async fn toggle(&self) -> ToggleOutcome {
        let next = {
            let mut state = self.state.write().await;
            *state = state.flipped();
            *state
        };

        let mut report = PurgeReport::default();
        if next == SessionState::Inactive {
            report = match self.store.purge().await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(error = %e, "failed to enumerate shared files for purge");
                    PurgeReport::default()
                }
            };
        }

        {
            let mut log = self.log.write().await;
            if next == SessionState::Inactive {
                log.clear();
            }
            log.record(ConnectionLogEntry::system(next.message()));
        }

        tracing::info!(state = ?next, "{}", next.message());

        ToggleOutcome {
            state: next,
            message: next.message().to_string(),
            purged: report.deleted,
            purge_failures: report.failures,
        }
    }

    /// Record a request if its path is tracked
    pub async fn record_request(&self, entry: ConnectionLogEntry) {
        let mut log = self.log.write().await;
        if log.tracks(&entry.path) {
            log.record(entry);
        }
    }

    /// Connection log, newest first
    pub async fn logs(&self) -> Vec<ConnectionLogEntry> {
        self.log.read().await.snapshot()
    }

    /// Whether file content may be served to this caller
    pub async fn allows_file_access(&self, peer: IpAddr, referer: Option<&str>) -> bool {
        is_local_origin(peer, referer) || self.is_active().await
    }
}

/// Loopback callers and same-origin UI requests bypass the session gate
pub fn is_local_origin(peer: IpAddr, referer: Option<&str>) -> bool {
    let loopback = match peer {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
    };

    loopback || referer.is_some_and(|r| !r.is_empty())
}
