//! Filesystem-backed manifest of shared files
//!
//! The shared root is the single source of truth: every listing is derived
//! live from directory metadata. Uploads land under a partial-marker name
//! and are linked into place once fully written, so a listing never shows
//! a half-written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::archive::{ArchiveEntry, ArchiveError, ArchiveExporter, SpooledArchive};
use crate::protocol::{FileRecord, local_file_url};

/// Prefix of files still being written
pub const PARTIAL_PREFIX: &str = ".pyshare-partial-";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("No files to download")]
    EmptyManifest,

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive export failed: {0}")]
    Archive(#[from] ArchiveError),
}

/// Outcome of a best-effort purge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: usize,
    pub failures: usize,
}

/// Shared-storage root exposed as a named file collection
#[derive(Debug, Clone)]
pub struct FileManifestStore {
    root: PathBuf,
}

impl FileManifestStore {
    /// Open the store, creating the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every complete file under the root
    pub async fn list(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        let mut records = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if name.starts_with(PARTIAL_PREFIX) {
                continue;
            }

            // The file may vanish between readdir and stat
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            records.push(FileRecord {
                url: local_file_url(&name),
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
                name,
            });
        }

        Ok(records)
    }

    /// Store a new file without ever overwriting an existing one
    ///
    /// On collision the stored name is `<millis>-<name>`.
    pub async fn put(&self, name: &str, bytes: &[u8]) -> Result<FileRecord, StoreError> {
        let mut reader = bytes;
        self.put_reader(name, &mut reader).await
    }

    /// Stream `reader` into the store under `name`, or a stamped variant of it
    ///
    /// The content is written to a partial file first. The final name is then
    /// claimed with a hard link, which fails instead of replacing an existing
    /// file, so concurrent uploads of one name never overwrite each other.
    pub async fn put_reader<R>(&self, name: &str, reader: &mut R) -> Result<FileRecord, StoreError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        validate_name(name)?;

        let partial = self
            .root
            .join(format!("{}{}-{}", PARTIAL_PREFIX, next_stamp(), name));

        let written = match write_partial(&partial, reader).await {
            Ok(written) => written,
            Err(e) => {
                remove_partial(&partial).await;
                return Err(e.into());
            }
        };

        let claimed = self.claim_name(&partial, name).await;
        remove_partial(&partial).await;
        let stored_name = claimed?;

        tracing::info!(name = %stored_name, size = written, "stored file");

        let metadata = tokio::fs::metadata(self.root.join(&stored_name)).await?;
        Ok(FileRecord {
            url: local_file_url(&stored_name),
            size: metadata.len(),
            modified: metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
            name: stored_name,
        })
    }

    /// Link `partial` to the first free name among `name`, `<stamp>-name`, ...
    async fn claim_name(&self, partial: &Path, name: &str) -> Result<String, StoreError> {
        let mut candidate = name.to_string();
        loop {
            match tokio::fs::hard_link(partial, self.root.join(&candidate)).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = format!("{}-{}", next_stamp(), name);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete one file
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.resolve(name).await?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(name, "deleted file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// On-disk path of an existing file
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        if validate_name(name).is_err() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let path = self.root.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok(path),
            Ok(_) => Err(StoreError::NotFound(name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every listed file; a failure on one does not stop the rest
    pub async fn purge(&self) -> Result<PurgeReport, StoreError> {
        self.purge_with(|path| tokio::fs::remove_file(path)).await
    }

    async fn purge_with<F, Fut>(&self, remove: F) -> Result<PurgeReport, StoreError>
    where
        F: Fn(PathBuf) -> Fut,
        Fut: Future<Output = std::io::Result<()>>,
    {
        let mut report = PurgeReport::default();

        for record in self.list().await? {
            match remove(self.root.join(&record.name)).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    tracing::warn!(name = %record.name, error = %e, "failed to delete shared file");
                    report.failures += 1;
                }
            }
        }

        tracing::info!(deleted = report.deleted, failures = report.failures, "cleared shared files");
        Ok(report)
    }

    /// Archive every current file through `exporter` into a temp file
    pub async fn export_archive(&self, exporter: Arc<dyn ArchiveExporter>) -> Result<SpooledArchive, StoreError> {
        let files = self.list().await?;
        if files.is_empty() {
            return Err(StoreError::EmptyManifest);
        }

        let entries: Vec<ArchiveEntry> = files
            .into_iter()
            .map(|f| ArchiveEntry {
                source: self.root.join(&f.name),
                name: f.name,
            })
            .collect();

        let count = entries.len();
        let archive = tokio::task::spawn_blocking(move || SpooledArchive::create(exporter.as_ref(), &entries))
            .await
            .map_err(std::io::Error::other)??;

        tracing::info!(files = count, bytes = archive.len(), "exported archive");
        Ok(archive)
    }
}

async fn write_partial<R>(partial: &Path, reader: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(partial)
        .await?;
    let written = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    Ok(written)
}

async fn remove_partial(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %partial.display(), error = %e, "failed to remove partial upload");
        }
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.starts_with(PARTIAL_PREFIX);

    if invalid {
        Err(StoreError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Strictly increasing millisecond stamp
fn next_stamp() -> i64 {
    static LAST: AtomicI64 = AtomicI64::new(0);

    let now = Utc::now().timestamp_millis();
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}
