//! Zip export of the shared folder

use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::PathBuf;

use thiserror::Error;
use zip::write::FileOptions;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read archive source: {0}")]
    Io(#[from] io::Error),

    #[error("Zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// One file to place into an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    /// Name inside the archive
    pub name: String,
}

/// Produces an archive from a list of files
///
/// Implementations are blocking; callers run them off the async executor.
pub trait ArchiveExporter: Send + Sync {
    /// Write the archive of `entries` into `out`
    fn export(&self, entries: &[ArchiveEntry], out: &mut File) -> Result<(), ArchiveError>;

    /// MIME type of the produced archive
    fn content_type(&self) -> &'static str {
        "application/zip"
    }
}

/// Deflated zip writer
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveExporter;

impl ArchiveExporter for ZipArchiveExporter {
    fn export(&self, entries: &[ArchiveEntry], out: &mut File) -> Result<(), ArchiveError> {
        let mut writer = zip::ZipWriter::new(out);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in entries {
            let mut source = File::open(&entry.source)?;
            writer.start_file(entry.name.as_str(), options)?;
            io::copy(&mut source, &mut writer)?;
        }

        writer.finish()?;
        Ok(())
    }
}

/// Finished archive held in an anonymous temp file, rewound for reading
///
/// The file is unlinked by the OS once the handle is dropped.
#[derive(Debug)]
pub struct SpooledArchive {
    file: File,
    len: u64,
}

impl SpooledArchive {
    /// Run `exporter` into a fresh temp file
    pub fn create(exporter: &dyn ArchiveExporter, entries: &[ArchiveEntry]) -> Result<Self, ArchiveError> {
        let mut file = tempfile::tempfile()?;
        exporter.export(entries, &mut file)?;

        let len = file.seek(SeekFrom::End(0))?;
        file.rewind()?;
        Ok(Self { file, len })
    }

    /// Size of the archive in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_file(self) -> File {
        self.file
    }
}
