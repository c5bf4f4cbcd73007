//! Blob storage - annotation documents as files at absolute paths

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use crate::Result;

/// File operations the annotation core performs on blob paths
pub trait BlobGateway {
    fn exists(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Write `content`, replacing any existing file at `path`
    fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    fn delete(&self, path: &str) -> std::io::Result<()>;
}

/// Plain filesystem blob store
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBlobStore;

impl FsBlobStore {
    pub fn new() -> Self {
        Self
    }
}

impl BlobGateway for FsBlobStore {
    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        atomic_write(Path::new(path), content)
    }

    fn delete(&self, path: &str) -> std::io::Result<()> {
        fs::remove_file(path)
    }
}

/// Write through a uniquely named sibling temp file and rename it over the
/// target, so readers see either the old or the new document.
fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
