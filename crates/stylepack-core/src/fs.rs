//! File system seam used by the module loader
//!
//! The bundler never touches `std::fs` directly; everything goes through a
//! [`FileSystem`] so tests can run against an in-memory tree and count reads.

use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use crate::file::FileStat;

pub trait FileSystem: Send + Sync {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// Cheap readability probe used before a dependency is registered
    fn is_readable(&self, path: &Path) -> bool;
}

/// File system backed by the real disk
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn is_readable(&self, path: &Path) -> bool {
        std::fs::File::open(path)
            .and_then(|file| file.metadata())
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

/// In-memory file system for tests
#[derive(Debug, Default)]
pub struct MockFileSystem {
    files: FxHashMap<PathBuf, Vec<u8>>,
    reads: Mutex<FxHashMap<PathBuf, usize>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        self.files
            .insert(path.as_ref().to_path_buf(), contents.as_ref().to_vec());
    }

    /// Number of times `read_file` succeeded for this path
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// Total number of successful reads across all paths
    pub fn total_reads(&self) -> usize {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl FileSystem for MockFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let contents = self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )
        })?;

        *self
            .reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_insert(0) += 1;

        Ok(contents)
    }

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        self.files
            .get(path)
            .map(|contents| FileStat {
                size: contents.len() as u64,
                modified: Some(SystemTime::UNIX_EPOCH),
            })
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                )
            })
    }

    fn is_readable(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
