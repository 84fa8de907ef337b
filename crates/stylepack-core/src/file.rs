use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::errors::{BundleError, Result};
use crate::fs::FileSystem;

/// Size and modification time of a file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Payload of a [`FileRecord`]
pub enum Contents {
    /// No contents at all (directories, placeholders); passed through untouched
    Null,
    /// Fully materialized bytes
    Buffer(Vec<u8>),
    /// A reader that has not been drained; the bundler rejects these
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Null => f.write_str("Null"),
            Contents::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Contents::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Dependency metadata attached to an output file for downstream tooling
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    /// Absolute paths of the local stylesheets the file imports
    pub dependencies: Vec<PathBuf>,
    /// Remote imports, in first-seen order
    pub remote: Vec<String>,
}

/// One stylesheet (or any other asset) travelling through the bundler
#[derive(Debug)]
pub struct FileRecord {
    pub path: PathBuf,
    pub base: PathBuf,
    pub contents: Contents,
    pub stat: Option<FileStat>,
    pub module: Option<ModuleInfo>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: Contents::Buffer(contents.into()),
            stat: None,
            module: None,
        }
    }

    pub fn null(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: Contents::Null,
            stat: None,
            module: None,
        }
    }

    pub fn with_stat(mut self, stat: FileStat) -> Self {
        self.stat = Some(stat);
        self
    }

    /// Read a module from the file system
    pub fn load(fs: &dyn FileSystem, path: &Path, base: &Path) -> Result<Self> {
        let stat = fs.metadata(path).map_err(|e| BundleError::io(path, e))?;
        let contents = fs.read_file(path).map_err(|e| BundleError::io(path, e))?;

        debug!("Loaded module {} ({} bytes)", path.display(), contents.len());

        Ok(Self::new(path, base, contents).with_stat(stat))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    /// Materialized contents, if any
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn set_contents(&mut self, contents: Vec<u8>) {
        self.contents = Contents::Buffer(contents);
    }

    /// Lowercased extension without the leading dot
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Path relative to the base directory, falling back to the file name
    pub fn relative(&self) -> PathBuf {
        match self.path.strip_prefix(&self.base) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => self
                .path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| self.path.clone()),
        }
    }
}
