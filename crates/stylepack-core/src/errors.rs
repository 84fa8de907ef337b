use std::path::PathBuf;
use thiserror::Error;

use crate::plugin::Hook;

/// Errors that abort processing of a single entry file (or, for
/// [`BundleError::Config`], the whole bundler before any file is seen).
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File {} is out of bounds of root {}", .path.display(), .root.display())]
    OutOfBounds { path: PathBuf, root: PathBuf },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin '{plugin}' failed in {hook} hook for {}: {source}", .path.display())]
    Plugin {
        plugin: String,
        hook: Hook,
        path: PathBuf,
        #[source]
        source: PluginError,
    },

    #[error("Identifier map failed for '{id}' in {}: {message}", .referer.display())]
    Map {
        id: String,
        referer: PathBuf,
        message: String,
    },

    #[error("Streaming not supported: {}", .path.display())]
    StreamingNotSupported { path: PathBuf },
}

impl BundleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised by the sandbox check
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, BundleError::OutOfBounds { .. })
    }
}

/// Error returned by a plugin hook
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PluginError {
    pub message: String,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for PluginError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for PluginError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
