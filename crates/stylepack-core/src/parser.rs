//! Per-file module parsing
//!
//! Picks a packager by file extension and threads the file's contents
//! through the plugin hooks around it: `load` before the packager, then
//! `parse` and `bundle` after it.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::BundlerOptions;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::{BundleError, Result};
use crate::file::FileRecord;
use crate::fs::FileSystem;
use crate::packager::{CssPackager, PackageContext, Packager, RemoteImport};
use crate::plugin::{Hook, HookContext};
use crate::resolver::normalize_path;

/// What the bundler keeps about a parsed module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMetadata {
    /// Output path: the normalized source path, renamed when configured
    pub path: PathBuf,
    /// Readable local imports in declaration order, without duplicates
    pub dependencies: IndexSet<PathBuf>,
    pub remote: IndexSet<RemoteImport>,
    /// Contents after every plugin hook ran
    pub contents: Vec<u8>,
}

impl ModuleMetadata {
    /// Metadata for a file no packager handles: contents unchanged, no
    /// dependencies
    pub fn passthrough(path: &Path, contents: &[u8]) -> Self {
        Self {
            path: path.to_path_buf(),
            contents: contents.to_vec(),
            ..Self::default()
        }
    }
}

/// Shared collaborators for one parse
pub struct ParseEnv<'a> {
    pub options: &'a BundlerOptions,
    /// Whether the file is being inlined into a combined bundle. Decided
    /// once per entry by the bundler and applied to every file it reaches.
    pub combine: bool,
    pub fs: &'a dyn FileSystem,
    pub diagnostics: &'a dyn DiagnosticHandler,
}

/// Extension dispatch table
#[derive(Clone)]
pub struct ModuleParser {
    packagers: FxHashMap<String, Arc<dyn Packager>>,
}

impl ModuleParser {
    /// Parser with the `.css` packager registered
    pub fn new() -> Self {
        let mut parser = Self::empty();
        parser.register("css", Arc::new(CssPackager));
        parser
    }

    pub fn empty() -> Self {
        Self {
            packagers: FxHashMap::default(),
        }
    }

    /// Register (or replace) the packager for an extension, given without
    /// the leading dot
    pub fn register(&mut self, extension: &str, packager: Arc<dyn Packager>) {
        self.packagers.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            packager,
        );
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.packagers.contains_key(&extension.to_ascii_lowercase())
    }

    fn packager_for(&self, file: &FileRecord) -> Option<&Arc<dyn Packager>> {
        file.extension().and_then(|ext| self.packagers.get(&ext))
    }

    pub fn parse_file(&self, file: &FileRecord, env: &ParseEnv<'_>) -> Result<ModuleMetadata> {
        if file.is_stream() {
            return Err(BundleError::StreamingNotSupported {
                path: file.path.clone(),
            });
        }
        let bytes = file.bytes().unwrap_or_default();
        let path = normalize_path(&file.path);

        let Some(packager) = self.packager_for(file) else {
            debug!("No packager for {}, passing through", path.display());
            return Ok(ModuleMetadata::passthrough(&path, bytes));
        };

        let options = env.options;
        let plugins = options.plugins();
        let hook_ctx = HookContext {
            root: options.root(),
            base: &file.base,
        };

        let contents = String::from_utf8_lossy(bytes).into_owned();
        let contents = plugins.run(Hook::Load, &path, contents, &hook_ctx)?;

        let package_ctx = PackageContext {
            root: options.root(),
            combine: env.combine,
            fs: env.fs,
            map: options.map(),
            rename: options.rename(),
            onpath: options.onpath(),
            diagnostics: env.diagnostics,
        };
        let packaged = packager.parse(&path, &contents, &package_ctx)?;

        let contents = plugins.run(Hook::Parse, &path, packaged.contents, &hook_ctx)?;
        let contents = plugins.run(Hook::Bundle, &path, contents, &hook_ctx)?;

        debug!(
            "Parsed {} ({} dependencies)",
            path.display(),
            packaged.dependencies.len()
        );

        let path = match options.rename() {
            Some(rename) => rename.apply_path(&packaged.path, options.root()),
            None => packaged.path,
        };

        Ok(ModuleMetadata {
            path,
            dependencies: packaged.dependencies,
            remote: packaged.remote,
            contents: contents.into_bytes(),
        })
    }
}

impl Default for ModuleParser {
    fn default() -> Self {
        Self::new()
    }
}
