//! Bundling engine
//!
//! Walks the import graph of an entry depth-first and emits modules in
//! post-order, so every stylesheet appears after everything it imports.
//! A module reachable through several paths is emitted once, at its first
//! completion. Back edges are reported as circular dependencies and skipped.
//!
//! Whether an entry is combined is decided once, from the entry's own path.
//! Every file reached from a combined entry is packaged for inlining, so no
//! live `@import` is left behind relative to some other file's directory.

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::ResolutionCache;
use crate::config::BundlerOptions;
use crate::diagnostics::{DiagnosticCode, DiagnosticHandler};
use crate::errors::{BundleError, Result};
use crate::file::{FileRecord, ModuleInfo};
use crate::fs::FileSystem;
use crate::packager::RemoteImport;
use crate::parser::{ModuleMetadata, ModuleParser, ParseEnv};
use crate::resolver::{display_relative, normalize_path};

/// One module's contribution to a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Called once per bundled entry with the ordered segments
pub trait OnBundle: Send + Sync {
    fn onbundle(&self, entry: &Path, segments: &[Segment]);
}

impl<F> OnBundle for F
where
    F: Fn(&Path, &[Segment]) + Send + Sync,
{
    fn onbundle(&self, entry: &Path, segments: &[Segment]) {
        self(entry, segments)
    }
}

/// Result of bundling one entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    pub entry: PathBuf,
    /// Where the output goes; differs from `entry` when renaming is on
    pub output: PathBuf,
    /// Modules in emission order; the entry is always last
    pub segments: Vec<Segment>,
    /// Hoisted remote imports, first-seen order
    pub remote: Vec<RemoteImport>,
    /// Back edges found during traversal, as (importer, imported)
    pub cycles: Vec<(PathBuf, PathBuf)>,
    /// The entry's direct local dependencies
    pub dependencies: Vec<PathBuf>,
    /// Final output written back to the entry record
    pub contents: Vec<u8>,
}

impl Bundle {
    pub fn module_paths(&self) -> Vec<&Path> {
        self.segments.iter().map(|s| s.path.as_path()).collect()
    }
}

/// Where a module stands in the current traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    InProgress,
    Resolved,
}

/// State of a single entry's traversal
struct Traversal<'a> {
    cache: &'a mut ResolutionCache,
    base: &'a Path,
    combine: bool,
    states: FxHashMap<PathBuf, VisitState>,
    stack: Vec<PathBuf>,
    segments: Vec<Segment>,
    remote: IndexSet<RemoteImport>,
    cycles: Vec<(PathBuf, PathBuf)>,
    reported: FxHashSet<(PathBuf, PathBuf)>,
}

pub struct Bundler {
    options: Arc<BundlerOptions>,
    parser: ModuleParser,
    fs: Arc<dyn FileSystem>,
    diagnostics: Arc<dyn DiagnosticHandler>,
}

impl Bundler {
    pub fn new(
        options: Arc<BundlerOptions>,
        fs: Arc<dyn FileSystem>,
        diagnostics: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Self {
            options,
            parser: ModuleParser::new(),
            fs,
            diagnostics,
        }
    }

    /// Replace the extension dispatch table
    pub fn with_parser(mut self, parser: ModuleParser) -> Self {
        self.parser = parser;
        self
    }

    /// Bundle one entry with a private cache
    pub fn bundle(&self, entry: &mut FileRecord) -> Result<Bundle> {
        let mut cache = ResolutionCache::new();
        self.bundle_with_cache(entry, &mut cache)
    }

    /// Bundle one entry, reusing modules parsed earlier in the same stream.
    ///
    /// On success the entry record's contents are replaced with the bundle
    /// output and its [`ModuleInfo`] is filled in. On failure the record is
    /// left untouched.
    pub fn bundle_with_cache(
        &self,
        entry: &mut FileRecord,
        cache: &mut ResolutionCache,
    ) -> Result<Bundle> {
        if entry.is_stream() {
            return Err(BundleError::StreamingNotSupported {
                path: entry.path.clone(),
            });
        }
        if entry.is_null() {
            return Ok(Bundle {
                entry: entry.path.clone(),
                output: entry.path.clone(),
                ..Bundle::default()
            });
        }

        let entry_path = normalize_path(&entry.path);
        let base = entry.base.clone();
        let combine = self.options.combines(&entry_path);

        let mut traversal = Traversal {
            cache,
            base: &base,
            combine,
            states: FxHashMap::default(),
            stack: Vec::new(),
            segments: Vec::new(),
            remote: IndexSet::new(),
            cycles: Vec::new(),
            reported: FxHashSet::default(),
        };

        traversal
            .states
            .insert(entry_path.clone(), VisitState::InProgress);
        let metadata = self.module(&entry_path, Some(&*entry), &mut traversal)?;
        self.enter(&entry_path, &metadata, &mut traversal)?;

        let Traversal {
            segments,
            remote,
            cycles,
            ..
        } = traversal;

        let contents = if combine {
            let mut output: Vec<u8> = remote
                .iter()
                .flat_map(|import| import.statement().into_bytes())
                .collect();
            for segment in &segments {
                output.extend_from_slice(&segment.contents);
            }
            output
        } else {
            metadata.contents.clone()
        };

        if let Some(onbundle) = self.options.onbundle() {
            onbundle.onbundle(&entry_path, &segments);
        }

        info!(
            "Bundled {} ({} modules, {} remote imports)",
            display_relative(&entry_path, self.options.root()),
            segments.len(),
            remote.len()
        );

        let dependencies: Vec<PathBuf> = metadata.dependencies.iter().cloned().collect();
        let remote: Vec<RemoteImport> = if combine {
            remote.into_iter().collect()
        } else {
            metadata.remote.iter().cloned().collect()
        };

        entry.path = metadata.path.clone();
        entry.set_contents(contents.clone());
        entry.module = Some(ModuleInfo {
            dependencies: dependencies.clone(),
            remote: remote.iter().map(|r| r.url.clone()).collect(),
        });

        Ok(Bundle {
            entry: entry_path,
            output: metadata.path.clone(),
            segments,
            remote,
            cycles,
            dependencies,
            contents,
        })
    }

    /// Cached metadata for `path`, parsing it on first sight
    fn module(
        &self,
        path: &Path,
        entry: Option<&FileRecord>,
        traversal: &mut Traversal<'_>,
    ) -> Result<Arc<ModuleMetadata>> {
        if let Some(metadata) = traversal.cache.get(path, traversal.combine) {
            return Ok(metadata);
        }

        let loaded;
        let file = match entry {
            Some(file) => file,
            None => {
                loaded = FileRecord::load(self.fs.as_ref(), path, traversal.base)?;
                &loaded
            }
        };

        let env = ParseEnv {
            options: &self.options,
            combine: traversal.combine,
            fs: self.fs.as_ref(),
            diagnostics: self.diagnostics.as_ref(),
        };
        let metadata = Arc::new(self.parser.parse_file(file, &env)?);
        traversal
            .cache
            .insert(path.to_path_buf(), traversal.combine, Arc::clone(&metadata));

        Ok(metadata)
    }

    /// Descend into the dependencies of a module already marked in progress,
    /// then emit it
    fn enter(
        &self,
        path: &Path,
        metadata: &ModuleMetadata,
        traversal: &mut Traversal<'_>,
    ) -> Result<()> {
        traversal.stack.push(path.to_path_buf());

        if traversal.combine {
            for remote in &metadata.remote {
                if traversal.remote.insert(remote.clone()) {
                    self.diagnostics.info(
                        DiagnosticCode::RemoteHoisted,
                        path,
                        &format!("Hoisted remote import {:?}", remote.url),
                    );
                }
            }

            for dependency in &metadata.dependencies {
                self.visit(dependency, path, traversal)?;
            }
        }

        traversal.stack.pop();
        traversal
            .states
            .insert(path.to_path_buf(), VisitState::Resolved);
        traversal.segments.push(Segment {
            path: path.to_path_buf(),
            contents: metadata.contents.clone(),
        });

        Ok(())
    }

    fn visit(&self, path: &Path, importer: &Path, traversal: &mut Traversal<'_>) -> Result<()> {
        match traversal.states.get(path) {
            Some(VisitState::Resolved) => {
                debug!("{} already emitted", path.display());
                Ok(())
            }
            Some(VisitState::InProgress) => {
                self.report_cycle(importer, path, traversal);
                Ok(())
            }
            None => {
                traversal
                    .states
                    .insert(path.to_path_buf(), VisitState::InProgress);
                let metadata = self.module(path, None, traversal)?;
                self.enter(path, &metadata, traversal)
            }
        }
    }

    fn report_cycle(&self, importer: &Path, imported: &Path, traversal: &mut Traversal<'_>) {
        let edge = (importer.to_path_buf(), imported.to_path_buf());
        if !traversal.reported.insert(edge.clone()) {
            return;
        }

        let root = self.options.root();
        let start = traversal
            .stack
            .iter()
            .position(|p| p == imported)
            .unwrap_or(0);
        let chain: Vec<String> = traversal.stack[start..]
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(imported))
            .map(|p| display_relative(p, root))
            .collect();
        let message = format!("Found circular dependency {}", chain.join(" -> "));
        warn!("{}", message);
        self.diagnostics
            .error(DiagnosticCode::CircularDependency, importer, &message);
        traversal.cycles.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::fs::MockFileSystem;

    fn bundler(fs: MockFileSystem, combine: bool) -> (Bundler, Arc<CollectingDiagnosticHandler>) {
        let options = BundlerOptions::builder("/project")
            .combine(combine)
            .build()
            .unwrap();
        let diagnostics = Arc::new(CollectingDiagnosticHandler::new());
        let bundler = Bundler::new(Arc::new(options), Arc::new(fs), diagnostics.clone());
        (bundler, diagnostics)
    }

    #[test]
    fn test_post_order_concatenation() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/project/a.css", "@import 'c.css';\n.a {}\n");
        fs.add_file("/project/b.css", ".b {}\n");
        fs.add_file("/project/c.css", ".c {}\n");
        let (bundler, _) = bundler(fs, true);

        let mut entry = FileRecord::new(
            "/project/main.css",
            "/project",
            "@import 'a.css';\n@import 'b.css';\n.main {}\n",
        );
        let bundle = bundler.bundle(&mut entry).unwrap();

        assert_eq!(
            bundle.module_paths(),
            vec![
                Path::new("/project/c.css"),
                Path::new("/project/a.css"),
                Path::new("/project/b.css"),
                Path::new("/project/main.css"),
            ]
        );
        assert_eq!(
            String::from_utf8(bundle.contents).unwrap(),
            ".c {}\n\n.a {}\n.b {}\n\n\n.main {}\n"
        );
    }

    #[test]
    fn test_non_combine_leaves_imports_live() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/project/a.css", ".a {}\n");
        let (bundler, _) = bundler(fs, false);

        let mut entry = FileRecord::new("/project/main.css", "/project", "@import 'a.css';\n");
        let bundle = bundler.bundle(&mut entry).unwrap();

        assert_eq!(bundle.segments.len(), 1);
        assert_eq!(entry.bytes().unwrap(), b"@import \"a.css\";\n");
        assert_eq!(
            entry.module.as_ref().unwrap().dependencies,
            vec![PathBuf::from("/project/a.css")]
        );
    }

    #[test]
    fn test_cycle_reported_once() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/project/a.css", "@import 'b.css';\n.a {}\n");
        fs.add_file("/project/b.css", "@import 'a.css';\n.b {}\n");
        let (bundler, diagnostics) = bundler(fs, true);

        let mut entry = FileRecord::new("/project/main.css", "/project", "@import 'a.css';\n");
        let bundle = bundler.bundle(&mut entry).unwrap();

        assert_eq!(
            bundle.cycles,
            vec![(PathBuf::from("/project/b.css"), PathBuf::from("/project/a.css"))]
        );
        assert_eq!(
            diagnostics
                .with_code(DiagnosticCode::CircularDependency)
                .len(),
            1
        );
        assert_eq!(
            bundle.module_paths(),
            vec![
                Path::new("/project/b.css"),
                Path::new("/project/a.css"),
                Path::new("/project/main.css"),
            ]
        );
    }

    #[test]
    fn test_null_and_stream_entries() {
        let (bundler, _) = bundler(MockFileSystem::new(), true);

        let mut entry = FileRecord::null("/project/dir", "/project");
        let bundle = bundler.bundle(&mut entry).unwrap();
        assert!(bundle.segments.is_empty());
        assert!(entry.is_null());

        let mut entry = FileRecord {
            contents: crate::file::Contents::Stream(Box::new(std::io::empty())),
            ..FileRecord::null("/project/a.css", "/project")
        };
        let err = bundler.bundle(&mut entry).unwrap_err();
        assert!(matches!(err, BundleError::StreamingNotSupported { .. }));
    }
}
