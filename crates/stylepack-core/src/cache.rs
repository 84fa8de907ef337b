use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::parser::ModuleMetadata;

/// Parsed modules keyed by absolute path and packaging mode.
///
/// Lives for the duration of one stream: a module imported by several
/// entries is read and parsed once per mode. A file packaged for inlining
/// (imports deleted) and the same file packaged standalone (imports
/// rewritten in place) are different results and are stored apart.
/// Entries are never invalidated while the stream is running.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    combined: FxHashMap<PathBuf, Arc<ModuleMetadata>>,
    standalone: FxHashMap<PathBuf, Arc<ModuleMetadata>>,
    hits: usize,
    misses: usize,
}

/// Counters reported when a stream finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, combine: bool) -> &FxHashMap<PathBuf, Arc<ModuleMetadata>> {
        if combine {
            &self.combined
        } else {
            &self.standalone
        }
    }

    /// Look up a module, counting the hit or miss
    pub fn get(&mut self, path: &Path, combine: bool) -> Option<Arc<ModuleMetadata>> {
        match self.table(combine).get(path).cloned() {
            Some(module) => {
                self.hits += 1;
                debug!("Cache hit for {}", path.display());
                Some(module)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, path: PathBuf, combine: bool, module: Arc<ModuleMetadata>) {
        let table = if combine {
            &mut self.combined
        } else {
            &mut self.standalone
        };
        table.insert(path, module);
    }

    pub fn contains(&self, path: &Path, combine: bool) -> bool {
        self.table(combine).contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.combined.len() + self.standalone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_empty() && self.standalone.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Drop every entry and reset the counters
    pub fn clear(&mut self) {
        self.combined.clear();
        self.standalone.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str) -> Arc<ModuleMetadata> {
        Arc::new(ModuleMetadata {
            path: PathBuf::from(path),
            ..ModuleMetadata::default()
        })
    }

    #[test]
    fn test_hits_and_misses() {
        let mut cache = ResolutionCache::new();
        assert!(cache.get(Path::new("/a.css"), true).is_none());

        cache.insert(PathBuf::from("/a.css"), true, module("/a.css"));
        assert!(cache.get(Path::new("/a.css"), true).is_some());
        assert!(cache.get(Path::new("/a.css"), true).is_some());

        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 2,
                misses: 1
            }
        );
    }

    #[test]
    fn test_modes_are_stored_apart() {
        let mut cache = ResolutionCache::new();
        cache.insert(PathBuf::from("/a.css"), false, module("/a.css"));

        assert!(cache.contains(Path::new("/a.css"), false));
        assert!(!cache.contains(Path::new("/a.css"), true));
        assert!(cache.get(Path::new("/a.css"), true).is_none());

        cache.insert(PathBuf::from("/a.css"), true, module("/a.css"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut cache = ResolutionCache::new();
        cache.insert(PathBuf::from("/a.css"), true, module("/a.css"));
        cache.get(Path::new("/a.css"), true);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(Path::new("/a.css"), true));
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
