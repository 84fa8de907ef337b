use tracing::{debug, info};

use crate::bundler::Bundler;
use crate::cache::{CacheStats, ResolutionCache};
use crate::errors::{BundleError, Result};
use crate::file::FileRecord;

/// A run of entry files sharing one resolution cache.
///
/// Files are processed one at a time in arrival order. A failing file does
/// not stop the stream. The cache is cleared when the stream finishes or is
/// dropped.
pub struct BundleStream<'a> {
    bundler: &'a Bundler,
    cache: ResolutionCache,
    processed: usize,
    failed: usize,
}

/// What a finished stream did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub processed: usize,
    pub failed: usize,
    pub cache: CacheStats,
}

impl<'a> BundleStream<'a> {
    pub fn new(bundler: &'a Bundler) -> Self {
        Self {
            bundler,
            cache: ResolutionCache::new(),
            processed: 0,
            failed: 0,
        }
    }

    /// Bundle one file. Null files pass through unchanged.
    pub fn process(&mut self, mut file: FileRecord) -> Result<FileRecord> {
        self.processed += 1;

        if file.is_null() {
            debug!("Passing through {}", file.path.display());
            return Ok(file);
        }
        if file.is_stream() {
            self.failed += 1;
            return Err(BundleError::StreamingNotSupported { path: file.path });
        }

        match self.bundler.bundle_with_cache(&mut file, &mut self.cache) {
            Ok(_) => Ok(file),
            Err(e) => {
                self.failed += 1;
                Err(e)
            }
        }
    }

    pub fn process_all<I>(&mut self, files: I) -> Vec<Result<FileRecord>>
    where
        I: IntoIterator<Item = FileRecord>,
    {
        files.into_iter().map(|file| self.process(file)).collect()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// End the stream and release the cache
    pub fn finish(mut self) -> StreamSummary {
        let summary = StreamSummary {
            processed: self.processed,
            failed: self.failed,
            cache: self.cache.stats(),
        };
        self.cache.clear();

        info!(
            "Processed {} files ({} failed), {} modules cached, {} cache hits",
            summary.processed, summary.failed, summary.cache.entries, summary.cache.hits
        );

        summary
    }
}

impl Drop for BundleStream<'_> {
    fn drop(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BundlerOptions;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::fs::MockFileSystem;
    use std::sync::Arc;

    #[test]
    fn test_shared_module_parsed_once() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/project/shared.css", ".shared {}\n");
        fs.add_file("/project/a.css", "@import 'shared.css';\n.a {}\n");
        fs.add_file("/project/b.css", "@import 'shared.css';\n.b {}\n");
        let fs = Arc::new(fs);

        let options = BundlerOptions::builder("/project")
            .combine(true)
            .build()
            .unwrap();
        let bundler = Bundler::new(
            Arc::new(options),
            fs.clone(),
            Arc::new(CollectingDiagnosticHandler::new()),
        );

        let mut stream = BundleStream::new(&bundler);
        let results = stream.process_all([
            FileRecord::new("/project/a.css", "/project", "@import 'shared.css';\n.a {}\n"),
            FileRecord::new("/project/b.css", "/project", "@import 'shared.css';\n.b {}\n"),
        ]);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fs.read_count("/project/shared.css"), 1);
        assert!(stream.cache().contains(std::path::Path::new("/project/shared.css"), true));

        let summary = stream.finish();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.cache.hits, 1);
    }
}
