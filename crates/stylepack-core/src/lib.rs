//! Stylesheet `@import` bundler
//!
//! Resolves the imports of each entry stylesheet inside a sandbox root,
//! rewrites them to portable identifiers and, when combining, inlines the
//! imported files in dependency order.

pub mod bundler;
pub mod cache;
pub mod config;
pub mod css_deps;
pub mod di;
pub mod diagnostics;
pub mod errors;
pub mod file;
pub mod fs;
pub mod map;
pub mod packager;
pub mod parser;
pub mod plugin;
pub mod rename;
pub mod resolver;
pub mod stream;

pub use bundler::{Bundle, Bundler, OnBundle, Segment, VisitState};
pub use cache::{CacheStats, ResolutionCache};
pub use config::{
    BundlerConfig, BundlerOptions, BundlerOptionsBuilder, CliOverrides, Combine, CombineSetting,
};
pub use di::Container;
pub use diagnostics::{
    CollectingDiagnosticHandler, ConsoleDiagnosticHandler, Diagnostic, DiagnosticCode,
    DiagnosticHandler, DiagnosticLevel,
};
pub use errors::{BundleError, PluginError, Result};
pub use file::{Contents, FileRecord, FileStat, ModuleInfo};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use map::{IdentifierMap, MapContext, MapRule, PrefixMap};
pub use packager::{
    CssPackager, OnPath, PackageContext, PackagedModule, Packager, RemoteImport, IMPORT_PROPERTY,
};
pub use parser::{ModuleMetadata, ModuleParser, ParseEnv};
pub use plugin::{Hook, HookContext, HookResult, Plugin, PluginPipeline};
pub use rename::{Rename, RenameSetting};
pub use stream::{BundleStream, StreamSummary};
