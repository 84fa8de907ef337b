use glob::Pattern;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bundler::OnBundle;
use crate::errors::{BundleError, Result};
use crate::map::{IdentifierMap, MapRule, PrefixMap};
use crate::packager::OnPath;
use crate::plugin::{Plugin, PluginPipeline};
use crate::rename::{Rename, RenameSetting};
use crate::resolver::{display_relative, normalize_path};

/// `combine` as written in a configuration file: a flag, or glob patterns
/// (relative to the root) selecting the files whose imports are inlined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CombineSetting {
    Enabled(bool),
    Patterns(Vec<String>),
}

impl Default for CombineSetting {
    fn default() -> Self {
        CombineSetting::Enabled(false)
    }
}

/// Serializable part of the bundler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundlerConfig {
    /// Sandbox root; relative paths are resolved against the config file's
    /// directory
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Inline imported stylesheets (default: false)
    #[serde(default)]
    pub combine: CombineSetting,

    /// Identifier prefix rewrites, first match wins
    #[serde(default)]
    pub map: Vec<MapRule>,

    /// Output renaming (`{ "min": true }`, `{ "suffix": "-v2" }`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameSetting>,
}

/// Values given on the command line; they win over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub combine: Option<bool>,
}

impl BundlerConfig {
    /// Load configuration from a JSON or YAML file, picked by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;

        let is_yaml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        let mut config: BundlerConfig = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| BundleError::Config(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| BundleError::Config(e.to_string()))?
        };

        if let (Some(root), Some(dir)) = (config.root.as_ref(), path.parent()) {
            if root.is_relative() {
                config.root = Some(dir.join(root));
            }
        }

        Ok(config)
    }

    /// Create a default configuration and write it to a file
    pub fn init_file(path: &Path) -> Result<()> {
        let config = BundlerConfig {
            root: Some(PathBuf::from(".")),
            ..BundlerConfig::default()
        };
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| BundleError::Config(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| BundleError::io(path, e))?;
        Ok(())
    }

    /// Merge CLI overrides into this configuration
    pub fn merge(&mut self, overrides: &CliOverrides) {
        if let Some(root) = &overrides.root {
            self.root = Some(root.clone());
        }
        if let Some(combine) = overrides.combine {
            self.combine = CombineSetting::Enabled(combine);
        }
    }

    /// Start an options builder from this configuration.
    ///
    /// `default_root` is used when the file does not name a root.
    pub fn into_builder(self, default_root: &Path) -> BundlerOptionsBuilder {
        let root = self.root.unwrap_or_else(|| default_root.to_path_buf());
        let mut builder = BundlerOptions::builder(root);

        builder = match self.combine {
            CombineSetting::Enabled(enabled) => builder.combine(enabled),
            CombineSetting::Patterns(patterns) => builder.combine_patterns(patterns),
        };

        if !self.map.is_empty() {
            builder = builder.map(PrefixMap::new(self.map));
        }
        if let Some(rename) = self.rename {
            builder = builder.rename(rename);
        }

        builder
    }
}

/// Decides, per file, whether its imports are inlined
#[derive(Clone)]
pub enum Combine {
    Always(bool),
    Patterns(Vec<Pattern>),
    Predicate(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
}

impl Combine {
    pub fn evaluate(&self, path: &Path, root: &Path) -> bool {
        match self {
            Combine::Always(enabled) => *enabled,
            Combine::Patterns(patterns) => {
                let relative = display_relative(path, root);
                patterns.iter().any(|pattern| pattern.matches(&relative))
            }
            Combine::Predicate(predicate) => predicate(path),
        }
    }
}

impl fmt::Debug for Combine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combine::Always(enabled) => f.debug_tuple("Always").field(enabled).finish(),
            Combine::Patterns(patterns) => f
                .debug_tuple("Patterns")
                .field(&patterns.iter().map(Pattern::as_str).collect::<Vec<_>>())
                .finish(),
            Combine::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

/// Validated, immutable bundler options
pub struct BundlerOptions {
    root: PathBuf,
    combine: Combine,
    map: Option<Arc<dyn IdentifierMap>>,
    onpath: Option<Arc<dyn OnPath>>,
    onbundle: Option<Arc<dyn OnBundle>>,
    rename: Option<Rename>,
    plugins: PluginPipeline,
}

impl BundlerOptions {
    pub fn builder(root: impl Into<PathBuf>) -> BundlerOptionsBuilder {
        BundlerOptionsBuilder {
            root: root.into(),
            combine: CombineInput::Flag(false),
            map: None,
            onpath: None,
            onbundle: None,
            rename: None,
            plugins: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the imports of `path` are inlined
    pub fn combines(&self, path: &Path) -> bool {
        self.combine.evaluate(path, &self.root)
    }

    pub fn map(&self) -> Option<&dyn IdentifierMap> {
        self.map.as_deref()
    }

    pub fn onpath(&self) -> Option<&dyn OnPath> {
        self.onpath.as_deref()
    }

    pub fn onbundle(&self) -> Option<&dyn OnBundle> {
        self.onbundle.as_deref()
    }

    pub fn rename(&self) -> Option<&Rename> {
        self.rename.as_ref()
    }

    pub fn plugins(&self) -> &PluginPipeline {
        &self.plugins
    }
}

impl fmt::Debug for BundlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundlerOptions")
            .field("root", &self.root)
            .field("combine", &self.combine)
            .field("map", &self.map.is_some())
            .field("onpath", &self.onpath.is_some())
            .field("onbundle", &self.onbundle.is_some())
            .field("rename", &self.rename)
            .field("plugins", &self.plugins)
            .finish()
    }
}

enum CombineInput {
    Flag(bool),
    Patterns(Vec<String>),
    Predicate(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
}

/// Collects options; [`build`](BundlerOptionsBuilder::build) validates them
pub struct BundlerOptionsBuilder {
    root: PathBuf,
    combine: CombineInput,
    map: Option<Arc<dyn IdentifierMap>>,
    onpath: Option<Arc<dyn OnPath>>,
    onbundle: Option<Arc<dyn OnBundle>>,
    rename: Option<Rename>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl BundlerOptionsBuilder {
    pub fn combine(mut self, enabled: bool) -> Self {
        self.combine = CombineInput::Flag(enabled);
        self
    }

    /// Inline imports only for files matching one of these globs
    pub fn combine_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.combine = CombineInput::Patterns(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn combine_with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.combine = CombineInput::Predicate(Arc::new(predicate));
        self
    }

    pub fn map(mut self, map: impl IdentifierMap + 'static) -> Self {
        self.map = Some(Arc::new(map));
        self
    }

    pub fn onpath(mut self, onpath: impl OnPath + 'static) -> Self {
        self.onpath = Some(Arc::new(onpath));
        self
    }

    pub fn onbundle(mut self, onbundle: impl OnBundle + 'static) -> Self {
        self.onbundle = Some(Arc::new(onbundle));
        self
    }

    /// Rename output files and the imports that point at them
    pub fn rename(mut self, rename: impl Into<Rename>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    pub fn rename_with<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.rename = Some(Rename::With(Arc::new(transform)));
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    pub fn build(self) -> Result<BundlerOptions> {
        if self.root.as_os_str().is_empty() {
            return Err(BundleError::Config("root must not be empty".to_string()));
        }
        if !self.root.is_absolute() {
            return Err(BundleError::Config(format!(
                "root must be an absolute path, got {}",
                self.root.display()
            )));
        }

        let mut names = FxHashSet::default();
        for plugin in &self.plugins {
            let name = plugin.name();
            if name.trim().is_empty() {
                return Err(BundleError::Config("plugin name must not be empty".to_string()));
            }
            if !names.insert(name.to_string()) {
                return Err(BundleError::Config(format!(
                    "plugin '{}' is registered more than once",
                    name
                )));
            }
        }

        let combine = match self.combine {
            CombineInput::Flag(enabled) => Combine::Always(enabled),
            CombineInput::Patterns(patterns) => Combine::Patterns(
                patterns
                    .iter()
                    .map(|p| {
                        Pattern::new(p).map_err(|e| {
                            BundleError::Config(format!("invalid combine pattern '{}': {}", p, e))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            CombineInput::Predicate(predicate) => Combine::Predicate(predicate),
        };

        Ok(BundlerOptions {
            root: normalize_path(&self.root),
            combine,
            map: self.map,
            onpath: self.onpath,
            onbundle: self.onbundle,
            rename: self.rename,
            plugins: PluginPipeline::new(self.plugins),
        })
    }
}
