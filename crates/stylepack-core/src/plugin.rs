//! Lifecycle plugins
//!
//! A plugin implements any subset of the three hooks; the rest default to
//! returning the contents unchanged. Plugins run strictly in registration
//! order and each one sees the output of the previous one.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{BundleError, PluginError, Result};

/// Points in a module's lifecycle where plugins run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Raw contents, right after the module was read
    Load,
    /// Contents after import extraction and rewriting
    Parse,
    /// Final contents, right before they join the bundle
    Bundle,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Load => "load",
            Hook::Parse => "parse",
            Hook::Bundle => "bundle",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only information handed to every hook
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub root: &'a Path,
    pub base: &'a Path,
}

pub type HookResult = std::result::Result<String, PluginError>;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self, _path: &Path, contents: String, _ctx: &HookContext<'_>) -> HookResult {
        Ok(contents)
    }

    fn parse(&self, _path: &Path, contents: String, _ctx: &HookContext<'_>) -> HookResult {
        Ok(contents)
    }

    fn bundle(&self, _path: &Path, contents: String, _ctx: &HookContext<'_>) -> HookResult {
        Ok(contents)
    }
}

/// Ordered list of plugins
#[derive(Clone, Default)]
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Thread `contents` through every plugin's `hook`; the first failure aborts
    pub fn run(
        &self,
        hook: Hook,
        path: &Path,
        contents: String,
        ctx: &HookContext<'_>,
    ) -> Result<String> {
        let mut contents = contents;

        for plugin in &self.plugins {
            debug!("Running {} hook of plugin '{}' on {}", hook, plugin.name(), path.display());

            let result = match hook {
                Hook::Load => plugin.load(path, contents, ctx),
                Hook::Parse => plugin.parse(path, contents, ctx),
                Hook::Bundle => plugin.bundle(path, contents, ctx),
            };

            contents = result.map_err(|source| BundleError::Plugin {
                plugin: plugin.name().to_string(),
                hook,
                path: path.to_path_buf(),
                source,
            })?;
        }

        Ok(contents)
    }
}

impl fmt::Debug for PluginPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Append(&'static str);

    impl Plugin for Append {
        fn name(&self) -> &str {
            self.0
        }

        fn parse(&self, _path: &Path, contents: String, _ctx: &HookContext<'_>) -> HookResult {
            Ok(format!("{}{}", contents, self.0))
        }
    }

    struct Fail;

    impl Plugin for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        fn load(&self, _path: &Path, _contents: String, _ctx: &HookContext<'_>) -> HookResult {
            Err(PluginError::new("cannot load"))
        }
    }

    fn ctx() -> HookContext<'static> {
        HookContext {
            root: Path::new("/project"),
            base: Path::new("/project"),
        }
    }

    #[test]
    fn test_runs_in_registration_order() {
        let pipeline = PluginPipeline::new(vec![Arc::new(Append("a")), Arc::new(Append("b"))]);
        let out = pipeline
            .run(Hook::Parse, Path::new("/project/x.css"), "x".to_string(), &ctx())
            .unwrap();
        assert_eq!(out, "xab");
    }

    #[test]
    fn test_missing_hooks_are_noops() {
        let pipeline = PluginPipeline::new(vec![Arc::new(Append("a"))]);
        let out = pipeline
            .run(Hook::Load, Path::new("/project/x.css"), "x".to_string(), &ctx())
            .unwrap();
        assert_eq!(out, "x");
    }

    #[test]
    fn test_failure_names_plugin_and_hook() {
        let pipeline = PluginPipeline::new(vec![Arc::new(Append("a")), Arc::new(Fail)]);
        let err = pipeline
            .run(Hook::Load, Path::new("/project/x.css"), "x".to_string(), &ctx())
            .unwrap_err();

        match err {
            BundleError::Plugin { plugin, hook, .. } => {
                assert_eq!(plugin, "fail");
                assert_eq!(hook, Hook::Load);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_names() {
        let pipeline = PluginPipeline::new(vec![Arc::new(Append("a")), Arc::new(Fail)]);
        assert_eq!(pipeline.names(), vec!["a", "fail"]);
        assert_eq!(pipeline.len(), 2);
        assert!(PluginPipeline::default().is_empty());
    }
}
