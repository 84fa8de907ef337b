//! Output renaming
//!
//! Inserts a prefix or suffix into file names (`a.css` -> `a-min.css`), or
//! hands the identifier to a user function. The same rule rewrites output
//! paths and the identifiers of rewritten imports, so renamed files keep
//! pointing at each other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::resolver::{display_relative, normalize_id, normalize_path};

/// `rename` as written in a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenameSetting {
    /// Shorthand for a `-debug` suffix; wins over `min` and `suffix`
    #[serde(default)]
    pub debug: bool,
    /// Shorthand for a `-min` suffix; wins over `suffix`
    #[serde(default)]
    pub min: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// How file names are rewritten
#[derive(Clone)]
pub enum Rename {
    /// `prefix` goes before the file stem, `suffix` between stem and extension
    Affix { prefix: String, suffix: String },
    /// Receives a forward-slash identifier, returns the renamed one
    With(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl From<RenameSetting> for Rename {
    fn from(setting: RenameSetting) -> Self {
        let suffix = if setting.debug {
            "-debug".to_string()
        } else if setting.min {
            "-min".to_string()
        } else {
            setting.suffix.unwrap_or_default()
        };

        Rename::Affix {
            prefix: setting.prefix.unwrap_or_default(),
            suffix,
        }
    }
}

impl Rename {
    /// Rename the last segment of an identifier
    pub fn apply(&self, id: &str) -> String {
        match self {
            Rename::Affix { prefix, suffix } => affix(id, prefix, suffix),
            Rename::With(transform) => normalize_id(&transform(id)),
        }
    }

    /// Rename an absolute path. The rule sees the path relative to `root`;
    /// a root-relative result (`/x.css`) is taken from `root` as well.
    pub fn apply_path(&self, path: &Path, root: &Path) -> PathBuf {
        let renamed = self.apply(&display_relative(path, root));
        normalize_path(&root.join(renamed.trim_start_matches('/')))
    }
}

fn affix(id: &str, prefix: &str, suffix: &str) -> String {
    let (dir, name) = match id.rfind('/') {
        Some(slash) => id.split_at(slash + 1),
        None => ("", id),
    };
    if name.is_empty() || name == "." || name == ".." {
        return id.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };

    format!("{}{}{}{}{}", dir, prefix, stem, suffix, extension)
}

impl fmt::Debug for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rename::Affix { prefix, suffix } => f
                .debug_struct("Affix")
                .field("prefix", prefix)
                .field("suffix", suffix)
                .finish(),
            Rename::With(_) => f.write_str("With"),
        }
    }
}
