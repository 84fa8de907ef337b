//! Import path resolution
//!
//! Turns the raw target of an `@import` into an absolute path inside the
//! configured root, and turns resolved paths back into portable identifiers.
//! Everything here is lexical: the file system is never consulted.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use crate::errors::{BundleError, Result};

/// File appended to directory-style imports (`@import "theme/";`)
pub const INDEX_FILE: &str = "index.css";

/// Collapse `.` and `..` components without touching the disk.
///
/// `..` never climbs above the filesystem root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_root {
                    if !normalized.has_root() {
                        normalized.push("..");
                    }
                } else if normalized.ends_with("..") {
                    normalized.push("..");
                } else {
                    normalized.pop();
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    normalized
}

/// True when `path` is `root` itself or lies underneath it
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(root))
}

/// Imports written as `/css/a.css` are resolved against the root
pub fn is_root_relative(request: &str) -> bool {
    request.starts_with('/') && !request.starts_with("//")
}

/// Remote references are protocol-relative (`//cdn/x.css`) or carry a URL
/// scheme (`http:`, `https:`, `data:`).
///
/// Single-letter schemes are treated as drive letters, not URLs.
pub fn is_remote(request: &str) -> bool {
    if request.starts_with("//") {
        return true;
    }

    match request.find(':') {
        Some(colon) if colon >= 2 => {
            let scheme = &request[..colon];
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

pub fn is_local(request: &str) -> bool {
    !is_remote(request)
}

/// Directory-style imports point at the directory's `index.css`
pub fn expand_index(request: &str) -> Cow<'_, str> {
    if request.ends_with('/') || request.ends_with('\\') {
        Cow::Owned(format!("{}{}", request, INDEX_FILE))
    } else {
        Cow::Borrowed(request)
    }
}

/// Resolve an import target relative to the file that references it.
///
/// Root-relative targets resolve against `root`, everything else against the
/// referer's directory. The result must stay inside `root`.
pub fn resolve(request: &str, referer: &Path, root: &Path) -> Result<PathBuf> {
    let joined = if is_root_relative(request) {
        root.join(request.trim_start_matches('/'))
    } else {
        referer
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .join(request)
    };

    let resolved = normalize_path(&joined);

    if !is_within(&resolved, root) {
        return Err(BundleError::OutOfBounds {
            path: resolved,
            root: normalize_path(root),
        });
    }

    Ok(resolved)
}

/// Canonical forward-slash form of an identifier
pub fn normalize_id(id: &str) -> String {
    let unified = id.replace('\\', "/");
    let mut normalized = String::with_capacity(unified.len());
    let mut previous_slash = false;

    for ch in unified.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(ch);
    }

    normalized
}

/// Portable identifier for a resolved import.
///
/// Root-relative requests are rewritten relative to the referer's directory so
/// the emitted import works wherever the output tree is served from.
pub fn to_identifier(request: &str, resolved: &Path, referer: &Path) -> String {
    if !is_root_relative(request) {
        return normalize_id(request);
    }

    let base = referer.parent().unwrap_or_else(|| Path::new("/"));
    let relative = pathdiff::diff_paths(resolved, base).unwrap_or_else(|| resolved.to_path_buf());

    normalize_id(&relative.to_string_lossy())
}

/// Display form of a path relative to `base`, used in diagnostics
pub fn display_relative(path: &Path, base: &Path) -> String {
    let relative = pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf());
    normalize_id(&relative.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/project/css/../a/./b.css")),
            PathBuf::from("/project/a/b.css")
        );
        assert_eq!(normalize_path(Path::new("/../a.css")), PathBuf::from("/a.css"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_resolve_relative() {
        let resolved = resolve(
            "./sub/x.css",
            Path::new("/project/css/main.css"),
            Path::new("/project"),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/project/css/sub/x.css"));

        let resolved = resolve(
            "../base.css",
            Path::new("/project/css/main.css"),
            Path::new("/project"),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/project/base.css"));
    }

    #[test]
    fn test_resolve_root_relative() {
        let resolved = resolve(
            "/shared/reset.css",
            Path::new("/project/css/main.css"),
            Path::new("/project"),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/project/shared/reset.css"));
    }

    #[test]
    fn test_resolve_out_of_bounds() {
        let err = resolve(
            "../../etc/passwd.css",
            Path::new("/project/css/main.css"),
            Path::new("/project"),
        )
        .unwrap_err();
        assert!(err.is_out_of_bounds());

        let err = resolve(
            "/../outside.css",
            Path::new("/project/main.css"),
            Path::new("/project"),
        )
        .unwrap_err();
        assert!(err.is_out_of_bounds());
    }

    #[test]
    fn test_resolve_sibling_with_shared_prefix_is_out_of_bounds() {
        let err = resolve(
            "../project-other/a.css",
            Path::new("/project/main.css"),
            Path::new("/project"),
        )
        .unwrap_err();
        assert!(err.is_out_of_bounds());
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://cdn.example.com/reset.css"));
        assert!(is_remote("https://cdn.example.com/reset.css"));
        assert!(is_remote("//cdn.example.com/reset.css"));
        assert!(is_remote("data:text/css;base64,Ym9keXt9"));
        assert!(!is_remote("./a.css"));
        assert!(!is_remote("/a.css"));
        assert!(!is_remote("a.css"));
        assert!(!is_remote("C:/styles/a.css"));
        assert!(is_local("theme/"));
    }

    #[test]
    fn test_expand_index() {
        assert_eq!(expand_index("theme/"), "theme/index.css");
        assert_eq!(expand_index("theme/a.css"), "theme/a.css");
    }

    #[test]
    fn test_to_identifier() {
        let referer = Path::new("/project/css/main.css");

        assert_eq!(
            to_identifier("./sub//x.css", Path::new("/project/css/sub/x.css"), referer),
            "./sub/x.css"
        );
        assert_eq!(
            to_identifier("/css/sub/x.css", Path::new("/project/css/sub/x.css"), referer),
            "sub/x.css"
        );
        assert_eq!(
            to_identifier("/shared/a.css", Path::new("/project/shared/a.css"), referer),
            "../shared/a.css"
        );
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("a\\b\\c.css"), "a/b/c.css");
        assert_eq!(normalize_id("a//b///c.css"), "a/b/c.css");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/project/a/b.css"), Path::new("/project")));
        assert!(is_within(Path::new("/project"), Path::new("/project")));
        assert!(!is_within(Path::new("/projects/a.css"), Path::new("/project")));
    }
}
