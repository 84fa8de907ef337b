//! Stylesheet packager
//!
//! Rewrites the imports of a single stylesheet and reports what it depends on.
//! Traversal of those dependencies is the bundler's job.

use indexmap::IndexSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::css_deps::{self, CssReference, ImportRule, Quote};
use crate::diagnostics::{DiagnosticCode, DiagnosticHandler};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::map::{apply_map, IdentifierMap, MapContext};
use crate::rename::Rename;
use crate::resolver::{self, display_relative};

/// Property name `onpath` receives for `@import` targets
pub const IMPORT_PROPERTY: &str = "@import";

/// Hook invoked for every url a stylesheet emits: `url()` values with their
/// declaration property, and `@import` targets with [`IMPORT_PROPERTY`].
///
/// Returning `Some` replaces the value; quoting is preserved.
pub trait OnPath: Send + Sync {
    fn onpath(&self, property: &str, value: &str, referer: &Path) -> Option<String>;
}

impl<F> OnPath for F
where
    F: Fn(&str, &str, &Path) -> Option<String> + Send + Sync,
{
    fn onpath(&self, property: &str, value: &str, referer: &Path) -> Option<String> {
        self(property, value, referer)
    }
}

/// A remote `@import`, kept verbatim or hoisted to the top of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteImport {
    pub url: String,
    pub media: String,
}

impl RemoteImport {
    /// The statement emitted when the import is hoisted
    pub fn statement(&self) -> String {
        if self.media.is_empty() {
            format!("@import {};\n", Quote::Double.wrap(&escape(&self.url)))
        } else {
            format!(
                "@import {} {};\n",
                Quote::Double.wrap(&escape(&self.url)),
                self.media
            )
        }
    }
}

/// Result of packaging one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagedModule {
    pub path: PathBuf,
    /// Readable local dependencies, absolute, in declaration order
    pub dependencies: IndexSet<PathBuf>,
    pub remote: IndexSet<RemoteImport>,
    pub contents: String,
}

/// Everything a packager needs besides the file itself
pub struct PackageContext<'a> {
    pub root: &'a Path,
    /// Whether imports of this file are inlined by the bundler
    pub combine: bool,
    pub fs: &'a dyn FileSystem,
    pub map: Option<&'a dyn IdentifierMap>,
    pub rename: Option<&'a Rename>,
    pub onpath: Option<&'a dyn OnPath>,
    pub diagnostics: &'a dyn DiagnosticHandler,
}

pub trait Packager: Send + Sync {
    fn parse(&self, path: &Path, contents: &str, ctx: &PackageContext<'_>) -> Result<PackagedModule>;
}

fn escape(id: &str) -> String {
    id.replace('"', "\\\"")
}

/// Run `onpath` over an `@import` target; empty results keep the target
fn onpath_import(ctx: &PackageContext<'_>, target: String, referer: &Path) -> String {
    match ctx
        .onpath
        .and_then(|onpath| onpath.onpath(IMPORT_PROPERTY, &target, referer))
    {
        Some(value) if !value.is_empty() => value,
        _ => target,
    }
}

/// Unquoted `url()` values that gained spaces, quotes or parentheses are
/// wrapped in double quotes
fn url_value(value: String, quote: Quote) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\''));
    if quote == Quote::None && needs_quotes {
        Quote::Double.wrap(&escape(&value))
    } else {
        value
    }
}

/// Packager for `.css` files
#[derive(Debug, Default, Clone, Copy)]
pub struct CssPackager;

impl CssPackager {
    fn rewrite_import(id: &str, media: &str) -> String {
        if media.is_empty() {
            format!("@import {};", Quote::Double.wrap(&escape(id)))
        } else {
            format!("@import {} {};", Quote::Double.wrap(&escape(id)), media)
        }
    }

    /// Returns the replacement for the statement, or `None` to keep it verbatim
    fn local_import(
        &self,
        rule: &ImportRule,
        referer: &Path,
        ctx: &PackageContext<'_>,
        module: &mut PackagedModule,
    ) -> Result<Option<String>> {
        let rpath = display_relative(referer, ctx.root);

        if !rule.media.is_empty() {
            ctx.diagnostics.warning(
                DiagnosticCode::ImportMedia,
                referer,
                &format!(
                    "Found import media queries {:?} at {:?}, unsupported.",
                    rule.media, rpath
                ),
            );
        }

        let request = resolver::expand_index(&rule.target);
        let resolved = resolver::resolve(&request, referer, ctx.root)?;

        if !ctx.fs.is_readable(&resolved) {
            ctx.diagnostics.warning(
                DiagnosticCode::ModuleNotFound,
                referer,
                &format!("Module {:?} at {:?} can't be found.", rule.target, rpath),
            );
            return Ok(None);
        }

        debug!("{} depends on {}", referer.display(), resolved.display());

        let id = resolver::to_identifier(&request, &resolved, referer);
        let id = match ctx.rename {
            Some(rename) => rename.apply(&id),
            None => id,
        };
        let id = apply_map(
            ctx.map,
            &MapContext {
                id: &id,
                resolved: &resolved,
                referer,
                root: ctx.root,
            },
        )?;

        module.dependencies.insert(resolved);

        if ctx.combine {
            Ok(Some(String::new()))
        } else {
            let id = onpath_import(ctx, id, referer);
            Ok(Some(Self::rewrite_import(&id, &rule.media)))
        }
    }

    /// Records the import and returns its replacement, if any
    fn remote_import(
        &self,
        rule: &ImportRule,
        referer: &Path,
        ctx: &PackageContext<'_>,
        module: &mut PackagedModule,
    ) -> Option<String> {
        ctx.diagnostics.warning(
            DiagnosticCode::RemoteImport,
            referer,
            &format!(
                "Found remote css file {:?} at {:?}, unsupported.",
                rule.target,
                display_relative(referer, ctx.root)
            ),
        );

        let url = onpath_import(ctx, rule.target.clone(), referer);
        let rewritten = url != rule.target;

        module.remote.insert(RemoteImport {
            url: url.clone(),
            media: rule.media.clone(),
        });

        if ctx.combine {
            Some(String::new())
        } else if rewritten {
            Some(Self::rewrite_import(&url, &rule.media))
        } else {
            None
        }
    }
}

impl Packager for CssPackager {
    fn parse(&self, path: &Path, contents: &str, ctx: &PackageContext<'_>) -> Result<PackagedModule> {
        let mut module = PackagedModule {
            path: path.to_path_buf(),
            ..PackagedModule::default()
        };
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();

        for reference in css_deps::scan(contents) {
            match reference {
                CssReference::Import(rule) if resolver::is_local(&rule.target) => {
                    if let Some(replacement) = self.local_import(&rule, path, ctx, &mut module)? {
                        edits.push((rule.span, replacement));
                    }
                }
                CssReference::Import(rule) => {
                    if let Some(replacement) = self.remote_import(&rule, path, ctx, &mut module) {
                        edits.push((rule.span, replacement));
                    }
                }
                CssReference::Url(url) => {
                    let Some(onpath) = ctx.onpath else {
                        continue;
                    };
                    if let Some(value) = onpath.onpath(&url.property, &url.value, path) {
                        edits.push((url.span, url_value(value, url.quote)));
                    }
                }
            }
        }

        module.contents = css_deps::splice(contents, &edits);

        Ok(module)
    }
}
