use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{BundleError, Result};

/// Everything an identifier map gets to look at
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    /// Identifier computed by the resolver, forward-slash normalized
    pub id: &'a str,
    pub resolved: &'a Path,
    pub referer: &'a Path,
    pub root: &'a Path,
}

/// User hook that remaps an import identifier before it is emitted.
///
/// `Ok(None)` (or an empty string) keeps the computed identifier.
pub trait IdentifierMap: Send + Sync {
    fn map(&self, ctx: &MapContext<'_>) -> std::result::Result<Option<String>, String>;
}

impl<F> IdentifierMap for F
where
    F: Fn(&MapContext<'_>) -> std::result::Result<Option<String>, String> + Send + Sync,
{
    fn map(&self, ctx: &MapContext<'_>) -> std::result::Result<Option<String>, String> {
        self(ctx)
    }
}

/// Run the configured map, falling back to the computed identifier
pub fn apply_map(map: Option<&dyn IdentifierMap>, ctx: &MapContext<'_>) -> Result<String> {
    let Some(map) = map else {
        return Ok(ctx.id.to_string());
    };

    match map.map(ctx) {
        Ok(Some(mapped)) if !mapped.is_empty() => Ok(mapped),
        Ok(_) => Ok(ctx.id.to_string()),
        Err(message) => Err(BundleError::Map {
            id: ctx.id.to_string(),
            referer: ctx.referer.to_path_buf(),
            message,
        }),
    }
}

/// A single prefix replacement rule from a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapRule {
    pub from: String,
    pub to: String,
}

/// Identifier map built from configuration: the first rule whose `from`
/// prefixes the identifier wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    rules: Vec<MapRule>,
}

impl PrefixMap {
    pub fn new(rules: Vec<MapRule>) -> Self {
        Self { rules }
    }
}

impl IdentifierMap for PrefixMap {
    fn map(&self, ctx: &MapContext<'_>) -> std::result::Result<Option<String>, String> {
        Ok(self.rules.iter().find_map(|rule| {
            ctx.id
                .strip_prefix(rule.from.as_str())
                .map(|rest| format!("{}{}", rule.to, rest))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type MapResult = std::result::Result<Option<String>, String>;

    fn ctx<'a>(id: &'a str) -> MapContext<'a> {
        MapContext {
            id,
            resolved: Path::new("/project/css/a.css"),
            referer: Path::new("/project/css/main.css"),
            root: Path::new("/project"),
        }
    }

    #[test]
    fn test_no_map_keeps_id() {
        assert_eq!(apply_map(None, &ctx("./a.css")).unwrap(), "./a.css");
    }

    #[test]
    fn test_closure_map() {
        let map = |ctx: &MapContext<'_>| -> MapResult { Ok(Some(format!("{}?v=1", ctx.id))) };
        assert_eq!(apply_map(Some(&map), &ctx("./a.css")).unwrap(), "./a.css?v=1");
    }

    #[test]
    fn test_empty_result_keeps_id() {
        let map = |_: &MapContext<'_>| -> MapResult { Ok(Some(String::new())) };
        assert_eq!(apply_map(Some(&map), &ctx("./a.css")).unwrap(), "./a.css");
    }

    #[test]
    fn test_failing_map_is_fatal() {
        let map = |_: &MapContext<'_>| -> MapResult { Err("no mapping".to_string()) };
        let err = apply_map(Some(&map), &ctx("./a.css")).unwrap_err();
        assert!(matches!(err, BundleError::Map { .. }));
        assert!(err.to_string().contains("no mapping"));
    }

    #[test]
    fn test_prefix_map_first_rule_wins() {
        let map = PrefixMap::new(vec![
            MapRule {
                from: "./vendor/".to_string(),
                to: "/static/vendor/".to_string(),
            },
            MapRule {
                from: "./".to_string(),
                to: "/static/".to_string(),
            },
        ]);

        assert_eq!(
            apply_map(Some(&map), &ctx("./vendor/a.css")).unwrap(),
            "/static/vendor/a.css"
        );
        assert_eq!(apply_map(Some(&map), &ctx("./a.css")).unwrap(), "/static/a.css");
        assert_eq!(apply_map(Some(&map), &ctx("a.css")).unwrap(), "a.css");
    }
}
