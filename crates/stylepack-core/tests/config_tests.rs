use std::fs;
use std::path::Path;
use stylepack_core::{
    BundleError, BundlerConfig, CliOverrides, CombineSetting, IdentifierMap, MapContext,
};
use tempfile::TempDir;

// ============================================================================
// File loading
// ============================================================================

#[test]
fn test_load_json_config_with_relative_root() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stylepack.json");
    fs::write(
        &path,
        r#"{ "root": "site", "combine": true, "map": [{ "from": "./", "to": "/css/" }] }"#,
    )
    .unwrap();

    let config = BundlerConfig::from_file(&path).unwrap();

    assert_eq!(config.root, Some(dir.path().join("site")));
    assert_eq!(config.combine, CombineSetting::Enabled(true));
    assert_eq!(config.map.len(), 1);
}

#[test]
fn test_load_yaml_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stylepack.yml");
    fs::write(
        &path,
        "root: /srv/www\ncombine:\n  - \"pages/**/*.css\"\n  - \"app.css\"\n",
    )
    .unwrap();

    let config = BundlerConfig::from_file(&path).unwrap();

    assert_eq!(config.root.as_deref(), Some(Path::new("/srv/www")));
    assert_eq!(
        config.combine,
        CombineSetting::Patterns(vec!["pages/**/*.css".to_string(), "app.css".to_string()])
    );
}

#[test]
fn test_malformed_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stylepack.json");
    fs::write(&path, "{ \"root\": ").unwrap();

    let err = BundlerConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, BundleError::Config(_)));
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = BundlerConfig::from_file(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, BundleError::Io { .. }));
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_cli_overrides_win() {
    let mut config = BundlerConfig {
        root: Some("/from/file".into()),
        combine: CombineSetting::Patterns(vec!["*.css".to_string()]),
        map: Vec::new(),
        rename: None,
    };
    config.merge(&CliOverrides {
        root: None,
        combine: Some(true),
    });

    let options = config.into_builder(Path::new("/cwd")).build().unwrap();
    assert_eq!(options.root(), Path::new("/from/file"));
    assert!(options.combines(Path::new("/from/file/deep/nested.css")));
}

#[test]
fn test_glob_combine_matches_relative_to_root() {
    let config = BundlerConfig {
        root: Some("/site".into()),
        combine: CombineSetting::Patterns(vec!["pages/**/*.css".to_string()]),
        map: Vec::new(),
        rename: None,
    };
    let options = config.into_builder(Path::new("/cwd")).build().unwrap();

    assert!(options.combines(Path::new("/site/pages/blog/post.css")));
    assert!(!options.combines(Path::new("/site/lib/reset.css")));
}

#[test]
fn test_prefix_map_from_config() {
    let json = r#"{ "map": [{ "from": "./", "to": "https://cdn.example.com/" }] }"#;
    let config: BundlerConfig = serde_json::from_str(json).unwrap();
    let options = config.into_builder(Path::new("/site")).build().unwrap();

    let map = options.map().unwrap();
    let mapped = map
        .map(&MapContext {
            id: "./a.css",
            resolved: Path::new("/site/a.css"),
            referer: Path::new("/site/main.css"),
            root: Path::new("/site"),
        })
        .unwrap();
    assert_eq!(mapped.as_deref(), Some("https://cdn.example.com/a.css"));
}

#[test]
fn test_rename_from_yaml_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stylepack.yml");
    fs::write(&path, "root: /site\nrename:\n  suffix: -v2\n").unwrap();

    let config = BundlerConfig::from_file(&path).unwrap();
    let options = config.into_builder(Path::new("/cwd")).build().unwrap();

    let rename = options.rename().unwrap();
    assert_eq!(rename.apply("./theme/a.css"), "./theme/a-v2.css");
    assert_eq!(
        rename.apply_path(Path::new("/site/main.css"), options.root()),
        Path::new("/site/main-v2.css")
    );
}
