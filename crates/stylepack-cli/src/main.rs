use anyhow::Context;
use clap::Parser;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use stylepack_core::resolver::{display_relative, normalize_path};
use stylepack_core::{
    BundleStream, BundlerConfig, CliOverrides, Container, FileRecord, ModuleInfo, ModuleParser,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const CONFIG_FILE: &str = "stylepack.json";

/// stylepack - Resolve, rewrite and combine stylesheet imports
#[derive(Parser, Debug, Clone)]
#[command(name = "stylepack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entry stylesheets, directories or glob patterns
    #[arg(value_name = "PATH")]
    inputs: Vec<String>,

    /// Sandbox root; imports may not resolve outside it (default: current directory)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Base directory output paths are relative to (default: root)
    #[arg(long, value_name = "DIR")]
    base: Option<PathBuf>,

    /// Inline imported stylesheets into each entry
    #[arg(short, long)]
    combine: bool,

    /// Write bundles here instead of stdout
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Path to a stylepack.json or .yaml configuration file
    #[arg(short = 'p', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write each entry's dependency metadata to this JSON file
    #[arg(long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write a starter stylepack.json in the current directory
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set RUST_LOG=debug for detailed logs; stdout is reserved for bundles
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if cli.init {
        return init_project();
    }

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let config = load_config(&cli, &cwd)?;
    let root = config
        .root
        .clone()
        .unwrap_or_else(|| cwd.clone());
    let base = cli
        .base
        .as_deref()
        .map(|base| absolutize(base, &cwd))
        .unwrap_or_else(|| root.clone());

    let options = config
        .into_builder(&cwd)
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    debug!("Options: {:?}", options);
    let container = Container::new(options);

    let files = expand_inputs(&cli.inputs, &cwd, container.parser())?;
    if files.is_empty() {
        anyhow::bail!("No input files specified. Use --help for usage information.");
    }

    info!("Bundling {} file(s) under {}", files.len(), root.display());

    let bundler = container.bundler();
    let mut stream = BundleStream::new(&bundler);
    let mut metadata: BTreeMap<String, ModuleInfo> = BTreeMap::new();
    let mut failures = 0;

    for path in &files {
        let record = match FileRecord::load(container.file_system().as_ref(), path, &base) {
            Ok(record) => record,
            Err(e) => {
                error!("{}", e);
                failures += 1;
                continue;
            }
        };

        match stream.process(record) {
            Ok(mut output) => {
                write_output(&output, cli.out_dir.as_deref(), &cwd)?;
                if let Some(info) = output.module.take() {
                    metadata.insert(display_relative(&output.path, &base), info);
                }
            }
            Err(e) => {
                error!("{}", e);
                failures += 1;
            }
        }
    }

    let summary = stream.finish();
    debug!("Stream summary: {:?}", summary);

    if let Some(path) = &cli.metadata {
        let json = serde_json::to_string_pretty(&metadata)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write metadata to {}", path.display()))?;
    }

    if container.warning_count() > 0 {
        info!("{} warning(s)", container.warning_count());
    }

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed", failures, files.len());
    }

    Ok(())
}

fn init_project() -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{} already exists", CONFIG_FILE);
    }

    BundlerConfig::init_file(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", CONFIG_FILE, e))?;
    println!("Created {}", CONFIG_FILE);

    Ok(())
}

/// Load the config file (explicit, or `stylepack.json` in the current
/// directory) and apply command line overrides
fn load_config(cli: &Cli, cwd: &Path) -> anyhow::Result<BundlerConfig> {
    let mut config = if let Some(path) = &cli.config {
        BundlerConfig::from_file(&absolutize(path, cwd))
            .map_err(|e| anyhow::anyhow!("Failed to load config file: {}", e))?
    } else {
        let default_path = cwd.join(CONFIG_FILE);
        if default_path.exists() {
            BundlerConfig::from_file(&default_path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", CONFIG_FILE, e))?
        } else {
            BundlerConfig::default()
        }
    };

    config.merge(&CliOverrides {
        root: cli.root.clone(),
        combine: cli.combine.then_some(true),
    });
    config.root = config.root.map(|root| absolutize(&root, cwd));

    Ok(config)
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    normalize_path(&cwd.join(path))
}

/// Files a registered packager handles
fn is_stylesheet(path: &Path, parser: &ModuleParser) -> bool {
    path.extension()
        .map(|ext| parser.supports(&ext.to_string_lossy()))
        .unwrap_or(false)
}

fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Expand files, directories and glob patterns into a sorted, deduplicated
/// list of absolute paths
fn expand_inputs(
    inputs: &[String],
    cwd: &Path,
    parser: &ModuleParser,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for input in inputs {
        let path = absolutize(Path::new(input), cwd);

        if path.is_dir() {
            for entry in WalkDir::new(&path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_stylesheet(entry.path(), parser) {
                    files.insert(normalize_path(entry.path()));
                }
            }
        } else if path.is_file() {
            files.insert(path);
        } else if is_glob(input) {
            let pattern = cwd.join(input);
            let pattern = pattern.to_string_lossy();
            let mut matched = false;

            for entry in glob::glob(&pattern)
                .with_context(|| format!("Invalid glob pattern '{}'", input))?
            {
                match entry {
                    Ok(found) if found.is_file() => {
                        files.insert(normalize_path(&found));
                        matched = true;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping {}: {}", e.path().display(), e),
                }
            }

            if !matched {
                warn!("Pattern '{}' matched no files", input);
            }
        } else {
            anyhow::bail!("Input not found: {}", input);
        }
    }

    Ok(files.into_iter().collect())
}

/// Write a bundle under the output directory, or to stdout
fn write_output(output: &FileRecord, out_dir: Option<&Path>, cwd: &Path) -> anyhow::Result<()> {
    let Some(bytes) = output.bytes() else {
        return Ok(());
    };

    match out_dir {
        Some(out_dir) => {
            let target = absolutize(out_dir, cwd).join(output.relative());
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, bytes)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            info!("Wrote {}", target.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
