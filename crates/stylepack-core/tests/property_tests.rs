//! Property-based tests for the resolver and the bundling engine

use proptest::prelude::*;
use std::path::Path;
use std::sync::Arc;
use stylepack_core::css_deps;
use stylepack_core::resolver::{normalize_id, resolve};
use stylepack_core::{
    Bundler, BundlerOptions, CollectingDiagnosticHandler, FileRecord, MockFileSystem,
};

// =============================================================================
// Resolver Properties
// =============================================================================

fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("..".to_string()),
        Just(".".to_string()),
        "[a-z]{1,8}",
        "[a-z]{1,8}\\.css",
    ]
}

fn request_strategy() -> impl Strategy<Value = String> {
    (any::<bool>(), prop::collection::vec(segment_strategy(), 1..8)).prop_map(
        |(rooted, segments)| {
            let joined = segments.join("/");
            if rooted {
                format!("/{}", joined)
            } else {
                joined
            }
        },
    )
}

proptest! {
    #[test]
    fn prop_resolved_paths_stay_in_root(request in request_strategy()) {
        let root = Path::new("/project");
        let referer = Path::new("/project/css/pages/main.css");

        match resolve(&request, referer, root) {
            Ok(resolved) => {
                prop_assert!(resolved.starts_with(root));
                prop_assert!(!resolved.components().any(|c| c.as_os_str() == ".."));
            }
            Err(e) => {
                prop_assert!(e.is_out_of_bounds());
            }
        }
    }

    #[test]
    fn prop_normalized_ids_have_single_forward_slashes(id in "[a-z./\\\\]{0,24}") {
        let normalized = normalize_id(&id);
        prop_assert!(!normalized.contains('\\'));
        prop_assert!(!normalized.contains("//"));
    }

    #[test]
    fn prop_scanner_never_panics(source in "\\PC{0,200}") {
        let references = css_deps::scan(&source);
        for reference in &references {
            let span = reference.span();
            prop_assert!(span.start <= span.end && span.end <= source.len());
        }
        prop_assert_eq!(css_deps::splice(&source, &[]), source);
    }
}

// =============================================================================
// Bundling Properties
// =============================================================================

fn chain_bundler(length: usize) -> (Bundler, FileRecord) {
    let mut fs = MockFileSystem::new();
    for i in 1..length {
        let contents = if i + 1 < length {
            format!("@import \"m{}.css\";\n.m{} {{}}\n", i + 1, i)
        } else {
            format!(".m{} {{}}\n", i)
        };
        fs.add_file(format!("/project/m{}.css", i), contents);
    }

    let options = BundlerOptions::builder("/project")
        .combine(true)
        .build()
        .unwrap();
    let bundler = Bundler::new(
        Arc::new(options),
        Arc::new(fs),
        Arc::new(CollectingDiagnosticHandler::new()),
    );

    let entry_contents = if length > 1 {
        "@import \"m1.css\";\n.m0 {}\n"
    } else {
        ".m0 {}\n"
    };
    let entry = FileRecord::new("/project/m0.css", "/project", entry_contents);

    (bundler, entry)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_chain_is_emitted_in_reverse(length in 1usize..12) {
        let (bundler, mut entry) = chain_bundler(length);
        let bundle = bundler.bundle(&mut entry).unwrap();

        let expected: Vec<String> = (0..length)
            .rev()
            .map(|i| format!("/project/m{}.css", i))
            .collect();
        let actual: Vec<String> = bundle
            .module_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_bundling_is_idempotent(length in 1usize..8) {
        let (first, mut one) = chain_bundler(length);
        let (second, mut two) = chain_bundler(length);

        first.bundle(&mut one).unwrap();
        second.bundle(&mut two).unwrap();

        prop_assert_eq!(one.bytes(), two.bytes());
    }
}
