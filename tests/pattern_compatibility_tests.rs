//! Integration tests for exclude_patterns and source discovery.

use std::fs;
use tempfile::TempDir;

use inet_docs::config::DocsConfig;
use inet_docs::matching::{collect_sources, pattern_match, translate_pattern, PatternSet};

fn docnames(config: &DocsConfig, base: &std::path::Path) -> Vec<String> {
    collect_sources(base, config)
        .unwrap()
        .into_iter()
        .map(|doc| doc.docname)
        .collect()
}

#[test]
fn test_default_exclude_patterns() {
    let config = DocsConfig::default();

    for pattern in ["_build", "_deploy", "Thumbs.db", ".DS_Store", "**/_docs", "global.rst"] {
        assert!(
            config.exclude_patterns.iter().any(|p| p == pattern),
            "missing default exclude '{}'",
            pattern
        );
    }
    assert_eq!(config.source_suffix, vec![".rst"]);
}

#[test]
fn test_pattern_translation_compatibility() {
    assert_eq!(translate_pattern("*.rst"), "^[^/]*\\.rst$");
    assert_eq!(translate_pattern("**"), "^.*$");
    assert_eq!(translate_pattern("**/index.rst"), "^(?:[^/]+/)*index\\.rst$");
    assert_eq!(translate_pattern("docs/**/*.rst"), "^docs/(?:[^/]+/)*[^/]*\\.rst$");

    // fnmatch-style character classes
    assert_eq!(translate_pattern("[abc].rst"), "^[abc]\\.rst$");
    assert_eq!(translate_pattern("[!_]*.rst"), "^[^_][^/]*\\.rst$");
}

#[test]
fn test_pattern_matching_examples() {
    assert!(pattern_match("index.rst", "*.rst").unwrap());
    assert!(pattern_match("chapter1.rst", "chapter?.rst").unwrap());
    assert!(!pattern_match("chapter10.rst", "chapter?.rst").unwrap());

    assert!(pattern_match("showcases/wireless/module.rst", "**/wireless/*.rst").unwrap());
    assert!(pattern_match("wireless/module.rst", "**/wireless/*.rst").unwrap());
    assert!(!pattern_match("wireless/sub/module.rst", "**/wireless/*.rst").unwrap());

    assert!(pattern_match("_build/html/index.html", "_build/**").unwrap());
    assert!(!pattern_match("src/code.py", "docs/**").unwrap());
}

#[test]
fn test_pattern_set_reports_invalid_class() {
    // A lone `[` is literal; a reversed range is rejected.
    assert!(PatternSet::new(&["a[b".to_string()]).is_ok());
    assert!(PatternSet::new(&["[z-a].rst".to_string()]).is_err());
}

#[test]
fn test_discovery_of_an_inet_doc_tree() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();

    for dir in [
        "users-guide/ch-networks",
        "showcases/wireless/aggregation/_docs",
        "tutorials/wireless",
        "_build/html",
        "_deploy",
    ] {
        fs::create_dir_all(base.join(dir)).unwrap();
    }
    for file in [
        "index.rst",
        "global.rst",
        "users-guide/index.rst",
        "users-guide/ch-networks/networks.rst",
        "showcases/wireless/aggregation/doc.rst",
        "showcases/wireless/aggregation/_docs/notes.rst",
        "showcases/wireless/aggregation/omnetpp.ini",
        "tutorials/wireless/step1.rst",
        "_build/html/index.rst",
        "_deploy/index.rst",
        "Thumbs.db",
    ] {
        fs::write(base.join(file), "content").unwrap();
    }

    assert_eq!(
        docnames(&DocsConfig::default(), base),
        vec![
            "index",
            "showcases/wireless/aggregation/doc",
            "tutorials/wireless/step1",
            "users-guide/ch-networks/networks",
            "users-guide/index",
        ]
    );

    let config = DocsConfig {
        exclude_patterns: vec!["tutorials".to_string(), "**/ch-*".to_string()],
        ..DocsConfig::default()
    };
    let names = docnames(&config, base);
    assert!(names.contains(&"global".to_string()));
    assert!(names.contains(&"_build/html/index".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("tutorials")));
    assert!(!names.iter().any(|n| n.contains("ch-networks")));
}

#[test]
fn test_multiple_source_suffixes() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    fs::write(base.join("index.rst"), "rst").unwrap();
    fs::write(base.join("notes.txt"), "txt").unwrap();
    fs::write(base.join("readme.md"), "md").unwrap();

    let config = DocsConfig {
        source_suffix: vec![".rst".to_string(), ".txt".to_string()],
        ..DocsConfig::default()
    };
    assert_eq!(docnames(&config, base), vec!["index", "notes"]);
}

#[test]
fn test_toml_exclude_patterns() {
    let temp_dir = TempDir::new().unwrap();
    let conf_path = temp_dir.path().join("inet-docs.toml");
    fs::write(
        &conf_path,
        r#"
project = "INET Framework"
exclude_patterns = ["_build", "drafts/**", "*.tmp"]
"#,
    )
    .unwrap();

    let config = DocsConfig::load(Some(&conf_path)).unwrap();
    assert_eq!(config.project, "INET Framework");
    assert_eq!(config.exclude_patterns, vec!["_build", "drafts/**", "*.tmp"]);
}
