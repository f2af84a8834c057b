//! Glob patterns for `exclude_patterns` and source discovery.
//!
//! Patterns follow Sphinx's rules: `**` spans directories, `*` and `?` stay
//! within one path segment, `[seq]` and `[!seq]` are character classes.
//! Paths are matched relative to the source directory with `/` separators.

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

use crate::config::DocsConfig;
use crate::error::{DocsError, Result};

lazy_static::lazy_static! {
    static ref PATTERN_CACHE: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

fn push_literal(out: &mut String, c: char) {
    if matches!(c, '\\' | '.' | '^' | '$' | '+' | '{' | '}' | '|' | '(' | ')') {
        out.push('\\');
    }
    out.push(c);
}

/// Translate a glob pattern into an anchored regex.
pub fn translate_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:[^/]+/)*");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => {
                let mut end = i + 1;
                if matches!(chars.get(end), Some('!') | Some('^')) {
                    end += 1;
                }
                if chars.get(end) == Some(&']') {
                    end += 1;
                }
                while end < chars.len() && chars[end] != ']' {
                    end += 1;
                }
                if end >= chars.len() {
                    out.push_str("\\[");
                    i += 1;
                    continue;
                }

                out.push('[');
                let mut k = i + 1;
                if matches!(chars[k], '!' | '^') {
                    out.push('^');
                    k += 1;
                }
                while k < end {
                    if chars[k] == '\\' && k + 1 < end {
                        out.push('\\');
                        out.push(chars[k + 1]);
                        k += 2;
                    } else {
                        out.push(chars[k]);
                        k += 1;
                    }
                }
                out.push(']');
                i = end + 1;
            }
            c => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

/// Compile a glob, reusing earlier compilations of the same pattern.
pub fn compile_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut cache = PATTERN_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&translate_pattern(pattern))?;
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

pub fn pattern_match(name: &str, pattern: &str) -> std::result::Result<bool, regex::Error> {
    Ok(compile_pattern(pattern)?.is_match(name))
}

/// A compiled set of patterns; matches when any pattern does.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    regexes: Vec<Regex>,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> std::result::Result<Self, regex::Error> {
        let regexes = patterns
            .iter()
            .map(|pattern| compile_pattern(pattern))
            .collect::<std::result::Result<_, _>>()?;
        Ok(Self { regexes })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regexes.iter().any(|regex| regex.is_match(path))
    }
}

/// Path with `/` separators, as patterns expect.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// A source document found under the source directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceDoc {
    /// Path relative to the source directory without its suffix.
    pub docname: String,
    /// Path relative to the source directory.
    pub path: PathBuf,
}

/// Find the documents under `srcdir`: files with a configured source suffix
/// whose path, or any parent directory, matches no exclude pattern. Sorted
/// by docname.
pub fn collect_sources(srcdir: &Path, config: &DocsConfig) -> Result<Vec<SourceDoc>> {
    let excluded = PatternSet::new(&config.exclude_patterns)?;
    let relative = |path: &Path| {
        path.strip_prefix(srcdir)
            .map(normalize_path)
            .unwrap_or_default()
    };

    let mut docs = Vec::new();
    let walker = WalkDir::new(srcdir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !excluded.is_match(&relative(entry.path())));
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(srcdir).to_path_buf();
            match e.into_io_error() {
                Some(io) => DocsError::io(path, io),
                None => DocsError::Config(format!("cannot walk {}", path.display())),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = relative(entry.path());
        let Some(suffix) = config.source_suffix.iter().find(|s| path.ends_with(s.as_str())) else {
            continue;
        };
        docs.push(SourceDoc {
            docname: path[..path.len() - suffix.len()].to_string(),
            path: PathBuf::from(&path),
        });
    }

    docs.sort();
    log::debug!("found {} source documents in {}", docs.len(), srcdir.display());
    Ok(docs)
}
