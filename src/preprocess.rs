//! Page preprocessing applied to every source as it is read.
//!
//! HTML builds render each page as a Jinja template with the shared macro
//! library imported as `opp`; every build then gets the site prolog inserted
//! after the page's docinfo fields.

use log::{debug, warn};
use minijinja::{Environment, ErrorKind, Value};
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::config::DocsConfig;
use crate::error::{DocsError, Result};

/// Line prepended to every page before template rendering.
pub const MACRO_IMPORT: &str = "{% import 'global-macros.inc' as opp %}\n";

lazy_static::lazy_static! {
    static ref DOCINFO_RE: Regex = Regex::new(r"^:\w+:").unwrap();
}

/// Insert `prolog` after the leading docinfo field lines of `source`,
/// followed by a blank line. A blank line also separates it from the
/// docinfo block when there is one.
pub fn insert_prolog(source: &str, prolog: &str) -> String {
    if prolog.is_empty() {
        return source.to_string();
    }

    let lines: Vec<&str> = source.split('\n').collect();
    let docinfo = lines.iter().take_while(|line| DOCINFO_RE.is_match(line)).count();

    let mut output: Vec<&str> = Vec::with_capacity(lines.len() + prolog.lines().count() + 2);
    output.extend(&lines[..docinfo]);
    if docinfo > 0 {
        output.push("");
    }
    output.extend(prolog.lines());
    output.push("");
    output.extend(&lines[docinfo..]);
    output.join("\n")
}

fn template_environment(dirs: Vec<PathBuf>) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_loader(move |name: &str| {
        if name.split('/').any(|segment| segment == "..") {
            return Ok(None);
        }
        for dir in &dirs {
            let path = dir.join(name);
            if path.is_file() {
                return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                    minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("cannot read template {}", path.display()),
                    )
                    .with_source(e)
                });
            }
        }
        Ok(None)
    });
    env
}

/// The source-read step of the pipeline.
pub struct Preprocessor {
    prolog: Option<String>,
    templating: bool,
    env: Environment<'static>,
    context: Value,
}

impl Preprocessor {
    /// Build from the configuration; the prolog file and template
    /// directories are resolved against `confdir`.
    pub fn new(config: &DocsConfig, confdir: &Path) -> Self {
        let prolog = config.rst_prolog_file.as_ref().and_then(|file| {
            let path = confdir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(prolog) => Some(prolog),
                Err(e) => {
                    warn!("cannot read prolog {}: {}", path.display(), e);
                    None
                }
            }
        });

        Self {
            prolog,
            templating: config.is_html_build(),
            env: template_environment(config.template_dirs(confdir)),
            context: Value::from_serialize(&config.html_context),
        }
    }

    pub fn with_prolog(mut self, prolog: Option<String>) -> Self {
        self.prolog = prolog;
        self
    }

    pub fn prolog(&self) -> Option<&str> {
        self.prolog.as_deref()
    }

    /// Render `source` as a template with the macro library imported. The
    /// newline left behind by the import line is dropped so rendered lines
    /// keep their source line numbers.
    pub fn render_template(&self, docname: &str, source: &str) -> Result<String> {
        let template = format!("{}{}", MACRO_IMPORT, source);
        let rendered = self
            .env
            .render_str(&template, &self.context)
            .map_err(|source| DocsError::Template {
                docname: docname.to_string(),
                source,
            })?;
        Ok(match rendered.strip_prefix('\n') {
            Some(rest) => rest.to_string(),
            None => rendered,
        })
    }

    pub fn process(&self, docname: &str, source: &str) -> Result<String> {
        let rendered = if self.templating {
            self.render_template(docname, source)?
        } else {
            debug!("{}: templating skipped for non-HTML build", docname);
            source.to_string()
        };
        Ok(match &self.prolog {
            Some(prolog) => insert_prolog(&rendered, prolog),
            None => rendered,
        })
    }
}
