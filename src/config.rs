//! Site configuration.
//!
//! [`DocsConfig`] carries the values the INET documentation build is
//! configured with. [`DocsConfig::load`] layers an optional configuration
//! file (TOML, YAML or JSON, chosen by extension) under `INETDOCS__*`
//! environment variables, e.g. `INETDOCS__HTML_THEME=classic`. Keys missing
//! from both keep their defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{DocsError, Result};
use crate::style::Style;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "INETDOCS";

/// URL pattern and caption prefix of one external-link role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtLinkConfig {
    /// URL with a single `%s` replaced by the role target.
    pub url: String,
    /// Prefix of the displayed text. `None` displays the full URL.
    #[serde(default)]
    pub caption: Option<String>,
}

/// Tag file and documentation root of one Doxygen link role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoxylinkConfig {
    /// Tag file, relative to the configuration directory.
    pub tagfile: PathBuf,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatexDocument {
    pub start_doc: String,
    pub target: String,
    pub title: String,
    pub author: String,
    pub documentclass: String,
    #[serde(default)]
    pub toctree_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManPage {
    pub start_doc: String,
    pub name: String,
    pub description: String,
    pub authors: Vec<String>,
    pub section: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TexinfoDocument {
    pub start_doc: String,
    pub target: String,
    pub title: String,
    pub author: String,
    pub dir_entry: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImagesConfig {
    pub override_image_directive: bool,
    pub default_show_title: bool,
}

/// Documentation build configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocsConfig {
    pub project: String,
    pub copyright: String,
    pub author: String,
    /// Short X.Y version.
    pub version: String,
    /// Full version, including alpha/beta/rc tags.
    pub release: String,
    pub needs_sphinx: String,
    pub extensions: Vec<String>,
    pub templates_path: Vec<PathBuf>,
    pub source_suffix: Vec<String>,
    pub master_doc: String,
    pub language: Option<String>,
    pub exclude_patterns: Vec<String>,
    pub graphviz_output_format: String,

    pub html_theme: String,
    pub html_theme_path: Vec<PathBuf>,
    pub html_theme_options: IndexMap<String, Value>,
    pub html_static_path: Vec<PathBuf>,
    /// Variables available to page templates.
    pub html_context: IndexMap<String, Value>,
    pub htmlhelp_basename: String,

    pub latex_elements: IndexMap<String, String>,
    pub latex_documents: Vec<LatexDocument>,
    pub man_pages: Vec<ManPage>,
    pub texinfo_documents: Vec<TexinfoDocument>,

    pub extlinks: IndexMap<String, ExtLinkConfig>,
    pub images_config: ImagesConfig,
    pub doxylink: IndexMap<String, DoxylinkConfig>,

    /// File whose contents are inserted at the top of every page.
    pub rst_prolog_file: Option<PathBuf>,
    pub todo_include_todos: bool,
    pub todo_emit_warnings: bool,
    pub pygments_style: String,
    /// Language of code blocks that do not name one.
    pub highlight_language: String,
    /// Output format of the build; templating only runs for `html`.
    pub builder_format: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

fn default_theme_options() -> IndexMap<String, Value> {
    let mut options = IndexMap::new();
    options.insert("header_links".to_string(), Value::Array(Vec::new()));
    options.insert("primary_color".to_string(), Value::from("blue"));
    options.insert("accent_color".to_string(), Value::from("light_blue"));
    options.insert("fixed_drawer".to_string(), Value::Bool(true));
    options.insert("fixed_header".to_string(), Value::Bool(true));
    options.insert("header_waterfall".to_string(), Value::Bool(false));
    options.insert("header_scroll".to_string(), Value::Bool(false));
    options.insert("show_header_title".to_string(), Value::Bool(false));
    options.insert("show_drawer_title".to_string(), Value::Bool(false));
    options.insert("show_footer".to_string(), Value::Bool(false));
    options
}

impl Default for DocsConfig {
    fn default() -> Self {
        let author = "INET community".to_string();

        let mut latex_elements = IndexMap::new();
        latex_elements.insert("papersize".to_string(), "a4paper".to_string());
        latex_elements.insert("pointsize".to_string(), "10pt".to_string());

        let mut extlinks = IndexMap::new();
        extlinks.insert(
            "wiki".to_string(),
            ExtLinkConfig {
                url: "https://en.wikipedia.org/wiki/%s".to_string(),
                caption: Some(String::new()),
            },
        );

        let mut doxylink = IndexMap::new();
        doxylink.insert(
            "ned".to_string(),
            DoxylinkConfig {
                tagfile: PathBuf::from("nedtags.xml"),
                base_url: "https://omnetpp.org/doc/inet/api-current/neddoc/".to_string(),
            },
        );
        doxylink.insert(
            "msg".to_string(),
            DoxylinkConfig {
                tagfile: PathBuf::from("msgtags.xml"),
                base_url: "https://omnetpp.org/doc/inet/api-current/neddoc/".to_string(),
            },
        );

        Self {
            project: "INET".to_string(),
            copyright: author.clone(),
            author: author.clone(),
            version: "4.2".to_string(),
            release: "4.2".to_string(),
            needs_sphinx: "2.2".to_string(),
            extensions: strings(&[
                "sphinx.ext.mathjax",
                "sphinx.ext.extlinks",
                "sphinx.ext.ifconfig",
                "sphinx.ext.todo",
                "sphinx.ext.githubpages",
                "sphinx.ext.graphviz",
                "tools.doxylink",
            ]),
            templates_path: paths(&["_templates"]),
            source_suffix: strings(&[".rst"]),
            master_doc: "index".to_string(),
            language: None,
            exclude_patterns: strings(&[
                "_build",
                "_deploy",
                "Thumbs.db",
                ".DS_Store",
                "**/_docs",
                "global.rst",
            ]),
            graphviz_output_format: "svg".to_string(),
            html_theme: "opptheme".to_string(),
            html_theme_path: paths(&["_themes"]),
            html_theme_options: default_theme_options(),
            html_static_path: paths(&["_static"]),
            html_context: IndexMap::new(),
            htmlhelp_basename: "INETFrameworkdoc".to_string(),
            latex_elements,
            latex_documents: vec![
                LatexDocument {
                    start_doc: "users-guide/index".to_string(),
                    target: "users-guide.tex".to_string(),
                    title: "INET Framework User's Guide".to_string(),
                    author: String::new(),
                    documentclass: "manual".to_string(),
                    toctree_only: false,
                },
                LatexDocument {
                    start_doc: "developers-guide/index".to_string(),
                    target: "developers-guide.tex".to_string(),
                    title: "INET Framework Developer's Guide".to_string(),
                    author: String::new(),
                    documentclass: "manual".to_string(),
                    toctree_only: false,
                },
            ],
            man_pages: vec![ManPage {
                start_doc: "index".to_string(),
                name: "inetframework".to_string(),
                description: "INET Framework Documentation".to_string(),
                authors: vec![author.clone()],
                section: 1,
            }],
            texinfo_documents: vec![TexinfoDocument {
                start_doc: "index".to_string(),
                target: "INETFramework".to_string(),
                title: "INET Framework Documentation".to_string(),
                author,
                dir_entry: "INETFramework".to_string(),
                description: "One line description of project.".to_string(),
                category: "Miscellaneous".to_string(),
            }],
            extlinks,
            images_config: ImagesConfig::default(),
            doxylink,
            rst_prolog_file: Some(PathBuf::from("global.rst")),
            todo_include_todos: false,
            todo_emit_warnings: false,
            pygments_style: "default".to_string(),
            highlight_language: "default".to_string(),
            builder_format: "html".to_string(),
        }
    }
}

impl DocsConfig {
    /// Load the configuration from an optional file plus environment
    /// overrides, then validate it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(DocsError::Config(format!(
                    "configuration file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: DocsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        log::debug!(
            "loaded configuration for {} {} (theme {})",
            config.project,
            config.release,
            config.html_theme
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.master_doc.trim().is_empty() {
            return Err(DocsError::Config("master_doc must not be empty".to_string()));
        }
        for (name, link) in &self.extlinks {
            if link.url.matches("%s").count() != 1 {
                return Err(DocsError::Config(format!(
                    "extlink '{}' must contain exactly one %s: {}",
                    name, link.url
                )));
            }
        }
        for suffix in &self.source_suffix {
            if !suffix.starts_with('.') {
                return Err(DocsError::Config(format!(
                    "source suffix '{}' must start with '.'",
                    suffix
                )));
            }
        }
        if Style::by_name(&self.pygments_style).is_none() {
            return Err(DocsError::Config(format!(
                "unknown pygments_style '{}', available: {}",
                self.pygments_style,
                Style::available().join(", ")
            )));
        }
        Ok(())
    }

    /// Whether page templating applies to this build.
    pub fn is_html_build(&self) -> bool {
        self.builder_format == "html"
    }

    /// The configured `templates_path` entries resolved against `confdir`.
    pub fn template_dirs(&self, confdir: &Path) -> Vec<PathBuf> {
        self.templates_path.iter().map(|dir| confdir.join(dir)).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DocsError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| DocsError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DocsConfig::default();
        assert_eq!(config.project, "INET");
        assert_eq!(config.master_doc, "index");
        assert_eq!(config.html_theme, "opptheme");
        assert_eq!(config.html_theme_options["primary_color"], "blue");
        assert_eq!(config.html_theme_options["fixed_drawer"], true);
        assert_eq!(config.extlinks["wiki"].url, "https://en.wikipedia.org/wiki/%s");
        assert_eq!(config.doxylink["msg"].tagfile, PathBuf::from("msgtags.xml"));
        assert!(config.exclude_patterns.contains(&"global.rst".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.toml");
        std::fs::write(
            &path,
            r#"
release = "4.2.1"
builder_format = "latex"

[extlinks.rfc]
url = "https://tools.ietf.org/html/rfc%s"
caption = "RFC "
"#,
        )
        .unwrap();

        let config = DocsConfig::load(Some(&path)).unwrap();
        assert_eq!(config.release, "4.2.1");
        assert_eq!(config.version, "4.2");
        assert!(!config.is_html_build());
        assert_eq!(config.extlinks["rfc"].caption.as_deref(), Some("RFC "));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(DocsConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = DocsConfig::default();
        config.extlinks.insert(
            "bad".to_string(),
            ExtLinkConfig {
                url: "https://example.org/".to_string(),
                caption: None,
            },
        );
        assert!(config.validate().is_err());

        let mut config = DocsConfig::default();
        config.source_suffix = vec!["rst".to_string()];
        assert!(config.validate().is_err());

        let mut config = DocsConfig::default();
        config.master_doc.clear();
        assert!(config.validate().is_err());

        let mut config = DocsConfig::default();
        config.pygments_style = "monokai".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let config = DocsConfig::default();
        let json = config.to_json().unwrap();
        let back: DocsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert!(config.to_yaml().unwrap().contains("html_theme: opptheme"));
    }
}
