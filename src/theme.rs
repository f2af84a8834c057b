//! HTML theme discovery and option handling.
//!
//! Themes live in directories on `html_theme_path`, each described by a
//! `theme.toml`. A theme may inherit from another and declares a schema for
//! the options users set through `html_theme_options`. The material-design
//! `opptheme` used by the INET documentation is always available, even when
//! no theme directory provides it.

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::DocsConfig;
use crate::error::{DocsError, Result};

/// Palette names accepted by the material theme's color options.
pub const MATERIAL_COLORS: &[&str] = &[
    "amber",
    "blue",
    "brown",
    "cyan",
    "deep_orange",
    "deep_purple",
    "green",
    "grey",
    "indigo",
    "light_blue",
    "light_green",
    "lime",
    "orange",
    "pink",
    "purple",
    "red",
    "teal",
    "yellow",
];

/// Theme option type for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeOptionType {
    Bool,
    String,
    Integer,
    Float,
    List,
}

impl ThemeOptionType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            ThemeOptionType::Bool => value.is_boolean(),
            ThemeOptionType::String => value.is_string(),
            ThemeOptionType::Integer => value.is_i64() || value.is_u64(),
            ThemeOptionType::Float => value.is_number(),
            ThemeOptionType::List => value.is_array(),
        }
    }
}

/// Theme option specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeOptionSpec {
    #[serde(rename = "type")]
    pub option_type: ThemeOptionType,
    pub default: Value,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl ThemeOptionSpec {
    fn new(option_type: ThemeOptionType, default: Value) -> Self {
        Self {
            option_type,
            default,
            values: None,
        }
    }

    fn choice(default: &str, values: &[&str]) -> Self {
        Self {
            option_type: ThemeOptionType::String,
            default: Value::from(default),
            values: Some(values.iter().map(|v| v.to_string()).collect()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeToml {
    theme: ThemeTomlMeta,
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeTomlMeta {
    name: String,
    #[serde(default)]
    inherit: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    options: Option<IndexMap<String, ThemeOptionSpec>>,
}

/// An HTML theme
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    /// Parent theme to inherit from
    pub inherit: Option<String>,
    pub version: String,
    /// Theme directory; `None` for built-in themes.
    pub path: Option<PathBuf>,
    pub options_schema: IndexMap<String, ThemeOptionSpec>,
    pub templates_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

/// One entry of the `header_links` theme option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderLink {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Theme {
    /// Load a theme from a directory containing theme.toml
    pub fn from_path(path: &Path) -> Result<Self> {
        let theme_toml_path = path.join("theme.toml");
        let content = std::fs::read_to_string(&theme_toml_path)
            .map_err(|e| DocsError::io(&theme_toml_path, e))?;
        let toml: ThemeToml = toml::from_str(&content).map_err(|e| {
            DocsError::Theme(format!("failed to parse {}: {}", theme_toml_path.display(), e))
        })?;
        let meta = toml.theme;

        let subdir = |name: &str| Some(path.join(name)).filter(|dir| dir.is_dir());

        Ok(Theme {
            name: meta.name,
            inherit: meta.inherit,
            version: meta.version.unwrap_or_else(|| "0.0.0".to_string()),
            path: Some(path.to_path_buf()),
            options_schema: meta.options.unwrap_or_default(),
            templates_dir: subdir("templates"),
            static_dir: subdir("static"),
        })
    }

    /// The material theme of the INET documentation.
    pub fn opptheme() -> Self {
        let mut schema = IndexMap::new();
        schema.insert(
            "header_links".to_string(),
            ThemeOptionSpec::new(ThemeOptionType::List, Value::Array(Vec::new())),
        );
        schema.insert(
            "primary_color".to_string(),
            ThemeOptionSpec::choice("indigo", MATERIAL_COLORS),
        );
        schema.insert(
            "accent_color".to_string(),
            ThemeOptionSpec::choice("pink", MATERIAL_COLORS),
        );
        for (name, default) in [
            ("fixed_drawer", false),
            ("fixed_header", true),
            ("header_waterfall", true),
            ("header_scroll", false),
            ("show_header_title", false),
            ("show_drawer_title", true),
            ("show_footer", true),
        ] {
            schema.insert(
                name.to_string(),
                ThemeOptionSpec::new(ThemeOptionType::Bool, Value::Bool(default)),
            );
        }

        Theme {
            name: "opptheme".to_string(),
            inherit: None,
            version: "1.0.0".to_string(),
            path: None,
            options_schema: schema,
            templates_dir: None,
            static_dir: None,
        }
    }

    /// Get effective options by merging user options with defaults
    pub fn effective_options(&self, user_options: &IndexMap<String, Value>) -> IndexMap<String, Value> {
        let mut result: IndexMap<String, Value> = self
            .options_schema
            .iter()
            .map(|(key, spec)| (key.clone(), spec.default.clone()))
            .collect();
        for (key, value) in user_options {
            result.insert(key.clone(), value.clone());
        }
        result
    }

    /// Validate user options against the schema. Unknown options are
    /// returned as warnings; type and value mismatches are errors.
    pub fn validate_options(&self, user_options: &IndexMap<String, Value>) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        for (key, value) in user_options {
            let Some(spec) = self.options_schema.get(key) else {
                warnings.push(format!("unsupported theme option '{}' for {}", key, self.name));
                continue;
            };

            if !spec.option_type.accepts(value) {
                return Err(DocsError::Theme(format!(
                    "theme option '{}' has invalid type, expected {:?}",
                    key, spec.option_type
                )));
            }

            if let (Some(allowed), Some(s)) = (&spec.values, value.as_str()) {
                if !allowed.iter().any(|v| v == s) {
                    return Err(DocsError::Theme(format!(
                        "theme option '{}' has invalid value '{}', allowed: {}",
                        key,
                        s,
                        allowed.join(", ")
                    )));
                }
            }
        }
        Ok(warnings)
    }
}

/// Parse the `header_links` option. Entries are either tables with `name`,
/// `url`, `external` and `icon` keys or `[url, name, external, icon]` lists.
pub fn header_links(options: &IndexMap<String, Value>) -> Result<Vec<HeaderLink>> {
    let Some(links) = options.get("header_links") else {
        return Ok(Vec::new());
    };
    let Some(entries) = links.as_array() else {
        return Err(DocsError::Theme("header_links must be a list".to_string()));
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::Object(_) => serde_json::from_value::<HeaderLink>(entry.clone())
                .map_err(|e| DocsError::Theme(format!("invalid header link: {}", e))),
            Value::Array(fields) => {
                let text = |index: usize| fields.get(index).and_then(Value::as_str);
                match (text(0), text(1)) {
                    (Some(url), Some(name)) => Ok(HeaderLink {
                        name: name.to_string(),
                        url: url.to_string(),
                        external: fields.get(2).and_then(Value::as_bool).unwrap_or(false),
                        icon: text(3).map(str::to_string),
                    }),
                    _ => Err(DocsError::Theme(format!(
                        "header link {} needs a url and a name",
                        entry
                    ))),
                }
            }
            other => Err(DocsError::Theme(format!("invalid header link: {}", other))),
        })
        .collect()
}

/// Registry for discovering and managing themes
#[derive(Debug)]
pub struct ThemeRegistry {
    themes: IndexMap<String, Theme>,
    search_paths: Vec<PathBuf>,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeRegistry {
    /// A registry holding only the built-in themes.
    pub fn new() -> Self {
        let mut registry = Self {
            themes: IndexMap::new(),
            search_paths: Vec::new(),
        };
        registry.register(Theme::opptheme());
        registry
    }

    /// Registry searching the configured `html_theme_path`, relative to
    /// `confdir`.
    pub fn for_config(config: &DocsConfig, confdir: &Path) -> Self {
        let mut registry = Self::new();
        for path in &config.html_theme_path {
            registry.add_search_path(confdir.join(path));
        }
        registry.discover_themes();
        registry
    }

    pub fn add_search_path(&mut self, path: PathBuf) {
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    /// Load every subdirectory of the search paths that has a theme.toml.
    /// Themes found on disk replace built-in ones of the same name.
    pub fn discover_themes(&mut self) {
        for search_path in self.search_paths.clone() {
            let Ok(entries) = std::fs::read_dir(&search_path) else {
                continue;
            };
            let mut dirs: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.join("theme.toml").is_file())
                .collect();
            dirs.sort();
            for path in dirs {
                match Theme::from_path(&path) {
                    Ok(theme) => {
                        debug!("discovered theme {} at {}", theme.name, path.display());
                        self.register(theme);
                    }
                    Err(e) => warn!("failed to load theme from {}: {}", path.display(), e),
                }
            }
        }
    }

    pub fn register(&mut self, theme: Theme) {
        self.themes.insert(theme.name.clone(), theme);
    }

    pub fn get_theme(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    pub fn has_theme(&self, name: &str) -> bool {
        self.themes.contains_key(name)
    }

    pub fn theme_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.themes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Themes from root ancestor to `name`.
    pub fn resolve_theme_chain(&self, name: &str) -> Result<Vec<&Theme>> {
        let mut chain = Vec::new();
        let mut current = name;
        let mut seen = HashSet::new();

        loop {
            if !seen.insert(current.to_string()) {
                return Err(DocsError::Theme(format!(
                    "circular theme inheritance detected: {}",
                    current
                )));
            }
            let theme = self
                .get_theme(current)
                .ok_or_else(|| DocsError::Theme(format!("theme '{}' not found", current)))?;
            chain.push(theme);
            match &theme.inherit {
                Some(parent) => current = parent,
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Merged schema of a theme chain; children override their parents.
    pub fn merged_schema(&self, name: &str) -> Result<Theme> {
        let chain = self.resolve_theme_chain(name)?;
        let mut merged = chain[chain.len() - 1].clone();
        merged.options_schema = IndexMap::new();
        for theme in &chain {
            for (key, spec) in &theme.options_schema {
                merged.options_schema.insert(key.clone(), spec.clone());
            }
        }
        Ok(merged)
    }

    /// Validate `user_options` for the named theme and return the effective
    /// options. Unknown options are logged.
    pub fn resolve_options(
        &self,
        name: &str,
        user_options: &IndexMap<String, Value>,
    ) -> Result<IndexMap<String, Value>> {
        let theme = self.merged_schema(name)?;
        for warning in theme.validate_options(user_options)? {
            warn!("{}", warning);
        }
        Ok(theme.effective_options(user_options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_theme(dir: &Path, name: &str, inherit: Option<&str>) {
        let theme_dir = dir.join(name);
        std::fs::create_dir_all(theme_dir.join("templates")).unwrap();

        let inherit_line = inherit
            .map(|p| format!("inherit = \"{}\"", p))
            .unwrap_or_default();
        let theme_toml = format!(
            r#"
[theme]
name = "{}"
{}
version = "1.0.0"

[theme.options]
{}_option = {{ type = "bool", default = false }}
"#,
            name, inherit_line, name
        );
        std::fs::write(theme_dir.join("theme.toml"), theme_toml).unwrap();
    }

    fn options(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_theme_from_path() {
        let temp_dir = TempDir::new().unwrap();
        create_test_theme(temp_dir.path(), "plain", None);

        let theme = Theme::from_path(&temp_dir.path().join("plain")).unwrap();
        assert_eq!(theme.name, "plain");
        assert!(theme.inherit.is_none());
        assert!(theme.templates_dir.is_some());
        assert!(theme.static_dir.is_none());
        assert!(theme.options_schema.contains_key("plain_option"));
    }

    #[test]
    fn test_builtin_opptheme_available() {
        let registry = ThemeRegistry::new();
        assert_eq!(registry.theme_names(), vec!["opptheme"]);
        let effective = registry
            .resolve_options("opptheme", &DocsConfig::default().html_theme_options)
            .unwrap();
        assert_eq!(effective["primary_color"], "blue");
        assert_eq!(effective["show_drawer_title"], false);
        assert_eq!(effective.len(), 10);
    }

    #[test]
    fn test_theme_inheritance_and_discovery() {
        let temp_dir = TempDir::new().unwrap();
        create_test_theme(temp_dir.path(), "inet-dark", Some("opptheme"));

        let mut config = DocsConfig::default();
        config.html_theme_path = vec![PathBuf::from(".")];
        let registry = ThemeRegistry::for_config(&config, temp_dir.path());

        let chain = registry.resolve_theme_chain("inet-dark").unwrap();
        let names: Vec<&str> = chain.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["opptheme", "inet-dark"]);

        let effective = registry.resolve_options("inet-dark", &IndexMap::new()).unwrap();
        assert_eq!(effective["inet-dark_option"], false);
        assert_eq!(effective["accent_color"], "pink");
    }

    #[test]
    fn test_circular_inheritance_detection() {
        let temp_dir = TempDir::new().unwrap();
        create_test_theme(temp_dir.path(), "theme-a", Some("theme-b"));
        create_test_theme(temp_dir.path(), "theme-b", Some("theme-a"));

        let mut registry = ThemeRegistry::new();
        registry.add_search_path(temp_dir.path().to_path_buf());
        registry.discover_themes();

        let err = registry.resolve_theme_chain("theme-a").unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn test_option_validation() {
        let theme = Theme::opptheme();
        let warnings = theme
            .validate_options(&options(json!({"fixed_drawer": true, "logo": "x.png"})))
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("logo"));

        assert!(theme
            .validate_options(&options(json!({"fixed_drawer": "yes"})))
            .is_err());
        assert!(theme
            .validate_options(&options(json!({"primary_color": "magenta"})))
            .is_err());
    }

    #[test]
    fn test_header_links() {
        let opts = options(json!({
            "header_links": [
                ["https://inet.omnetpp.org", "Home", true, "home"],
                {"name": "GitHub", "url": "https://github.com/inet-framework/inet", "external": true}
            ]
        }));
        let links = header_links(&opts).unwrap();
        assert_eq!(
            links[0],
            HeaderLink {
                name: "Home".to_string(),
                url: "https://inet.omnetpp.org".to_string(),
                external: true,
                icon: Some("home".to_string()),
            }
        );
        assert_eq!(links[1].name, "GitHub");
        assert!(links[1].icon.is_none());

        assert!(header_links(&options(json!({"header_links": [["only-url"]]}))).is_err());
        assert!(header_links(&IndexMap::new()).unwrap().is_empty());
    }
}
