//! Link roles: `extlinks`-style URL templates and Doxygen tag file lookups.
//!
//! Both kinds of role are rewritten in place to anonymous reST hyperlinks
//! (`` `text <url>`__ ``) so the result no longer depends on the roles being
//! registered with the downstream reST processor.

use indexmap::IndexMap;
use log::{debug, warn};
use regex::{Captures, Regex};
use std::path::Path;

use crate::config::{DocsConfig, DoxylinkConfig, ExtLinkConfig};
use crate::directives::indentation;
use crate::error::{DocsError, Result};

lazy_static::lazy_static! {
    static ref ROLE_RE: Regex = Regex::new(r":([A-Za-z][\w-]*):`([^`]+)`").unwrap();
    static ref EXPLICIT_TITLE_RE: Regex = Regex::new(r"(?s)^(.+?)\s*<([^<>]+)>$").unwrap();
    static ref COMPOUND_RE: Regex =
        Regex::new(r#"(?s)<compound\s+kind="([^"]*)"[^>]*>(.*?)</compound>"#).unwrap();
    static ref MEMBER_RE: Regex =
        Regex::new(r#"(?s)<member\s+kind="([^"]*)"[^>]*>(.*?)</member>"#).unwrap();
    static ref LITERAL_DIRECTIVE_RE: Regex = Regex::new(
        r"^([ \t]*)\.\.[ \t]+(?:code-block|code|sourcecode|literalinclude|raw|highlight)::"
    )
    .unwrap();
}

fn element<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&format!("</{}>", tag))? + start;
    Some(body[start..end].trim())
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// One resolvable entry of a tag file.
#[derive(Debug, Clone, PartialEq)]
pub struct TagEntry {
    pub kind: String,
    pub name: String,
    /// Path of the target relative to the documentation root, with anchor.
    pub file: String,
}

/// Outcome of looking a name up in a [`TagIndex`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a TagEntry),
    Ambiguous(Vec<&'a str>),
    Missing,
}

/// Names and file locations read from a Doxygen-format tag file.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    entries: IndexMap<String, TagEntry>,
}

impl TagIndex {
    pub fn parse(xml: &str) -> Result<Self> {
        if !xml.contains("<tagfile") {
            return Err(DocsError::TagFile("missing <tagfile> root element".to_string()));
        }

        let mut entries = IndexMap::new();
        for compound in COMPOUND_RE.captures_iter(xml) {
            let body = &compound[2];
            let (Some(name), Some(filename)) = (element(body, "name"), element(body, "filename"))
            else {
                continue;
            };
            let name = decode(name);
            let mut file = decode(filename);
            if !file.ends_with(".html") {
                file.push_str(".html");
            }

            for member in MEMBER_RE.captures_iter(body) {
                let member_body = &member[2];
                let (Some(member_name), Some(anchorfile)) =
                    (element(member_body, "name"), element(member_body, "anchorfile"))
                else {
                    continue;
                };
                let anchor = element(member_body, "anchor").unwrap_or("");
                let qualified = format!("{}::{}", name, decode(member_name));
                let mut target = decode(anchorfile);
                if !anchor.is_empty() {
                    target.push('#');
                    target.push_str(&decode(anchor));
                }
                entries.insert(
                    qualified.clone(),
                    TagEntry {
                        kind: member[1].to_string(),
                        name: qualified,
                        file: target,
                    },
                );
            }

            entries.insert(
                name.clone(),
                TagEntry {
                    kind: compound[1].to_string(),
                    name,
                    file,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path).map_err(|e| DocsError::io(path, e))?;
        let index = Self::parse(&xml)?;
        debug!("read {} entries from {}", index.len(), path.display());
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact name first, then names ending in `::target` or `.target`.
    pub fn lookup(&self, target: &str) -> Lookup<'_> {
        let target = target.trim().trim_end_matches("()");
        if let Some(entry) = self.entries.get(target) {
            return Lookup::Found(entry);
        }

        let scoped = format!("::{}", target);
        let dotted = format!(".{}", target);
        let candidates: Vec<&TagEntry> = self
            .entries
            .values()
            .filter(|entry| entry.name.ends_with(&scoped) || entry.name.ends_with(&dotted))
            .collect();
        match candidates.as_slice() {
            [] => Lookup::Missing,
            [entry] => Lookup::Found(*entry),
            _ => Lookup::Ambiguous(candidates.iter().copied().map(|e| e.name.as_str()).collect()),
        }
    }
}

/// A role resolved through a tag file.
#[derive(Debug, Clone)]
pub struct DoxylinkRole {
    pub index: TagIndex,
    pub base_url: String,
}

impl DoxylinkRole {
    /// Load the tag file named by `config`, relative to `confdir`. A missing
    /// or unreadable tag file leaves the role with an empty index.
    pub fn load(name: &str, config: &DoxylinkConfig, confdir: &Path) -> Self {
        let path = confdir.join(&config.tagfile);
        let index = match TagIndex::from_file(&path) {
            Ok(index) => index,
            Err(e) => {
                warn!("role '{}': {}; its links will not resolve", name, e);
                TagIndex::default()
            }
        };
        Self {
            index,
            base_url: config.base_url.clone(),
        }
    }

    fn url(&self, file: &str) -> String {
        if self.base_url.is_empty() || self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, file)
        } else {
            format!("{}/{}", self.base_url, file)
        }
    }
}

/// Split `title <target>` role text.
fn split_title(text: &str) -> (Option<&str>, &str) {
    match EXPLICIT_TITLE_RE.captures(text) {
        Some(caps) => {
            let title = caps.get(1).map(|m| m.as_str());
            let target = caps.get(2).map(|m| m.as_str()).unwrap_or(text);
            (title, target)
        }
        None => (None, text),
    }
}

fn hyperlink(text: &str, url: &str) -> String {
    let text = text.replace('`', "\\`").replace('<', "\\<");
    format!("`{} <{}>`__", text, url)
}

fn literal(text: &str) -> String {
    format!("``{}``", text)
}

/// Rewrites the configured link roles.
#[derive(Debug, Clone, Default)]
pub struct RoleResolver {
    extlinks: IndexMap<String, ExtLinkConfig>,
    doxylinks: IndexMap<String, DoxylinkRole>,
}

impl RoleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver for the extlinks and doxylink roles of `config`; tag files
    /// are read relative to `confdir`.
    pub fn from_config(config: &DocsConfig, confdir: &Path) -> Self {
        let mut resolver = Self::new();
        for (name, link) in &config.extlinks {
            resolver.add_extlink(name, link.clone());
        }
        for (name, link) in &config.doxylink {
            resolver.add_doxylink(name, DoxylinkRole::load(name, link, confdir));
        }
        resolver
    }

    pub fn add_extlink(&mut self, name: &str, link: ExtLinkConfig) {
        self.extlinks.insert(name.to_string(), link);
    }

    pub fn add_doxylink(&mut self, name: &str, role: DoxylinkRole) {
        self.doxylinks.insert(name.to_string(), role);
    }

    pub fn handles(&self, role: &str) -> bool {
        self.extlinks.contains_key(role) || self.doxylinks.contains_key(role)
    }

    /// Replacement markup for one role occurrence, or `None` when the role
    /// is not one of ours.
    pub fn resolve(&self, role: &str, text: &str, docname: &str) -> Option<String> {
        let (title, target) = split_title(text);

        if let Some(link) = self.extlinks.get(role) {
            let url = link.url.replacen("%s", target, 1);
            let display = match (title, &link.caption) {
                (Some(title), _) => title.to_string(),
                (None, Some(prefix)) => format!("{}{}", prefix, target),
                (None, None) => url.clone(),
            };
            return Some(hyperlink(&display, &url));
        }

        let doxylink = self.doxylinks.get(role)?;
        let display = title.unwrap_or(target);
        Some(match doxylink.index.lookup(target) {
            Lookup::Found(entry) => hyperlink(display, &doxylink.url(&entry.file)),
            Lookup::Ambiguous(names) => {
                warn!(
                    "{}: :{}:`{}` is ambiguous, candidates: {}",
                    docname,
                    role,
                    target,
                    names.join(", ")
                );
                literal(display)
            }
            Lookup::Missing => {
                warn!("{}: :{}:`{}` not found in tag file", docname, role, target);
                literal(display)
            }
        })
    }

    /// Rewrite every handled role in `text`, leaving literal directive
    /// bodies (code blocks, raw blocks) untouched.
    pub fn expand(&self, text: &str, docname: &str) -> String {
        let mut output = Vec::new();
        let mut literal_indent: Option<usize> = None;

        for line in text.split('\n') {
            let indent = indentation(line);
            if let Some(limit) = literal_indent {
                if line.trim().is_empty() || indent > limit {
                    output.push(line.to_string());
                    continue;
                }
                literal_indent = None;
            }
            if let Some(caps) = LITERAL_DIRECTIVE_RE.captures(line) {
                literal_indent = Some(caps[1].len());
                output.push(line.to_string());
                continue;
            }

            let replaced = ROLE_RE.replace_all(line, |caps: &Captures| {
                self.resolve(&caps[1], &caps[2], docname)
                    .unwrap_or_else(|| caps[0].to_string())
            });
            output.push(replaced.into_owned());
        }
        output.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TAGS: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<tagfile>
  <compound kind="class">
    <name>inet::Ipv4</name>
    <filename>inet.networklayer.ipv4.Ipv4.html</filename>
    <member kind="function">
      <type>void</type>
      <name>handleMessage</name>
      <anchorfile>inet.networklayer.ipv4.Ipv4.html</anchorfile>
      <anchor>a1b2</anchor>
      <arglist>(cMessage *msg)</arglist>
    </member>
  </compound>
  <compound kind="class">
    <name>inet.node.inet.StandardHost</name>
    <filename>inet.node.inet.StandardHost</filename>
  </compound>
  <compound kind="class">
    <name>inet.node.ethernet.Eth</name>
    <filename>eth1.html</filename>
  </compound>
  <compound kind="class">
    <name>inet.linklayer.ethernet.Eth</name>
    <filename>eth2.html</filename>
  </compound>
  <compound kind="file">
    <name>Queue&lt;T&gt;</name>
    <filename>queue.html</filename>
  </compound>
</tagfile>
"#;

    fn resolver() -> RoleResolver {
        let mut resolver = RoleResolver::new();
        resolver.add_extlink(
            "wiki",
            ExtLinkConfig {
                url: "https://en.wikipedia.org/wiki/%s".to_string(),
                caption: Some(String::new()),
            },
        );
        resolver.add_extlink(
            "rfc",
            ExtLinkConfig {
                url: "https://tools.ietf.org/html/rfc%s".to_string(),
                caption: Some("RFC ".to_string()),
            },
        );
        resolver.add_doxylink(
            "ned",
            DoxylinkRole {
                index: TagIndex::parse(TAGS).unwrap(),
                base_url: "https://omnetpp.org/doc/inet/api-current/neddoc".to_string(),
            },
        );
        resolver
    }

    #[test]
    fn test_tag_index_entries() {
        let index = TagIndex::parse(TAGS).unwrap();
        assert_eq!(index.len(), 6);
        let Lookup::Found(entry) = index.lookup("inet::Ipv4::handleMessage()") else {
            panic!("member not indexed");
        };
        assert_eq!(entry.file, "inet.networklayer.ipv4.Ipv4.html#a1b2");
        assert_eq!(entry.kind, "function");
        assert!(matches!(index.lookup("Queue<T>"), Lookup::Found(_)));
    }

    #[test]
    fn test_lookup_suffix_rules() {
        let index = TagIndex::parse(TAGS).unwrap();
        match index.lookup("StandardHost") {
            Lookup::Found(entry) => assert_eq!(entry.file, "inet.node.inet.StandardHost.html"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(index.lookup("Ipv4"), Lookup::Found(_)));
        assert!(matches!(index.lookup("Eth"), Lookup::Ambiguous(ref names) if names.len() == 2));
        assert_eq!(index.lookup("Host"), Lookup::Missing);
    }

    #[test]
    fn test_not_a_tag_file() {
        assert!(TagIndex::parse("<html></html>").is_err());
    }

    #[test]
    fn test_extlinks() {
        let resolver = resolver();
        assert_eq!(
            resolver.expand("See :wiki:`Ethernet` and :rfc:`791`.", "index"),
            "See `Ethernet <https://en.wikipedia.org/wiki/Ethernet>`__ and \
             `RFC 791 <https://tools.ietf.org/html/rfc791>`__."
        );
        assert_eq!(
            resolver.expand(":wiki:`the protocol <Internet_Protocol>`", "index"),
            "`the protocol <https://en.wikipedia.org/wiki/Internet_Protocol>`__"
        );
    }

    #[test]
    fn test_extlink_without_caption_shows_url() {
        let mut resolver = RoleResolver::new();
        resolver.add_extlink(
            "issue",
            ExtLinkConfig {
                url: "https://github.com/inet-framework/inet/issues/%s".to_string(),
                caption: None,
            },
        );
        assert_eq!(
            resolver.resolve("issue", "12", "index").unwrap(),
            "`https://github.com/inet-framework/inet/issues/12 \
             <https://github.com/inet-framework/inet/issues/12>`__"
        );
    }

    #[test]
    fn test_doxylinks() {
        let resolver = resolver();
        assert_eq!(
            resolver.expand(":ned:`StandardHost`", "index"),
            "`StandardHost <https://omnetpp.org/doc/inet/api-current/neddoc/\
             inet.node.inet.StandardHost.html>`__"
        );
        assert_eq!(resolver.expand(":ned:`Eth`", "index"), "``Eth``");
        assert_eq!(resolver.expand(":ned:`Missing`", "index"), "``Missing``");
    }

    #[test]
    fn test_unrelated_roles_and_code_untouched() {
        let resolver = resolver();
        let text = ":doc:`intro`\n\n.. code-block:: rst\n\n   :wiki:`Kept`\n\n:wiki:`X`";
        let expanded = resolver.expand(text, "index");
        assert!(expanded.starts_with(":doc:`intro`\n\n.. code-block:: rst\n\n   :wiki:`Kept`\n\n"));
        assert!(expanded.ends_with("`X <https://en.wikipedia.org/wiki/X>`__"));
        assert!(!resolver.handles("doc"));
    }

    #[test]
    fn test_missing_tag_file_yields_empty_index() {
        let dir = TempDir::new().unwrap();
        let role = DoxylinkRole::load(
            "msg",
            &DoxylinkConfig {
                tagfile: PathBuf::from("msgtags.xml"),
                base_url: "https://example.org/".to_string(),
            },
            dir.path(),
        );
        assert!(role.index.is_empty());
    }
}
