//! Directive blocks in reST sources.
//!
//! A directive block is a `.. name:: arguments` line followed by an indented
//! body: a field list of `:option: value` lines, then a blank line, then
//! content. Blocks whose name has a registered [`DirectiveHandler`] are
//! validated, run, and replaced by the reST rendering of the resulting
//! [`Node`]s. Unregistered directives are passed through untouched.

use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DirectiveError;
use crate::highlight::Highlighter;

pub mod card;
pub mod code;
pub mod media;

lazy_static::lazy_static! {
    static ref DIRECTIVE_RE: Regex =
        Regex::new(r"^([ \t]*)\.\.[ \t]+(\w[\w:+-]*)::(?:[ \t]+(.*?))?[ \t]*$").unwrap();
    static ref OPTION_RE: Regex = Regex::new(r"^:([\w-]+):(?:[ \t]+(.*?))?[ \t]*$").unwrap();
    static ref LENGTH_RE: Regex =
        Regex::new(r"^\d+(?:\.\d+)?(?:px|em|ex|%|pt|pc|cm|mm|in|vw|vh)?$").unwrap();
}

/// A parsed directive block.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<String>,
    pub options: IndexMap<String, String>,
    /// Content lines, dedented, without leading or trailing blank lines.
    pub content: Vec<String>,
    /// 1-based line of the `.. name::` marker.
    pub line: usize,
}

impl Directive {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: Vec::new(),
            options: IndexMap::new(),
            content: Vec::new(),
            line: 1,
        }
    }

    pub fn argument(mut self, argument: &str) -> Self {
        self.arguments.push(argument.to_string());
        self
    }

    pub fn option(mut self, name: &str, value: &str) -> Self {
        self.options.insert(name.to_string(), value.to_string());
        self
    }

    pub fn content_lines(mut self, lines: &[&str]) -> Self {
        self.content = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn get_option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

/// A directive located in a list of source lines.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBlock {
    pub directive: Directive,
    /// Indentation of the marker line.
    pub indent: String,
    /// Index of the marker line.
    pub start: usize,
    /// One past the last non-blank body line.
    pub end: usize,
}

/// Width of the leading run of spaces and tabs. Other Unicode whitespace,
/// such as a no-break space, is line content.
pub(crate) fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Parse the directive block starting at `lines[start]`, if that line is a
/// directive marker.
pub fn parse_block(lines: &[&str], start: usize) -> Option<DirectiveBlock> {
    let caps = DIRECTIVE_RE.captures(lines.get(start)?)?;
    let indent = caps[1].to_string();
    let name = caps[2].to_string();
    let arguments = caps
        .get(3)
        .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let mut end = start + 1;
    let mut index = start + 1;
    while index < lines.len() {
        let line = lines[index];
        if !line.trim().is_empty() {
            if indentation(line) <= indent.len() {
                break;
            }
            end = index + 1;
        }
        index += 1;
    }

    let body = &lines[start + 1..end];
    let mut options = IndexMap::new();
    let mut cursor = 0;
    while cursor < body.len() {
        let Some(option) = OPTION_RE.captures(body[cursor].trim()) else {
            break;
        };
        let value = option.get(2).map(|m| m.as_str()).unwrap_or("");
        options.insert(option[1].to_string(), value.to_string());
        cursor += 1;
    }

    let content_lines: Vec<&str> = body[cursor..]
        .iter()
        .copied()
        .skip_while(|line| line.trim().is_empty())
        .collect();
    let margin = content_lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indentation(line))
        .min()
        .unwrap_or(0);
    let content = content_lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line[margin..].trim_end().to_string()
            }
        })
        .collect();

    Some(DirectiveBlock {
        directive: Directive {
            name,
            arguments,
            options,
            content,
            line: start + 1,
        },
        indent,
        start,
        end,
    })
}

/// How an option value is checked and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// No value allowed.
    Flag,
    /// Any text, kept as written.
    Unchanged,
    /// A number with an optional CSS unit.
    Length,
    /// `left`, `center` or `right`.
    Align,
    /// A URI or path; internal whitespace is removed.
    Uri,
    PositiveInt,
    /// Space-separated class names, lowercased.
    Classes,
}

impl OptionKind {
    pub fn convert(self, option: &str, value: &str) -> Result<String, DirectiveError> {
        let invalid = |reason: &str| DirectiveError::InvalidOption {
            option: option.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let value = value.trim();
        match self {
            OptionKind::Flag if value.is_empty() => Ok(String::new()),
            OptionKind::Flag => Err(invalid("no argument is allowed")),
            OptionKind::Unchanged => Ok(value.to_string()),
            OptionKind::Length if LENGTH_RE.is_match(value) => Ok(value.to_string()),
            OptionKind::Length => Err(invalid("expected a length such as 560 or 80%")),
            OptionKind::Align => match value.to_lowercase().as_str() {
                align @ ("left" | "center" | "right") => Ok(align.to_string()),
                _ => Err(invalid("expected one of left, center, right")),
            },
            OptionKind::Uri => {
                let uri: String = value.split_whitespace().collect();
                if uri.is_empty() {
                    Err(invalid("a URI is required"))
                } else {
                    Ok(uri)
                }
            }
            OptionKind::PositiveInt => match value.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n.to_string()),
                _ => Err(invalid("expected a positive integer")),
            },
            OptionKind::Classes => {
                let classes: Vec<String> =
                    value.split_whitespace().map(str::to_lowercase).collect();
                if classes.is_empty() {
                    Err(invalid("at least one class name is required"))
                } else {
                    Ok(classes.join(" "))
                }
            }
        }
    }
}

/// Whether a directive takes a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    Forbidden,
    Optional,
    Required,
}

/// Markup produced by a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Pre-rendered HTML.
    Raw(String),
    /// A `<div>` with the given classes around its children.
    Container {
        classes: Vec<String>,
        children: Vec<Node>,
    },
    /// reST body text; one `<p>` per blank-line separated chunk in HTML.
    Paragraph(String),
    /// Plain text, escaped in HTML.
    Text(String),
}

enum Segment {
    Html(String),
    Rst(String),
}

impl Node {
    pub fn to_html(&self) -> String {
        match self {
            Node::Raw(html) => html.clone(),
            Node::Container { classes, children } => {
                let mut html = format!(
                    "<div class=\"{}\">",
                    html_escape::encode_double_quoted_attribute(&classes.join(" "))
                );
                for child in children {
                    html.push('\n');
                    html.push_str(&child.to_html());
                }
                html.push_str("\n</div>");
                html
            }
            Node::Paragraph(text) => text
                .split("\n\n")
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .map(|chunk| format!("<p>{}</p>", html_escape::encode_text(chunk)))
                .collect::<Vec<_>>()
                .join("\n"),
            Node::Text(text) => html_escape::encode_text(text).into_owned(),
        }
    }

    fn segments(&self, out: &mut Vec<Segment>) {
        match self {
            Node::Raw(_) | Node::Text(_) => out.push(Segment::Html(self.to_html())),
            Node::Container { classes, children } => {
                out.push(Segment::Html(format!(
                    "<div class=\"{}\">",
                    html_escape::encode_double_quoted_attribute(&classes.join(" "))
                )));
                for child in children {
                    child.segments(out);
                }
                out.push(Segment::Html("</div>".to_string()));
            }
            Node::Paragraph(text) => out.push(Segment::Rst(text.clone())),
        }
    }
}

/// Serialize nodes as reST: HTML runs become `.. raw:: html` blocks and
/// paragraphs stay reST so their inline markup is still processed.
pub fn nodes_to_rst(nodes: &[Node]) -> String {
    let mut segments = Vec::new();
    for node in nodes {
        node.segments(&mut segments);
    }

    let mut merged: Vec<Segment> = Vec::new();
    for segment in segments {
        match (merged.last_mut(), segment) {
            (Some(Segment::Html(previous)), Segment::Html(html)) => {
                previous.push('\n');
                previous.push_str(&html);
            }
            (_, segment) => merged.push(segment),
        }
    }

    merged
        .iter()
        .map(|segment| match segment {
            Segment::Html(html) => {
                let body: Vec<String> = html
                    .lines()
                    .map(|line| {
                        if line.trim().is_empty() {
                            String::new()
                        } else {
                            format!("   {}", line)
                        }
                    })
                    .collect();
                format!(".. raw:: html\n\n{}", body.join("\n"))
            }
            Segment::Rst(text) => text.trim_matches('\n').to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Per-document state shared by the directives of one page.
pub struct DirectiveContext<'h> {
    pub highlighter: &'h Highlighter,
    /// Language for code blocks that do not name one; set by `highlight`.
    pub highlight_language: String,
    pub docname: String,
}

impl<'h> DirectiveContext<'h> {
    pub fn new(highlighter: &'h Highlighter, highlight_language: &str, docname: &str) -> Self {
        Self {
            highlighter,
            highlight_language: highlight_language.to_string(),
            docname: docname.to_string(),
        }
    }
}

/// A directive implementation.
pub trait DirectiveHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Additional names the handler is registered under.
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    fn required_arguments(&self) -> usize {
        0
    }

    fn optional_arguments(&self) -> usize {
        0
    }

    fn option_spec(&self) -> &[(&'static str, OptionKind)] {
        &[]
    }

    fn content(&self) -> ContentRule {
        ContentRule::Forbidden
    }

    /// Produce markup for a directive whose arguments, options and content
    /// already passed [`DirectiveRegistry::validate`].
    fn run(
        &self,
        directive: &Directive,
        context: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>, DirectiveError>;
}

/// Handlers by directive name and alias.
#[derive(Default)]
pub struct DirectiveRegistry {
    handlers: HashMap<String, Arc<dyn DirectiveHandler>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the media, card and code directives.
    pub fn with_builtin_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(media::EmbedDirective::youtube()));
        registry.register(Arc::new(media::EmbedDirective::vimeo()));
        registry.register(Arc::new(media::VideoDirective));
        registry.register(Arc::new(media::AudioDirective));
        registry.register(Arc::new(card::CardDirective));
        registry.register(Arc::new(code::CodeBlockDirective));
        registry.register(Arc::new(code::HighlightDirective));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn DirectiveHandler>) {
        for &alias in handler.aliases() {
            self.handlers.insert(alias.to_string(), Arc::clone(&handler));
        }
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&dyn DirectiveHandler> {
        self.handlers.get(name).map(|handler| handler.as_ref())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check a directive against its handler and return it with normalized
    /// option values.
    pub fn validate(
        handler: &dyn DirectiveHandler,
        directive: &Directive,
    ) -> Result<Directive, DirectiveError> {
        let required = handler.required_arguments();
        let optional = handler.optional_arguments();
        let found = directive.arguments.len();
        if found < required || found > required + optional {
            let expected = if optional == 0 {
                required.to_string()
            } else {
                format!("{} to {}", required, required + optional)
            };
            return Err(DirectiveError::ArgumentCount {
                directive: directive.name.clone(),
                expected,
                found,
            });
        }

        let spec = handler.option_spec();
        let mut options = IndexMap::new();
        for (name, value) in &directive.options {
            let Some((_, kind)) = spec.iter().find(|(option, _)| option == name) else {
                return Err(DirectiveError::UnknownOption {
                    directive: directive.name.clone(),
                    option: name.clone(),
                });
            };
            options.insert(name.clone(), kind.convert(name, value)?);
        }

        let has_content = directive.content.iter().any(|line| !line.trim().is_empty());
        match handler.content() {
            ContentRule::Forbidden if has_content => {
                return Err(DirectiveError::UnexpectedContent(directive.name.clone()))
            }
            ContentRule::Required if !has_content => {
                return Err(DirectiveError::MissingContent(directive.name.clone()))
            }
            _ => {}
        }

        Ok(Directive {
            options,
            ..directive.clone()
        })
    }

    /// Validate and run one directive. Returns `None` for unregistered names.
    pub fn run(
        &self,
        directive: &Directive,
        context: &mut DirectiveContext<'_>,
    ) -> Option<Result<Vec<Node>, DirectiveError>> {
        let handler = self.get(&directive.name)?;
        Some(
            Self::validate(handler, directive)
                .and_then(|directive| handler.run(&directive, context)),
        )
    }

    /// Replace every registered directive block in `text` with its reST
    /// rendering. Failing directives are logged and replaced by an
    /// `.. error::` block.
    pub fn expand(&self, text: &str, context: &mut DirectiveContext<'_>) -> String {
        let lines: Vec<&str> = text.lines().collect();
        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        let mut index = 0;

        while index < lines.len() {
            let block = parse_block(&lines, index)
                .filter(|block| self.is_registered(&block.directive.name));
            let Some(block) = block else {
                output.push(lines[index].to_string());
                index += 1;
                continue;
            };

            let directive = &block.directive;
            let rendered = match self.run(directive, context) {
                Some(Ok(mut nodes)) => {
                    debug!(
                        "{}:{}: expanded '{}' directive",
                        context.docname, directive.line, directive.name
                    );
                    self.expand_paragraphs(&mut nodes, context);
                    nodes_to_rst(&nodes)
                }
                Some(Err(e)) => {
                    warn!("{}:{}: {}", context.docname, directive.line, e);
                    error_block(directive, &e)
                }
                None => String::new(),
            };

            for line in rendered.lines() {
                if line.is_empty() {
                    output.push(String::new());
                } else {
                    output.push(format!("{}{}", block.indent, line));
                }
            }
            index = block.end;
        }

        let mut expanded = output.join("\n");
        if text.ends_with('\n') {
            expanded.push('\n');
        }
        expanded
    }

    fn expand_paragraphs(&self, nodes: &mut [Node], context: &mut DirectiveContext<'_>) {
        for node in nodes {
            match node {
                Node::Paragraph(text) => *text = self.expand(text, context),
                Node::Container { children, .. } => self.expand_paragraphs(children, context),
                Node::Raw(_) | Node::Text(_) => {}
            }
        }
    }
}

fn error_block(directive: &Directive, error: &DirectiveError) -> String {
    format!(
        ".. error::\n\n   Error in \"{}\" directive at line {}: {}",
        directive.name, directive.line, error
    )
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub(crate) fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}
