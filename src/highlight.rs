//! Code block highlighting to HTML.

use log::debug;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::lexer::Lexer;
use crate::registry::LexerRegistry;
use crate::token::{Token, TokenKind};

/// Formatting options for one code block.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOptions {
    pub linenos: bool,
    pub lineno_start: usize,
    /// 1-based line numbers wrapped in `<span class="hll">`.
    pub emphasize_lines: Vec<usize>,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            linenos: false,
            lineno_start: 1,
            emphasize_lines: Vec::new(),
        }
    }
}

/// Renders token streams as class-annotated HTML.
#[derive(Debug, Clone, Default)]
pub struct HtmlFormatter {
    options: HighlightOptions,
}

impl HtmlFormatter {
    pub fn new(options: HighlightOptions) -> Self {
        Self { options }
    }

    pub fn format(&self, tokens: &[Token<'_>]) -> String {
        let lines = split_lines(&merge(tokens));
        let width = (self.options.lineno_start + lines.len().saturating_sub(1))
            .to_string()
            .len();

        let mut html = String::from("<div class=\"highlight\"><pre><span></span>");
        for (index, line) in lines.iter().enumerate() {
            let number = self.options.lineno_start + index;
            let mut rendered = String::new();
            if self.options.linenos {
                rendered.push_str(&format!(
                    "<span class=\"linenos\">{:>width$}</span>",
                    number,
                    width = width
                ));
            }
            for (kind, text) in line {
                let escaped = html_escape::encode_text(text);
                let class = kind.css_class();
                if class.is_empty() || text.trim_end_matches('\n').is_empty() {
                    rendered.push_str(&escaped);
                } else if let Some(body) = escaped.strip_suffix('\n') {
                    rendered.push_str(&format!("<span class=\"{}\">{}</span>\n", class, body));
                } else {
                    rendered.push_str(&format!("<span class=\"{}\">{}</span>", class, escaped));
                }
            }
            if self.options.emphasize_lines.contains(&(index + 1)) {
                html.push_str(&format!("<span class=\"hll\">{}</span>", rendered));
            } else {
                html.push_str(&rendered);
            }
        }
        html.push_str("</pre></div>");
        html
    }
}

/// Join adjacent tokens of the same kind.
fn merge(tokens: &[Token<'_>]) -> Vec<(TokenKind, String)> {
    let mut merged: Vec<(TokenKind, String)> = Vec::new();
    for token in tokens {
        match merged.last_mut() {
            Some((kind, text)) if *kind == token.kind => text.push_str(token.text),
            _ => merged.push((token.kind, token.text.to_string())),
        }
    }
    merged
}

/// Regroup runs into lines; each line keeps its trailing newline inside its
/// last run so spans never cross line boundaries.
fn split_lines(runs: &[(TokenKind, String)]) -> Vec<Vec<(TokenKind, String)>> {
    let mut lines = vec![Vec::new()];
    for (kind, text) in runs {
        for piece in text.split_inclusive('\n') {
            if let Some(line) = lines.last_mut() {
                line.push((*kind, piece.to_string()));
            }
            if piece.ends_with('\n') {
                lines.push(Vec::new());
            }
        }
    }
    if lines.last().is_some_and(|line| line.is_empty()) && lines.len() > 1 {
        lines.pop();
    }
    lines
}

/// Parse a line selection such as `1,3-5` into sorted 1-based line numbers.
pub fn parse_line_spec(spec: &str, total: usize) -> Result<Vec<usize>, String> {
    let mut lines = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_line_number(start)?;
                let end = if end.trim().is_empty() {
                    total
                } else {
                    parse_line_number(end)?
                };
                (start, end)
            }
            None => {
                let line = parse_line_number(part)?;
                (line, line)
            }
        };
        if start == 0 || start > end {
            return Err(format!("invalid line range '{}'", part));
        }
        if end > total {
            return Err(format!("line {} is beyond the {} line(s) of the block", end, total));
        }
        lines.extend(start..=end);
    }
    lines.sort_unstable();
    lines.dedup();
    Ok(lines)
}

fn parse_line_number(text: &str) -> Result<usize, String> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| format!("'{}' is not a line number", text.trim()))
}

/// Dispatches code blocks to the registered lexers, falling back to syntect's
/// bundled grammars and finally to escaped plain text.
pub struct Highlighter {
    registry: &'static LexerRegistry,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            registry: LexerRegistry::global(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: "InspiredGitHub".to_string(),
        }
    }

    /// Set the syntect theme used for fallback highlighting.
    pub fn set_fallback_theme(&mut self, theme_name: &str) {
        if self.theme_set.themes.contains_key(theme_name) {
            self.theme_name = theme_name.to_string();
        }
    }

    pub fn lexer(&self, language: &str) -> Option<&'static Lexer> {
        self.registry.get(language)
    }

    /// Highlight `code` and wrap it the way Sphinx wraps literal blocks.
    pub fn highlight(&self, code: &str, language: &str, options: &HighlightOptions) -> String {
        let body = match self.registry.get(language) {
            Some(lexer) => {
                let tokens = lexer.tokenize(code);
                HtmlFormatter::new(options.clone()).format(&tokens)
            }
            None => self.highlight_fallback(code, language, options),
        };
        format!(
            "<div class=\"highlight-{} notranslate\">{}\n</div>",
            html_escape::encode_double_quoted_attribute(language),
            body
        )
    }

    fn highlight_fallback(&self, code: &str, language: &str, options: &HighlightOptions) -> String {
        let plain = || {
            let tokens = [Token::new(TokenKind::Text, code, 0)];
            HtmlFormatter::new(options.clone()).format(&tokens)
        };

        if matches!(language, "none" | "text" | "") {
            return plain();
        }

        let Some(syntax) = self
            .syntax_set
            .find_syntax_by_token(language)
            .or_else(|| self.syntax_set.find_syntax_by_extension(language))
        else {
            debug!("no highlighter for '{}', emitting plain text", language);
            return plain();
        };

        let theme = &self.theme_set.themes[&self.theme_name];
        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(html) => format!("<div class=\"highlight\">{}</div>", html),
            Err(e) => {
                debug!("syntect failed on '{}': {}", language, e);
                plain()
            }
        }
    }
}
