//! Highlighted literal blocks and the per-page default language.

use super::{attr, ContentRule, Directive, DirectiveContext, DirectiveHandler, Node, OptionKind};
use crate::error::DirectiveError;
use crate::highlight::{parse_line_spec, HighlightOptions};

/// `code-block` (also `code` and `sourcecode`).
pub struct CodeBlockDirective;

/// Strip up to `amount` leading spaces from every line.
fn dedent(lines: &[String], amount: usize) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let spaces = line.len() - line.trim_start_matches(' ').len();
            line[spaces.min(amount)..].to_string()
        })
        .collect()
}

impl DirectiveHandler for CodeBlockDirective {
    fn name(&self) -> &str {
        "code-block"
    }

    fn aliases(&self) -> &[&'static str] {
        &["code", "sourcecode"]
    }

    fn optional_arguments(&self) -> usize {
        1
    }

    fn option_spec(&self) -> &[(&'static str, OptionKind)] {
        &[
            ("linenos", OptionKind::Flag),
            ("lineno-start", OptionKind::PositiveInt),
            ("emphasize-lines", OptionKind::Unchanged),
            ("caption", OptionKind::Unchanged),
            ("name", OptionKind::Unchanged),
            ("dedent", OptionKind::PositiveInt),
            ("force", OptionKind::Flag),
        ]
    }

    fn content(&self) -> ContentRule {
        ContentRule::Required
    }

    fn run(
        &self,
        directive: &Directive,
        context: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>, DirectiveError> {
        let language = directive
            .arguments
            .first()
            .cloned()
            .unwrap_or_else(|| context.highlight_language.clone());

        let lines = match directive.get_option("dedent") {
            Some(amount) => dedent(&directive.content, amount.parse().unwrap_or(0)),
            None => directive.content.clone(),
        };
        let mut code = lines.join("\n");
        code.push('\n');

        let mut options = HighlightOptions {
            linenos: directive.has_option("linenos") || directive.has_option("lineno-start"),
            ..HighlightOptions::default()
        };
        if let Some(start) = directive.get_option("lineno-start") {
            options.lineno_start = start.parse().unwrap_or(1);
        }
        if let Some(spec) = directive.get_option("emphasize-lines") {
            options.emphasize_lines =
                parse_line_spec(spec, lines.len()).map_err(|reason| {
                    DirectiveError::InvalidOption {
                        option: "emphasize-lines".to_string(),
                        value: spec.to_string(),
                        reason,
                    }
                })?;
        }

        let html = context.highlighter.highlight(&code, &language, &options);
        let caption = directive.get_option("caption");
        let name = directive.get_option("name");
        let html = match (caption, name) {
            (None, None) => html,
            (caption, name) => {
                let id = name
                    .map(|name| format!(" id=\"{}\"", attr(name)))
                    .unwrap_or_default();
                let caption = caption
                    .map(|caption| {
                        format!(
                            "<div class=\"code-block-caption\"><span class=\"caption-text\">{}</span></div>\n",
                            html_escape::encode_text(caption)
                        )
                    })
                    .unwrap_or_default();
                format!(
                    "<div class=\"literal-block-wrapper docutils container\"{}>\n{}{}\n</div>",
                    id, caption, html
                )
            }
        };
        Ok(vec![Node::Raw(html)])
    }
}

/// `highlight`: sets the language of later code blocks on the page.
pub struct HighlightDirective;

impl DirectiveHandler for HighlightDirective {
    fn name(&self) -> &str {
        "highlight"
    }

    fn required_arguments(&self) -> usize {
        1
    }

    fn option_spec(&self) -> &[(&'static str, OptionKind)] {
        &[
            ("linenothreshold", OptionKind::PositiveInt),
            ("force", OptionKind::Flag),
        ]
    }

    fn run(
        &self,
        directive: &Directive,
        context: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>, DirectiveError> {
        context.highlight_language = directive.arguments[0].clone();
        Ok(Vec::new())
    }
}
