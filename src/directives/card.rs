//! Content cards as laid out by the documentation theme.

use super::{attr, ContentRule, Directive, DirectiveContext, DirectiveHandler, Node, OptionKind};
use crate::error::DirectiveError;

/// A `card` block: optional image and title, body kept as reST.
pub struct CardDirective;

impl DirectiveHandler for CardDirective {
    fn name(&self) -> &str {
        "card"
    }

    fn option_spec(&self) -> &[(&'static str, OptionKind)] {
        &[
            ("title", OptionKind::Unchanged),
            ("link", OptionKind::Uri),
            ("image", OptionKind::Uri),
            ("class", OptionKind::Classes),
        ]
    }

    fn content(&self) -> ContentRule {
        ContentRule::Optional
    }

    fn run(
        &self,
        directive: &Directive,
        _context: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>, DirectiveError> {
        let link = directive.get_option("link");
        let linked = |html: String| match link {
            Some(href) => format!("<a href=\"{}\">{}</a>", attr(href), html),
            None => html,
        };

        let mut classes = vec!["card".to_string()];
        if let Some(extra) = directive.get_option("class") {
            classes.extend(extra.split(' ').map(str::to_string));
        }

        let mut children = Vec::new();
        if let Some(image) = directive.get_option("image") {
            let alt = directive.get_option("title").unwrap_or("");
            children.push(Node::Raw(format!(
                "<div class=\"card-image\">{}</div>",
                linked(format!("<img src=\"{}\" alt=\"{}\">", attr(image), attr(alt)))
            )));
        }

        let mut body = Vec::new();
        if let Some(title) = directive.get_option("title") {
            body.push(Node::Raw(format!(
                "<span class=\"card-title\">{}</span>",
                linked(html_escape::encode_text(title).into_owned())
            )));
        }
        if !directive.content.is_empty() {
            body.push(Node::Paragraph(directive.content.join("\n")));
        }
        children.push(Node::Container {
            classes: vec!["card-content".to_string()],
            children: body,
        });

        Ok(vec![Node::Container { classes, children }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{nodes_to_rst, DirectiveRegistry};
    use crate::highlight::Highlighter;

    fn run(directive: Directive) -> Vec<Node> {
        let highlighter = Highlighter::new();
        let mut context = DirectiveContext::new(&highlighter, "none", "index");
        DirectiveRegistry::with_builtin_handlers()
            .run(&directive, &mut context)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_card_html() {
        let nodes = run(Directive::new("card")
            .option("title", "Wireless <Tutorial>")
            .option("link", "tutorials/wireless/index.html")
            .option("image", "wireless.png")
            .option("class", "Featured")
            .content_lines(&["Step by step.", "", "Second paragraph."]));
        assert_eq!(
            nodes[0].to_html(),
            "<div class=\"card featured\">\n\
             <div class=\"card-image\"><a href=\"tutorials/wireless/index.html\">\
             <img src=\"wireless.png\" alt=\"Wireless &lt;Tutorial&gt;\"></a></div>\n\
             <div class=\"card-content\">\n\
             <span class=\"card-title\"><a href=\"tutorials/wireless/index.html\">\
             Wireless &lt;Tutorial&gt;</a></span>\n\
             <p>Step by step.</p>\n<p>Second paragraph.</p>\n\
             </div>\n\
             </div>"
        );
    }

    #[test]
    fn test_card_body_stays_rest() {
        let nodes = run(Directive::new("card")
            .option("title", "Showcase")
            .content_lines(&["See :wiki:`Ethernet`."]));
        let rst = nodes_to_rst(&nodes);
        assert!(rst.contains("\n\nSee :wiki:`Ethernet`.\n\n.. raw:: html\n\n   </div>\n   </div>"));
    }

    #[test]
    fn test_card_without_options() {
        let nodes = run(Directive::new("card"));
        assert_eq!(
            nodes[0].to_html(),
            "<div class=\"card\">\n<div class=\"card-content\">\n</div>\n</div>"
        );
    }
}
