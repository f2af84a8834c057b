//! Highlighting styles rendered as CSS for the formatter's token classes.

use crate::token::TokenKind;

/// Resolved presentation of one token kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRule {
    pub color: Option<String>,
    pub background: Option<String>,
    pub border: Option<String>,
    pub bold: bool,
    pub italic: bool,
}

impl StyleRule {
    /// Apply a space-separated style definition such as `"nobold #B00040"`.
    fn apply(&mut self, definition: &str) {
        for part in definition.split_whitespace() {
            match part {
                "bold" => self.bold = true,
                "nobold" => self.bold = false,
                "italic" => self.italic = true,
                "noitalic" => self.italic = false,
                _ => {
                    if let Some(color) = part.strip_prefix("bg:") {
                        self.background = Some(color.to_string());
                    } else if let Some(color) = part.strip_prefix("border:") {
                        self.border = Some(color.to_string());
                    } else if part.starts_with('#') {
                        self.color = Some(part.to_string());
                    }
                }
            }
        }
    }

    fn declarations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(color) = &self.color {
            out.push(format!("color: {}", color));
        }
        if let Some(background) = &self.background {
            out.push(format!("background-color: {}", background));
        }
        if let Some(border) = &self.border {
            out.push(format!("border: 1px solid {}", border));
        }
        if self.bold {
            out.push("font-weight: bold".to_string());
        }
        if self.italic {
            out.push("font-style: italic".to_string());
        }
        out
    }
}

/// A named highlighting style.
#[derive(Debug, Clone)]
pub struct Style {
    pub name: &'static str,
    pub background: &'static str,
    pub highlight: &'static str,
    definitions: &'static [(TokenKind, &'static str)],
}

const DEFAULT_DEFINITIONS: &[(TokenKind, &str)] = &[
    (TokenKind::Comment, "italic #408080"),
    (TokenKind::CommentPreproc, "noitalic #BC7A00"),
    (TokenKind::Keyword, "bold #008000"),
    (TokenKind::KeywordPseudo, "nobold"),
    (TokenKind::KeywordType, "nobold #B00040"),
    (TokenKind::Operator, "#666666"),
    (TokenKind::NameBuiltin, "#008000"),
    (TokenKind::NameFunction, "#0000FF"),
    (TokenKind::NameClass, "bold #0000FF"),
    (TokenKind::NameLabel, "#A0A000"),
    (TokenKind::NameAttribute, "#7D9029"),
    (TokenKind::String, "#BA2121"),
    (TokenKind::StringEscape, "bold #BB6622"),
    (TokenKind::Number, "#666666"),
    (TokenKind::Error, "border:#FF0000"),
];

const BW_DEFINITIONS: &[(TokenKind, &str)] = &[
    (TokenKind::Comment, "italic"),
    (TokenKind::CommentPreproc, "noitalic"),
    (TokenKind::Keyword, "bold"),
    (TokenKind::KeywordPseudo, "nobold"),
    (TokenKind::KeywordType, "nobold"),
    (TokenKind::NameClass, "bold"),
    (TokenKind::StringEscape, "bold"),
    (TokenKind::Error, "border:#FF0000"),
];

impl Style {
    pub fn by_name(name: &str) -> Option<Style> {
        match name {
            "default" => Some(Style {
                name: "default",
                background: "#f8f8f8",
                highlight: "#ffffcc",
                definitions: DEFAULT_DEFINITIONS,
            }),
            "bw" => Some(Style {
                name: "bw",
                background: "#ffffff",
                highlight: "#ffffcc",
                definitions: BW_DEFINITIONS,
            }),
            _ => None,
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["default", "bw"]
    }

    /// Effective rule for `kind`: the definitions of its ancestors applied
    /// outermost first.
    pub fn rule_for(&self, kind: TokenKind) -> StyleRule {
        let mut chain = vec![kind];
        let mut current = kind;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }

        let mut rule = StyleRule::default();
        for kind in chain.into_iter().rev() {
            if let Some((_, definition)) = self.definitions.iter().find(|(k, _)| *k == kind) {
                rule.apply(definition);
            }
        }
        rule
    }

    /// Stylesheet for the classes emitted by the HTML formatter, scoped under
    /// `selector` (usually `.highlight`).
    pub fn css(&self, selector: &str) -> String {
        let mut css = format!(
            "{sel} .hll {{ background-color: {hl} }}\n{sel} {{ background: {bg}; }}\n",
            sel = selector,
            hl = self.highlight,
            bg = self.background
        );
        for kind in TokenKind::ALL {
            if kind.css_class().is_empty() {
                continue;
            }
            let declarations = self.rule_for(*kind).declarations();
            if declarations.is_empty() {
                continue;
            }
            css.push_str(&format!(
                "{} .{} {{ {} }} /* {} */\n",
                selector,
                kind.css_class(),
                declarations.join("; "),
                kind
            ));
        }
        css
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_inherits_and_overrides() {
        let style = Style::by_name("default").unwrap();
        let keyword = style.rule_for(TokenKind::Keyword);
        assert!(keyword.bold);
        assert_eq!(keyword.color.as_deref(), Some("#008000"));

        let keyword_type = style.rule_for(TokenKind::KeywordType);
        assert!(!keyword_type.bold);
        assert_eq!(keyword_type.color.as_deref(), Some("#B00040"));

        let reserved = style.rule_for(TokenKind::KeywordReserved);
        assert!(reserved.bold);
    }

    #[test]
    fn test_css_contains_token_classes() {
        let css = Style::by_name("default").unwrap().css(".highlight");
        assert!(css.contains(".highlight .k { color: #008000; font-weight: bold }"));
        assert!(css.contains(".highlight .hll { background-color: #ffffcc }"));
        assert!(css.contains(".highlight .err { border: 1px solid #FF0000 }"));
        assert!(!css.contains(".highlight . {"));
    }

    #[test]
    fn test_unknown_style() {
        assert!(Style::by_name("monokai").is_none());
    }
}
