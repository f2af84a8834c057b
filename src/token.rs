//! Token taxonomy shared by all lexers.
//!
//! Token kinds are hierarchical in the usual highlighting sense: `Keyword.Type`
//! is a `Keyword`, `Number.Hex` is a `Number`. Every kind also maps onto a
//! small fixed [`TokenCategory`] and onto the short CSS class used by the HTML
//! formatter and the highlighting style.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a scanned span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenKind {
    Text,
    Error,

    Keyword,
    KeywordType,
    KeywordReserved,
    KeywordPseudo,

    Name,
    NameBuiltin,
    NameFunction,
    NameAttribute,
    NameLabel,
    NameClass,

    String,
    StringAffix,
    StringChar,
    StringEscape,
    StringDelimiter,

    Number,
    NumberInteger,
    NumberFloat,
    NumberHex,
    NumberOct,

    Operator,
    Punctuation,

    Comment,
    CommentSingle,
    CommentMultiline,
    CommentPreproc,
    CommentPreprocFile,
}

/// Coarse token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
    Keyword,
    Identifier,
    String,
    Number,
    Comment,
    Punctuation,
    Operator,
    Error,
    Text,
}

impl TokenKind {
    pub const ALL: &'static [TokenKind] = &[
        TokenKind::Text,
        TokenKind::Error,
        TokenKind::Keyword,
        TokenKind::KeywordType,
        TokenKind::KeywordReserved,
        TokenKind::KeywordPseudo,
        TokenKind::Name,
        TokenKind::NameBuiltin,
        TokenKind::NameFunction,
        TokenKind::NameAttribute,
        TokenKind::NameLabel,
        TokenKind::NameClass,
        TokenKind::String,
        TokenKind::StringAffix,
        TokenKind::StringChar,
        TokenKind::StringEscape,
        TokenKind::StringDelimiter,
        TokenKind::Number,
        TokenKind::NumberInteger,
        TokenKind::NumberFloat,
        TokenKind::NumberHex,
        TokenKind::NumberOct,
        TokenKind::Operator,
        TokenKind::Punctuation,
        TokenKind::Comment,
        TokenKind::CommentSingle,
        TokenKind::CommentMultiline,
        TokenKind::CommentPreproc,
        TokenKind::CommentPreprocFile,
    ];

    /// The kind one level up in the hierarchy.
    pub fn parent(self) -> Option<TokenKind> {
        use TokenKind::*;
        match self {
            Text | Error | Keyword | Name | String | Number | Operator | Punctuation | Comment => {
                None
            }
            KeywordType | KeywordReserved | KeywordPseudo => Some(Keyword),
            NameBuiltin | NameFunction | NameAttribute | NameLabel | NameClass => Some(Name),
            StringAffix | StringChar | StringEscape | StringDelimiter => Some(String),
            NumberInteger | NumberFloat | NumberHex | NumberOct => Some(Number),
            CommentSingle | CommentMultiline | CommentPreproc => Some(Comment),
            CommentPreprocFile => Some(CommentPreproc),
        }
    }

    /// Whether `self` is `ancestor` or a descendant of it.
    pub fn is_subtype_of(self, ancestor: TokenKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    pub fn category(self) -> TokenCategory {
        use TokenKind::*;
        let mut root = self;
        while let Some(parent) = root.parent() {
            root = parent;
        }
        match root {
            Keyword => TokenCategory::Keyword,
            Name => TokenCategory::Identifier,
            String => TokenCategory::String,
            Number => TokenCategory::Number,
            Comment => TokenCategory::Comment,
            Punctuation => TokenCategory::Punctuation,
            Operator => TokenCategory::Operator,
            Error => TokenCategory::Error,
            _ => TokenCategory::Text,
        }
    }

    /// Short CSS class name, compatible with Pygments stylesheets.
    pub fn css_class(self) -> &'static str {
        use TokenKind::*;
        match self {
            Text => "",
            Error => "err",
            Keyword => "k",
            KeywordType => "kt",
            KeywordReserved => "kr",
            KeywordPseudo => "kp",
            Name => "n",
            NameBuiltin => "nb",
            NameFunction => "nf",
            NameAttribute => "na",
            NameLabel => "nl",
            NameClass => "nc",
            String => "s",
            StringAffix => "sa",
            StringChar => "sc",
            StringEscape => "se",
            StringDelimiter => "dl",
            Number => "m",
            NumberInteger => "mi",
            NumberFloat => "mf",
            NumberHex => "mh",
            NumberOct => "mo",
            Operator => "o",
            Punctuation => "p",
            Comment => "c",
            CommentSingle => "c1",
            CommentMultiline => "cm",
            CommentPreproc => "cp",
            CommentPreprocFile => "cpf",
        }
    }

    /// Dotted name, e.g. `Keyword.Type`.
    pub fn qualified_name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Text => "Text",
            Error => "Error",
            Keyword => "Keyword",
            KeywordType => "Keyword.Type",
            KeywordReserved => "Keyword.Reserved",
            KeywordPseudo => "Keyword.Pseudo",
            Name => "Name",
            NameBuiltin => "Name.Builtin",
            NameFunction => "Name.Function",
            NameAttribute => "Name.Attribute",
            NameLabel => "Name.Label",
            NameClass => "Name.Class",
            String => "String",
            StringAffix => "String.Affix",
            StringChar => "String.Char",
            StringEscape => "String.Escape",
            StringDelimiter => "String.Delimiter",
            Number => "Number",
            NumberInteger => "Number.Integer",
            NumberFloat => "Number.Float",
            NumberHex => "Number.Hex",
            NumberOct => "Number.Oct",
            Operator => "Operator",
            Punctuation => "Punctuation",
            Comment => "Comment",
            CommentSingle => "Comment.Single",
            CommentMultiline => "Comment.Multiline",
            CommentPreproc => "Comment.Preproc",
            CommentPreprocFile => "Comment.PreprocFile",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}

/// A classified span of the input. `offset` is the byte offset of `text`
/// within the buffer handed to the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'t> {
    pub kind: TokenKind,
    pub text: &'t str,
    pub offset: usize,
}

impl<'t> Token<'t> {
    pub fn new(kind: TokenKind, text: &'t str, offset: usize) -> Self {
        Self { kind, text, offset }
    }

    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}
