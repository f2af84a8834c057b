//! INET documentation toolkit
//!
//! Syntax highlighting for NED, MSG and INI sources, the custom directives
//! and link roles used by the INET Framework manuals, and the page
//! preprocessing that runs before reStructuredText parsing.

pub mod config;
pub mod directives;
pub mod error;
pub mod highlight;
pub mod lexer;
pub mod lexers;
pub mod matching;
pub mod pipeline;
pub mod preprocess;
pub mod registry;
pub mod roles;
pub mod style;
pub mod theme;
pub mod token;

pub use config::DocsConfig;
pub use directives::{Directive, DirectiveContext, DirectiveHandler, DirectiveRegistry, Node};
pub use error::{DirectiveError, DocsError, LexerError};
pub use highlight::{HighlightOptions, Highlighter, HtmlFormatter};
pub use lexer::{Grammar, Lexer};
pub use pipeline::{Pipeline, RenderStats};
pub use preprocess::Preprocessor;
pub use registry::LexerRegistry;
pub use roles::{RoleResolver, TagIndex};
pub use style::Style;
pub use theme::{Theme, ThemeRegistry};
pub use token::{Token, TokenKind};
