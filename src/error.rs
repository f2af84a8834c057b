use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while compiling a grammar or starting a scan.
#[derive(Error, Debug)]
pub enum LexerError {
    #[error("invalid pattern in {lexer}:{state}: {source}")]
    Pattern {
        lexer: String,
        state: String,
        #[source]
        source: regex::Error,
    },

    #[error("{lexer}: unknown state '{state}'")]
    UnknownState { lexer: String, state: String },

    #[error("{lexer}: include cycle through state '{state}'")]
    IncludeCycle { lexer: String, state: String },

    #[error("{lexer}: 'inherit' in state '{state}' without a parent grammar")]
    NothingToInherit { lexer: String, state: String },

    #[error("no lexer registered for '{0}'")]
    UnknownLanguage(String),
}

/// Errors raised by directive handlers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectiveError {
    #[error("directive '{directive}' expects {expected} argument(s), got {found}")]
    ArgumentCount {
        directive: String,
        expected: String,
        found: usize,
    },

    #[error("invalid argument '{argument}' for directive '{directive}': {reason}")]
    InvalidArgument {
        directive: String,
        argument: String,
        reason: String,
    },

    #[error("unknown option '{option}' for directive '{directive}'")]
    UnknownOption { directive: String, option: String },

    #[error("invalid value '{value}' for option '{option}': {reason}")]
    InvalidOption {
        option: String,
        value: String,
        reason: String,
    },

    #[error("directive '{0}' does not allow content")]
    UnexpectedContent(String),

    #[error("directive '{0}' requires content")]
    MissingContent(String),

    #[error("highlighting failed: {0}")]
    Highlight(String),
}

/// Top-level error type of the crate.
#[derive(Error, Debug)]
pub enum DocsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("theme error: {0}")]
    Theme(String),

    #[error("template error in {docname}: {source}")]
    Template {
        docname: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("tag file error: {0}")]
    TagFile(String),

    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

impl DocsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocsError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for DocsError {
    fn from(err: config::ConfigError) -> Self {
        DocsError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocsError>;
