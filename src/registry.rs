//! Lexer registration and lookup.

use glob::Pattern;
use log::debug;
use std::collections::HashMap;
use std::path::Path;

use crate::error::LexerError;
use crate::lexer::Lexer;
use crate::lexers;

lazy_static::lazy_static! {
    static ref BUILTIN: LexerRegistry =
        LexerRegistry::builtin().expect("built-in grammars must compile");
}

/// Lexers keyed by language name and aliases.
#[derive(Debug, Default)]
pub struct LexerRegistry {
    lexers: Vec<Lexer>,
    by_alias: HashMap<String, usize>,
}

impl LexerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register the built-in grammars.
    pub fn builtin() -> Result<Self, LexerError> {
        let mut registry = Self::new();
        for grammar in lexers::builtin_grammars() {
            registry.register(Lexer::compile(grammar)?);
        }
        Ok(registry)
    }

    /// The process-wide registry of built-in lexers.
    pub fn global() -> &'static LexerRegistry {
        &BUILTIN
    }

    /// Register a lexer. Aliases already taken are rebound to the new lexer.
    pub fn register(&mut self, lexer: Lexer) {
        let index = self.lexers.len();
        for alias in lexer.aliases() {
            if let Some(previous) = self.by_alias.insert(alias.to_lowercase(), index) {
                debug!(
                    "lexer alias '{}' rebound from {} to {}",
                    alias,
                    self.lexers[previous].name(),
                    lexer.name()
                );
            }
        }
        self.lexers.push(lexer);
    }

    /// Look up a lexer by name or alias, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Lexer> {
        self.by_alias
            .get(&name.to_lowercase())
            .map(|index| &self.lexers[*index])
    }

    pub fn require(&self, name: &str) -> Result<&Lexer, LexerError> {
        self.get(name)
            .ok_or_else(|| LexerError::UnknownLanguage(name.to_string()))
    }

    /// Find a lexer whose filename patterns match the file name of `path`.
    /// Later registrations win.
    pub fn for_filename(&self, path: &Path) -> Option<&Lexer> {
        let file_name = path.file_name()?.to_str()?;
        self.lexers.iter().rev().find(|lexer| {
            lexer.filenames().iter().any(|pattern| {
                Pattern::new(pattern)
                    .map(|p| p.matches(file_name))
                    .unwrap_or(false)
            })
        })
    }

    pub fn for_mimetype(&self, mimetype: &str) -> Option<&Lexer> {
        self.lexers
            .iter()
            .rev()
            .find(|lexer| lexer.mimetypes().iter().any(|m| *m == mimetype))
    }

    /// The lexer whose content analyser scores `text` highest, if any scores
    /// above zero.
    pub fn guess(&self, text: &str) -> Option<&Lexer> {
        self.lexers
            .iter()
            .map(|lexer| (lexer.analyse_text(text), lexer))
            .filter(|(score, _)| *score > 0.0)
            .fold(None, |best: Option<(f32, &Lexer)>, (score, lexer)| match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, lexer)),
            })
            .map(|(_, lexer)| lexer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lexer> {
        self.lexers.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.lexers.iter().map(|lexer| lexer.name()).collect()
    }
}
