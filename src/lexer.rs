//! Ordered-rule regex scanner with a mode stack.
//!
//! A [`Grammar`] is a table of named states, each an ordered list of rules.
//! [`Lexer::compile`] resolves `include`/`inherit` markers, compiles the
//! patterns and lays the states out in an arena; scanning keeps a stack of
//! indices into that arena. Within a state the first applicable rule wins.

use indexmap::IndexMap;
use log::trace;
use regex::{Captures, Regex};
use std::collections::{HashMap, VecDeque};

use crate::error::LexerError;
use crate::token::{Token, TokenKind};

/// Index of a compiled state in the lexer's state arena.
pub type StateId = usize;

/// Callback matcher for constructs a regex cannot express. Returns the
/// consecutive `(kind, byte length)` segments matched at the start of the
/// input, or `None`.
pub type Scanner = fn(&str) -> Option<Vec<(TokenKind, usize)>>;

/// Scores how likely a text is written in a lexer's language, in `0.0..=1.0`.
pub type Analyser = fn(&str) -> f32;

/// What a matched rule emits.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The whole match as one token.
    Token(TokenKind),
    /// One entry per capture group, in group order.
    ByGroups(Vec<Group>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Group {
    Token(TokenKind),
    /// Re-scan the group text with the same lexer, starting from `root`.
    UsingThis,
}

/// Mode stack change applied after a rule fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Next {
    Stay,
    Push(Vec<&'static str>),
    PushCurrent,
    /// Pop this many states; the bottom state is never popped.
    Pop(usize),
}

/// Context conditions checked against the full input around a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    LineStart,
    PrecededBy(char),
    FollowedBy(char),
    NotFollowedBy(char),
}

impl Guard {
    fn admits_start(self, text: &str, start: usize) -> bool {
        match self {
            Guard::LineStart => start == 0 || text.as_bytes()[start - 1] == b'\n',
            Guard::PrecededBy(c) => text[..start].ends_with(c),
            Guard::FollowedBy(_) | Guard::NotFollowedBy(_) => true,
        }
    }

    fn admits_end(self, text: &str, end: usize) -> bool {
        match self {
            Guard::FollowedBy(c) => text[end..].starts_with(c),
            Guard::NotFollowedBy(c) => !text[end..].starts_with(c),
            Guard::LineStart | Guard::PrecededBy(_) => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: String,
    pub action: Action,
    pub next: Next,
    pub guard: Option<Guard>,
}

/// An entry in a state's rule list.
#[derive(Debug, Clone)]
pub enum RuleDef {
    Match(MatchRule),
    Scan { scanner: Scanner, next: Next },
    /// Change state without consuming input.
    Default(Next),
    /// Splice the rules of another state of the same grammar.
    Include(&'static str),
    /// Splice the parent grammar's rules for this state.
    Inherit,
}

impl RuleDef {
    fn with_next(self, next: Next) -> Self {
        match self {
            RuleDef::Match(rule) => RuleDef::Match(MatchRule { next, ..rule }),
            RuleDef::Scan { scanner, .. } => RuleDef::Scan { scanner, next },
            RuleDef::Default(_) => RuleDef::Default(next),
            other => other,
        }
    }

    pub fn push(self, state: &'static str) -> Self {
        self.with_next(Next::Push(vec![state]))
    }

    pub fn push_all(self, states: &[&'static str]) -> Self {
        self.with_next(Next::Push(states.to_vec()))
    }

    pub fn push_current(self) -> Self {
        self.with_next(Next::PushCurrent)
    }

    pub fn pop(self) -> Self {
        self.with_next(Next::Pop(1))
    }

    pub fn pop_n(self, n: usize) -> Self {
        self.with_next(Next::Pop(n))
    }

    pub fn guard(self, guard: Guard) -> Self {
        match self {
            RuleDef::Match(rule) => RuleDef::Match(MatchRule {
                guard: Some(guard),
                ..rule
            }),
            other => other,
        }
    }
}

/// Emit the whole match of `pattern` as `kind`.
pub fn rule(pattern: impl Into<String>, kind: TokenKind) -> RuleDef {
    RuleDef::Match(MatchRule {
        pattern: pattern.into(),
        action: Action::Token(kind),
        next: Next::Stay,
        guard: None,
    })
}

/// Emit one token per capture group of `pattern`.
pub fn groups(pattern: impl Into<String>, groups: &[Group]) -> RuleDef {
    RuleDef::Match(MatchRule {
        pattern: pattern.into(),
        action: Action::ByGroups(groups.to_vec()),
        next: Next::Stay,
        guard: None,
    })
}

pub fn scan(scanner: Scanner) -> RuleDef {
    RuleDef::Scan {
        scanner,
        next: Next::Stay,
    }
}

pub fn include(state: &'static str) -> RuleDef {
    RuleDef::Include(state)
}

pub fn inherit() -> RuleDef {
    RuleDef::Inherit
}

/// Enter `state` without consuming input.
pub fn default_to(state: &'static str) -> RuleDef {
    RuleDef::Default(Next::Push(vec![state]))
}

/// Leave the current state without consuming input.
pub fn default_pop() -> RuleDef {
    RuleDef::Default(Next::Pop(1))
}

/// Alternation of literal words, longest first so that a word is never
/// shadowed by one of its prefixes.
pub fn words(words: &[&str], prefix: &str, suffix: &str) -> String {
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    sorted.dedup();
    let alternatives: Vec<String> = sorted.iter().map(|w| regex::escape(w)).collect();
    format!("{}(?:{}){}", prefix, alternatives.join("|"), suffix)
}

/// Declarative description of a lexer.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub name: &'static str,
    pub aliases: Vec<&'static str>,
    pub filenames: Vec<&'static str>,
    pub mimetypes: Vec<&'static str>,
    pub states: IndexMap<&'static str, Vec<RuleDef>>,
    pub analyser: Option<Analyser>,
}

impl Grammar {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            aliases: vec![name],
            filenames: Vec::new(),
            mimetypes: Vec::new(),
            states: IndexMap::new(),
            analyser: None,
        }
    }

    pub fn aliases(mut self, aliases: &[&'static str]) -> Self {
        for &alias in aliases {
            if !self.aliases.contains(&alias) {
                self.aliases.push(alias);
            }
        }
        self
    }

    pub fn filenames(mut self, filenames: &[&'static str]) -> Self {
        self.filenames = filenames.to_vec();
        self
    }

    pub fn mimetypes(mut self, mimetypes: &[&'static str]) -> Self {
        self.mimetypes = mimetypes.to_vec();
        self
    }

    pub fn analyser(mut self, analyser: Analyser) -> Self {
        self.analyser = Some(analyser);
        self
    }

    pub fn state(mut self, name: &'static str, rules: Vec<RuleDef>) -> Self {
        self.states.insert(name, rules);
        self
    }

    /// Derive a grammar from `parent`. Child states replace the parent's
    /// states of the same name; an `inherit` marker splices the parent's rules
    /// at its position. States the child does not mention are kept as is.
    pub fn extend(mut self, parent: &Grammar) -> Grammar {
        let mut states = parent.states.clone();
        for (name, rules) in self.states.drain(..) {
            let inherited = parent.states.get(name).cloned().unwrap_or_default();
            let mut merged = Vec::with_capacity(rules.len() + inherited.len());
            for rule in rules {
                match rule {
                    RuleDef::Inherit => merged.extend(inherited.iter().cloned()),
                    other => merged.push(other),
                }
            }
            states.insert(name, merged);
        }
        if self.analyser.is_none() {
            self.analyser = parent.analyser;
        }
        Grammar { states, ..self }
    }
}

#[derive(Debug)]
enum Matcher {
    Pattern(Regex),
    Scan(Scanner),
    Always,
}

#[derive(Debug, Clone, PartialEq)]
enum Transition {
    Stay,
    Push(Vec<StateId>),
    PushCurrent,
    Pop(usize),
}

#[derive(Debug)]
struct Rule {
    matcher: Matcher,
    action: Action,
    next: Transition,
    guard: Option<Guard>,
}

#[derive(Debug)]
struct State {
    name: &'static str,
    rules: Vec<Rule>,
}

/// A compiled, immutable lexer.
#[derive(Debug)]
pub struct Lexer {
    name: &'static str,
    aliases: Vec<&'static str>,
    filenames: Vec<&'static str>,
    mimetypes: Vec<&'static str>,
    states: Vec<State>,
    index: HashMap<&'static str, StateId>,
    root: StateId,
    analyser: Option<Analyser>,
}

impl Lexer {
    pub fn compile(grammar: Grammar) -> Result<Self, LexerError> {
        let lexer_name = grammar.name;
        let index: HashMap<&'static str, StateId> = grammar
            .states
            .keys()
            .enumerate()
            .map(|(id, name)| (*name, id))
            .collect();

        let root = *index.get("root").ok_or_else(|| LexerError::UnknownState {
            lexer: lexer_name.to_string(),
            state: "root".to_string(),
        })?;

        let mut regex_cache: HashMap<String, Regex> = HashMap::new();
        let mut states = Vec::with_capacity(grammar.states.len());

        for &name in grammar.states.keys() {
            let mut visiting = Vec::new();
            let flat = flatten(&grammar, name, &mut visiting)?;
            let mut rules = Vec::with_capacity(flat.len());

            for def in flat {
                let rule = match def {
                    RuleDef::Match(m) => {
                        let regex = match regex_cache.get(&m.pattern) {
                            Some(regex) => regex.clone(),
                            None => {
                                let regex = Regex::new(&format!(r"\A(?m:{})", m.pattern))
                                    .map_err(|source| LexerError::Pattern {
                                        lexer: lexer_name.to_string(),
                                        state: name.to_string(),
                                        source,
                                    })?;
                                regex_cache.insert(m.pattern.clone(), regex.clone());
                                regex
                            }
                        };
                        Rule {
                            matcher: Matcher::Pattern(regex),
                            action: m.action.clone(),
                            next: resolve_next(lexer_name, &index, &m.next)?,
                            guard: m.guard,
                        }
                    }
                    RuleDef::Scan { scanner, next } => Rule {
                        matcher: Matcher::Scan(*scanner),
                        action: Action::ByGroups(Vec::new()),
                        next: resolve_next(lexer_name, &index, next)?,
                        guard: None,
                    },
                    RuleDef::Default(next) => Rule {
                        matcher: Matcher::Always,
                        action: Action::ByGroups(Vec::new()),
                        next: resolve_next(lexer_name, &index, next)?,
                        guard: None,
                    },
                    RuleDef::Include(_) => unreachable!("includes are flattened"),
                    RuleDef::Inherit => {
                        return Err(LexerError::NothingToInherit {
                            lexer: lexer_name.to_string(),
                            state: name.to_string(),
                        })
                    }
                };
                rules.push(rule);
            }

            states.push(State { name, rules });
        }

        Ok(Self {
            name: grammar.name,
            aliases: grammar.aliases,
            filenames: grammar.filenames,
            mimetypes: grammar.mimetypes,
            states,
            index,
            root,
            analyser: grammar.analyser,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn aliases(&self) -> &[&'static str] {
        &self.aliases
    }

    pub fn filenames(&self) -> &[&'static str] {
        &self.filenames
    }

    pub fn mimetypes(&self) -> &[&'static str] {
        &self.mimetypes
    }

    pub fn state_names(&self) -> Vec<&'static str> {
        self.states.iter().map(|s| s.name).collect()
    }

    /// Likelihood that `text` is in this lexer's language.
    pub fn analyse_text(&self, text: &str) -> f32 {
        self.analyser
            .map(|analyse| analyse(text).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    /// Scan `text` starting in the `root` state.
    pub fn tokens<'l, 't>(&'l self, text: &'t str) -> Tokens<'l, 't> {
        Tokens::new(self, text, vec![self.root])
    }

    /// Scan `text` starting with the given state stack (bottom first).
    pub fn tokens_from<'l, 't>(
        &'l self,
        text: &'t str,
        start: &[&str],
    ) -> Result<Tokens<'l, 't>, LexerError> {
        if start.is_empty() {
            return Ok(self.tokens(text));
        }
        let stack = start
            .iter()
            .map(|name| {
                self.index
                    .get(name)
                    .copied()
                    .ok_or_else(|| LexerError::UnknownState {
                        lexer: self.name.to_string(),
                        state: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tokens::new(self, text, stack))
    }

    pub fn tokenize<'t>(&self, text: &'t str) -> Vec<Token<'t>> {
        self.tokens(text).collect()
    }
}

fn flatten<'g>(
    grammar: &'g Grammar,
    name: &'static str,
    visiting: &mut Vec<&'static str>,
) -> Result<Vec<&'g RuleDef>, LexerError> {
    if visiting.contains(&name) {
        return Err(LexerError::IncludeCycle {
            lexer: grammar.name.to_string(),
            state: name.to_string(),
        });
    }
    let rules = grammar
        .states
        .get(name)
        .ok_or_else(|| LexerError::UnknownState {
            lexer: grammar.name.to_string(),
            state: name.to_string(),
        })?;

    visiting.push(name);
    let mut flat = Vec::with_capacity(rules.len());
    for def in rules {
        match def {
            RuleDef::Include(other) => flat.extend(flatten(grammar, other, visiting)?),
            other => flat.push(other),
        }
    }
    visiting.pop();
    Ok(flat)
}

fn resolve_next(
    lexer: &str,
    index: &HashMap<&'static str, StateId>,
    next: &Next,
) -> Result<Transition, LexerError> {
    Ok(match next {
        Next::Stay => Transition::Stay,
        Next::PushCurrent => Transition::PushCurrent,
        Next::Pop(n) => Transition::Pop(*n),
        Next::Push(names) => Transition::Push(
            names
                .iter()
                .map(|name| {
                    index
                        .get(name)
                        .copied()
                        .ok_or_else(|| LexerError::UnknownState {
                            lexer: lexer.to_string(),
                            state: name.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

/// Lazy token stream over one input.
pub struct Tokens<'l, 't> {
    lexer: &'l Lexer,
    text: &'t str,
    pos: usize,
    stack: Vec<StateId>,
    initial: Vec<StateId>,
    pending: VecDeque<Token<'t>>,
}

impl<'l, 't> Tokens<'l, 't> {
    fn new(lexer: &'l Lexer, text: &'t str, stack: Vec<StateId>) -> Self {
        Self {
            lexer,
            text,
            pos: 0,
            initial: stack.clone(),
            stack,
            pending: VecDeque::new(),
        }
    }

    /// Names of the states currently on the stack, bottom first.
    pub fn state_stack(&self) -> Vec<&'static str> {
        self.stack
            .iter()
            .map(|id| self.lexer.states[*id].name)
            .collect()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn top(&self) -> StateId {
        self.stack[self.stack.len() - 1]
    }

    fn transition(&mut self, next: &Transition) {
        match next {
            Transition::Stay => {}
            Transition::Push(ids) => self.stack.extend_from_slice(ids),
            Transition::PushCurrent => self.stack.push(self.top()),
            Transition::Pop(n) => {
                let keep = self.stack.len().saturating_sub(*n).max(1);
                self.stack.truncate(keep);
            }
        }
    }

    /// Whether applying `next` would leave a different stack behind.
    fn moves(&self, next: &Transition) -> bool {
        match next {
            Transition::Stay => false,
            Transition::Push(ids) => !ids.is_empty(),
            Transition::PushCurrent => true,
            Transition::Pop(n) => *n > 0 && self.stack.len() > 1,
        }
    }

    fn emit(&mut self, action: &Action, caps: &Captures<'t>, base: usize) {
        match action {
            Action::Token(kind) => {
                if let Some(m) = caps.get(0) {
                    if !m.is_empty() {
                        self.pending
                            .push_back(Token::new(*kind, m.as_str(), base + m.start()));
                    }
                }
            }
            Action::ByGroups(groups) => {
                for (i, group) in groups.iter().enumerate() {
                    let Some(m) = caps.get(i + 1) else { continue };
                    if m.is_empty() {
                        continue;
                    }
                    let offset = base + m.start();
                    match group {
                        Group::Token(kind) => {
                            self.pending
                                .push_back(Token::new(*kind, m.as_str(), offset));
                        }
                        Group::UsingThis => {
                            for token in self.lexer.tokens(m.as_str()) {
                                self.pending.push_back(Token {
                                    offset: offset + token.offset,
                                    ..token
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    /// Apply the first applicable rule of the current state, or the
    /// fallback when none applies.
    fn step(&mut self) {
        let lexer = self.lexer;
        let text = self.text;
        let pos = self.pos;
        let state = &lexer.states[self.top()];

        for rule in &state.rules {
            if let Some(guard) = rule.guard {
                if !guard.admits_start(text, pos) {
                    continue;
                }
            }
            match &rule.matcher {
                // A rule that consumes nothing must change the stack, or it
                // would fire again at the same position forever.
                Matcher::Always => {
                    if !self.moves(&rule.next) {
                        continue;
                    }
                    self.transition(&rule.next);
                    return;
                }
                Matcher::Scan(scanner) => {
                    let Some(segments) = scanner(&text[pos..]) else {
                        continue;
                    };
                    let mut offset = pos;
                    for (kind, len) in segments {
                        let end = (offset + len).min(text.len());
                        if end > offset {
                            self.pending
                                .push_back(Token::new(kind, &text[offset..end], offset));
                        }
                        offset = end;
                    }
                    if offset == pos && !self.moves(&rule.next) {
                        continue;
                    }
                    self.pos = offset;
                    self.transition(&rule.next);
                    return;
                }
                Matcher::Pattern(regex) => {
                    let rest: &'t str = &text[pos..];
                    let Some(caps) = regex.captures(rest) else {
                        continue;
                    };
                    let end = caps.get(0).map_or(0, |m| m.end());
                    if let Some(guard) = rule.guard {
                        if !guard.admits_end(text, pos + end) {
                            continue;
                        }
                    }
                    if end == 0 && !self.moves(&rule.next) {
                        continue;
                    }
                    self.emit(&rule.action, &caps, pos);
                    self.pos = pos + end;
                    self.transition(&rule.next);
                    return;
                }
            }
        }

        // Nothing applies: a newline resets the stack, anything else is an error.
        let Some(ch) = text[pos..].chars().next() else {
            return;
        };
        let end = pos + ch.len_utf8();
        if ch == '\n' {
            self.stack = self.initial.clone();
            self.pending
                .push_back(Token::new(TokenKind::Text, &text[pos..end], pos));
        } else {
            trace!("{}: no rule for {:?} at {} in state {}", lexer.name, ch, pos, state.name);
            self.pending
                .push_back(Token::new(TokenKind::Error, &text[pos..end], pos));
        }
        self.pos = end;
    }
}

impl<'l, 't> Iterator for Tokens<'l, 't> {
    type Item = Token<'t>;

    fn next(&mut self) -> Option<Token<'t>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.pos >= self.text.len() {
                return None;
            }
            self.step();
        }
    }
}
