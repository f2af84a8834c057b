//! Grammars for the languages highlighted in the INET documentation.
//!
//! - `ned`: network description files
//! - `msg`: message definitions (C++ with extra keywords)
//! - `ini`: simulation configuration files
//! - `c`, `cpp`: the C family base that `msg` extends

pub mod c_family;
pub mod ini;
pub mod msg;
pub mod ned;

use crate::lexer::Grammar;

/// All grammars registered by default, in registration order.
pub fn builtin_grammars() -> Vec<Grammar> {
    vec![
        ned::grammar(),
        msg::grammar(),
        ini::grammar(),
        c_family::c_grammar(),
        c_family::cpp_grammar(),
    ]
}
