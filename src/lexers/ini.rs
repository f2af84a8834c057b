//! INI-style configuration files (`omnetpp.ini`).

use crate::lexer::{groups, rule, Grammar, Group};
use crate::token::TokenKind::*;

/// A file whose first line is a `[section]` header is very likely INI.
fn analyse(text: &str) -> f32 {
    let Some(npos) = text.find('\n') else {
        return 0.0;
    };
    if npos < 3 {
        return 0.0;
    }
    let bytes = text.as_bytes();
    if bytes[0] == b'[' && bytes[npos - 1] == b']' {
        1.0
    } else {
        0.0
    }
}

pub fn grammar() -> Grammar {
    Grammar::new("ini")
        .aliases(&["cfg", "dosini"])
        .filenames(&["*.ini"])
        .mimetypes(&["text/x-ini"])
        .analyser(analyse)
        .state(
            "root",
            vec![
                rule(r"[;#].*$", CommentSingle),
                rule(r"\s+", Text),
                rule(r"\[.*?\]", Keyword),
                groups(
                    r"(.*?)([ \t]*)(=)([ \t]*)([^#\n]*(?:\n[ \t].+)*)",
                    &[
                        Group::Token(NameAttribute),
                        Group::Token(Text),
                        Group::Token(Operator),
                        Group::Token(Text),
                        Group::Token(String),
                    ],
                ),
            ],
        )
}
