//! C and C++ grammars. MSG files embed C++ and derive from the C++ grammar.

use crate::lexer::{
    default_pop, default_to, groups, include, inherit, rule, scan, words, Grammar, Group, Guard,
};
use crate::lexers::ned::{comment_rules, function_rules, quote_rules, string_rules};
use crate::token::TokenKind::{self, *};

/// At most one `/* */` comment between optional whitespace.
const WS1: &str = r"\s*(?:/[*].*?[*]/\s*)?";

const C_KEYWORDS: &[&str] = &[
    "asm", "auto", "break", "case", "const", "continue", "default", "do", "else", "enum",
    "extern", "for", "goto", "if", "register", "restricted", "return", "sizeof", "static",
    "struct", "switch", "typedef", "union", "volatile", "while",
];

const C_RESERVED: &[&str] = &[
    "inline", "_inline", "__inline", "naked", "restrict", "thread", "typename",
];

const MICROSOFT_RESERVED: &[&str] = &[
    "asm",
    "int8",
    "based",
    "except",
    "int16",
    "stdcall",
    "cdecl",
    "fastcall",
    "int32",
    "declspec",
    "finally",
    "int64",
    "try",
    "leave",
    "wchar_t",
    "w64",
    "unaligned",
    "raise",
    "noop",
    "identifier",
    "forceinline",
    "assume",
];

const CPP_KEYWORDS: &[&str] = &[
    "catch",
    "const_cast",
    "delete",
    "dynamic_cast",
    "explicit",
    "export",
    "friend",
    "mutable",
    "namespace",
    "new",
    "operator",
    "private",
    "protected",
    "public",
    "reinterpret_cast",
    "restrict",
    "static_cast",
    "template",
    "this",
    "throw",
    "throws",
    "try",
    "typeid",
    "typename",
    "using",
    "virtual",
    "constexpr",
    "nullptr",
    "decltype",
    "thread_local",
    "alignas",
    "alignof",
    "static_assert",
    "noexcept",
    "override",
    "final",
];

pub fn c_grammar() -> Grammar {
    let mut whitespace = vec![
        rule(r"#if\s+0", CommentPreproc)
            .guard(Guard::LineStart)
            .push("if0"),
        rule("#", CommentPreproc).guard(Guard::LineStart).push("macro"),
        groups(
            format!(r"({})(#if\s+0)", WS1),
            &[Group::UsingThis, Group::Token(CommentPreproc)],
        )
        .guard(Guard::LineStart)
        .push("if0"),
        groups(
            format!("({})(#)", WS1),
            &[Group::UsingThis, Group::Token(CommentPreproc)],
        )
        .guard(Guard::LineStart)
        .push("macro"),
    ];
    whitespace.extend(comment_rules());

    let mut statements = quote_rules();
    statements.extend([
        rule(r"(\d+\.\d*|\.\d+|\d+)[eE][+-]?\d+[LlUu]*", NumberFloat),
        rule(r"(\d+\.\d*|\.\d+|\d+[fF])[fF]?", NumberFloat),
        rule(r"0x[0-9a-fA-F]+[LlUu]*", NumberHex),
        rule(r"0[0-7]+[LlUu]*", NumberOct),
        rule(r"\d+[LlUu]*", NumberInteger),
        rule(r"\*/", Error),
        rule(r"[~!%^&*+=|?:<>/-]", Operator),
        rule(r"[()\[\],.]", Punctuation),
        rule(words(C_KEYWORDS, "", r"\b"), Keyword),
        rule(
            r"(bool|int|long|float|short|double|char|unsigned|signed|void)\b",
            KeywordType,
        ),
        rule(words(C_RESERVED, "", r"\b"), KeywordReserved),
        rule(r"(__m(128i|128d|128|64))\b", KeywordReserved),
        rule(words(MICROSOFT_RESERVED, "__", r"\b"), KeywordReserved),
        rule(r"(true|false|NULL)\b", NameBuiltin),
        groups(
            r"([a-zA-Z_]\w*)(\s*)(:)",
            &[
                Group::Token(NameLabel),
                Group::Token(Text),
                Group::Token(Punctuation),
            ],
        )
        .guard(Guard::NotFollowedBy(':')),
        rule(r"[a-zA-Z_]\w*", Name),
    ]);

    let mut root = vec![include("whitespace")];
    root.extend(function_rules());
    root.push(default_to("statement"));

    Grammar::new("c")
        .filenames(&["*.c", "*.h", "*.idc"])
        .mimetypes(&["text/x-chdr", "text/x-csrc"])
        .state("whitespace", whitespace)
        .state("statements", statements)
        .state("root", root)
        .state(
            "statement",
            vec![
                include("whitespace"),
                include("statements"),
                rule("[{}]", Punctuation),
                rule(";", Punctuation).pop(),
            ],
        )
        .state(
            "function",
            vec![
                include("whitespace"),
                include("statements"),
                rule(";", Punctuation),
                rule(r"\{", Punctuation).push_current(),
                rule(r"\}", Punctuation).pop(),
            ],
        )
        .state("string", string_rules())
        .state(
            "macro",
            vec![
                groups(
                    format!(r"(include)({})([^\n]+)", WS1),
                    &[
                        Group::Token(CommentPreproc),
                        Group::Token(Text),
                        Group::Token(CommentPreprocFile),
                    ],
                ),
                rule(r"[^/\n]+", CommentPreproc),
                rule(r"/[*][\s\S]*?[*]/", CommentMultiline),
                rule(r"//.*?\n", CommentSingle).pop(),
                rule("/", CommentPreproc),
                rule(r"\n", CommentPreproc).guard(Guard::PrecededBy('\\')),
                rule(r"\n", CommentPreproc).pop(),
            ],
        )
        .state(
            "if0",
            vec![
                rule(r"\s*#if(?:[^\n]*[^\\\n])?\n", CommentPreproc)
                    .guard(Guard::LineStart)
                    .push_current(),
                rule(r"\s*#el(?:se|if).*\n", CommentPreproc)
                    .guard(Guard::LineStart)
                    .pop(),
                rule(r"\s*#endif(?:[^\n]*[^\\\n])?\n", CommentPreproc)
                    .guard(Guard::LineStart)
                    .pop(),
                rule(r".*?\n", Comment),
                rule(r".+\z", Comment),
            ],
        )
}

/// `R"delim( ... )delim"`: affix, quote, delimiter, paren, body, closing
/// paren with delimiter, quote.
fn raw_string(text: &str) -> Option<Vec<(TokenKind, usize)>> {
    let rest = text.strip_prefix("R\"")?;
    let open = rest.find('(')?;
    let delimiter = &rest[..open];
    if delimiter.len() > 16
        || delimiter
            .chars()
            .any(|c| c == '\\' || c == ')' || c.is_whitespace())
    {
        return None;
    }
    let body_start = open + 1;
    let closing = format!("){}\"", delimiter);
    let body_len = rest[body_start..].find(&closing)?;
    Some(vec![
        (StringAffix, 1),
        (String, 1),
        (StringDelimiter, delimiter.len()),
        (StringDelimiter, 1),
        (String, body_len),
        (StringDelimiter, 1 + delimiter.len()),
        (String, 1),
    ])
}

pub fn cpp_grammar() -> Grammar {
    Grammar::new("cpp")
        .aliases(&["c++"])
        .filenames(&[
            "*.cpp", "*.hpp", "*.c++", "*.h++", "*.cc", "*.hh", "*.cxx", "*.hxx",
        ])
        .mimetypes(&["text/x-c++hdr", "text/x-c++src"])
        .state(
            "statements",
            vec![
                rule(words(CPP_KEYWORDS, "", r"\b"), Keyword),
                rule(r"char(16_t|32_t)\b", KeywordType),
                groups(r"(class)(\s+)", &[Group::Token(Keyword), Group::Token(Text)])
                    .push("classname"),
                scan(raw_string),
                groups(
                    r#"(u8|u|U)(")"#,
                    &[Group::Token(StringAffix), Group::Token(String)],
                )
                .push("string"),
                inherit(),
            ],
        )
        .state(
            "classname",
            vec![
                rule(r"[a-zA-Z_]\w*", NameClass).pop(),
                // template specification
                rule(r"\s*", Text).guard(Guard::FollowedBy('>')).pop(),
                default_pop(),
            ],
        )
        .extend(&c_grammar())
}
