//! NED, the network description language.

use crate::lexer::{default_to, groups, include, rule, words, Grammar, Group};
use crate::token::TokenKind::*;

const COMPONENT_KEYWORDS: &[&str] = &[
    "channel",
    "channelinterface",
    "simple",
    "module",
    "network",
    "moduleinterface",
];

const SECTION_KEYWORDS: &[&str] = &["parameters", "gates", "types", "submodules", "connections"];

const KEYWORDS: &[&str] = &[
    "volatile",
    "allowunconnected",
    "extends",
    "for",
    "if",
    "import",
    "like",
    "package",
    "property",
];

const EXPRESSION_KEYWORDS: &[&str] = &[
    "sizeof", "const", "default", "ask", "this", "index", "typename", "xmldoc",
];

const BUILTIN_FUNCTIONS: &[&str] = &[
    "acos",
    "asin",
    "atan",
    "atan2",
    "bernoulli",
    "beta",
    "binomial",
    "cauchy",
    "ceil",
    "chi_square",
    "cos",
    "erlang_k",
    "exp",
    "exponential",
    "fabs",
    "floor",
    "fmod",
    "gamma_d",
    "genk_exponential",
    "genk_intuniform",
    "genk_normal",
    "genk_truncnormal",
    "genk_uniform",
    "geometric",
    "hypergeometric",
    "hypot",
    "intuniform",
    "log",
    "log10",
    "lognormal",
    "max",
    "min",
    "negbinomial",
    "normal",
    "pareto_shifted",
    "poisson",
    "pow",
    "simTime",
    "sin",
    "sqrt",
    "student_t",
    "tan",
    "triang",
    "truncnormal",
    "uniform",
    "weibull",
    "xml",
    "xmldoc",
];

/// Return type, name, signature, trailer and opening brace of a
/// function-like header. Shared with the C family.
pub(crate) const FUNCTION_HEAD: &str = concat!(
    r"((?:[\w*\s])+?(?:\s|[*]))",
    r"([a-zA-Z_]\w*)",
    r"(\s*\([^;]*?\))",
);

pub(crate) fn comment_rules() -> Vec<crate::lexer::RuleDef> {
    vec![
        rule(r"\n", Text),
        rule(r"\s+", Text),
        rule(r"\\\n", Text),
        rule(r"//(\n|[\w\W]*?[^\\]\n)", CommentSingle),
        // Last line without a newline.
        rule(r"//[^\n]*\z", CommentSingle),
        rule(r"/(\\\n)?[*][\w\W]*?[*](\\\n)?/", CommentMultiline),
        // Open until end of input.
        rule(r"/(\\\n)?[*][\w\W]*", CommentMultiline),
    ]
}

pub(crate) fn string_rules() -> Vec<crate::lexer::RuleDef> {
    vec![
        rule(r#"""#, String).pop(),
        rule(
            r#"\\([\\abfnrtv"']|x[a-fA-F0-9]{2,4}|u[a-fA-F0-9]{4}|U[a-fA-F0-9]{8}|[0-7]{1,3})"#,
            StringEscape,
        ),
        rule(r#"[^\\"\n]+"#, String),
        rule(r"\\\n", String),
        rule(r"\\", String),
    ]
}

pub(crate) fn quote_rules() -> Vec<crate::lexer::RuleDef> {
    vec![
        groups(
            r#"(L?)(")"#,
            &[Group::Token(StringAffix), Group::Token(String)],
        )
        .push("string"),
        groups(
            r"(L?)(')(\\.|\\[0-7]{1,3}|\\x[a-fA-F0-9]{1,2}|[^\\'\n])(')",
            &[
                Group::Token(StringAffix),
                Group::Token(StringChar),
                Group::Token(StringChar),
                Group::Token(StringChar),
            ],
        ),
    ]
}

pub(crate) fn function_rules() -> Vec<crate::lexer::RuleDef> {
    let using = &[
        Group::UsingThis,
        Group::Token(NameFunction),
        Group::UsingThis,
        Group::UsingThis,
        Group::Token(Punctuation),
    ];
    vec![
        groups(format!(r"{}([^;{{]*)(\{{)", FUNCTION_HEAD), using).push("function"),
        groups(format!(r"{}([^;]*)(;)", FUNCTION_HEAD), using),
    ]
}

pub fn grammar() -> Grammar {
    let mut statements = quote_rules();
    statements.extend([
        rule(r"(true|false)\b", NameBuiltin),
        rule(r"(<-->|-->|<--|\.\.)", Keyword),
        rule(r"(bool|double|int|xml)\b", KeywordType),
        rule(r"(inout|input|output)\b", KeywordType),
        rule(r"(\d+\.\d*|\.\d+|\d+)[eE][+-]?\d+[LlUu]*", NumberFloat),
        rule(r"(\d+\.\d*|\.\d+|\d+[fF])[fF]?", NumberFloat),
        rule(r"0x[0-9a-fA-F]+[LlUu]*", NumberHex),
        rule(r"#[0-9a-fA-F]+[LlUu]*", NumberHex),
        rule(r"0[0-7]+[LlUu]*", NumberOct),
        rule(r"\d+[LlUu]*", NumberInteger),
        rule(r"\*/", Error),
        rule(r"[~!%^&*+=|?:<>/-]", Operator),
        rule(r"[()\[\],.]", Punctuation),
        rule(words(COMPONENT_KEYWORDS, "", r"\b"), Keyword),
        rule(words(SECTION_KEYWORDS, "", r"\b"), Keyword),
        rule(words(KEYWORDS, "", r"\b"), Keyword),
        rule(words(EXPRESSION_KEYWORDS, "", r"\b"), Keyword),
        rule(words(BUILTIN_FUNCTIONS, "", r"\b"), NameBuiltin),
        rule(r"@[a-zA-Z_]\w*", NameBuiltin),
        rule(r"[a-zA-Z_]\w*", Name),
    ]);

    let mut root = vec![include("whitespace")];
    root.extend(function_rules());
    root.push(default_to("statement"));

    Grammar::new("ned")
        .filenames(&["*.ned"])
        .mimetypes(&["text/x-ned"])
        .state("whitespace", comment_rules())
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::token::{Token, TokenKind};

    fn lexer() -> Lexer {
        Lexer::compile(grammar()).unwrap()
    }

    fn significant<'t>(tokens: &[Token<'t>]) -> Vec<(TokenKind, &'t str)> {
        tokens
            .iter()
            .filter(|t| t.kind != Text)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_simple_module_declaration() {
        let lexer = lexer();
        let tokens = lexer.tokenize("simple Foo { parameters: int x = 5; }");
        assert_eq!(
            significant(&tokens),
            vec![
                (Keyword, "simple"),
                (Name, "Foo"),
                (Punctuation, "{"),
                (Keyword, "parameters"),
                (Operator, ":"),
                (KeywordType, "int"),
                (Name, "x"),
                (Operator, "="),
                (NumberInteger, "5"),
                (Punctuation, ";"),
                (Punctuation, "}"),
            ]
        );
    }

    #[test]
    fn test_connections_and_builtins() {
        let lexer = lexer();
        let src = "connections allowunconnected:\n    a.out++ --> { delay = uniform(1ms, 2ms); } --> b.in[0];\n";
        let tokens = lexer.tokenize(src);
        let sig = significant(&tokens);
        assert!(sig.contains(&(Keyword, "allowunconnected")));
        assert!(sig.contains(&(Keyword, "-->")));
        assert!(sig.contains(&(NameBuiltin, "uniform")));
        assert!(sig.contains(&(NumberInteger, "0")));
    }

    #[test]
    fn test_properties_and_numbers() {
        let lexer = lexer();
        let tokens = lexer.tokenize("@display(\"i=block/app\"); double d = 1.5e3; int h = 0x1F; int c = #ff;");
        let sig = significant(&tokens);
        assert_eq!(sig[0], (NameBuiltin, "@display"));
        assert!(sig.contains(&(String, "i=block/app")));
        assert!(sig.contains(&(NumberFloat, "1.5e3")));
        assert!(sig.contains(&(NumberHex, "0x1F")));
        assert!(sig.contains(&(NumberHex, "#ff")));
    }

    #[test]
    fn test_string_escape() {
        let lexer = lexer();
        let tokens = lexer.tokenize(r#"s = "a\nb";"#);
        let sig = significant(&tokens);
        assert!(sig.contains(&(StringEscape, r"\n")));
    }

    #[test]
    fn test_comments() {
        let lexer = lexer();
        let tokens = lexer.tokenize("// line\n/* block */ network N {}\n");
        assert_eq!(tokens[0], Token::new(CommentSingle, "// line\n", 0));
        assert_eq!(tokens[1].kind, CommentMultiline);
        assert_eq!(tokens[1].text, "/* block */");
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let lexer = lexer();
        let tokens = lexer.tokenize("module M; /* never\nclosed");
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, CommentMultiline);
        assert_eq!(last.text, "/* never\nclosed");
    }

    #[test]
    fn test_trailing_line_comment_without_newline() {
        let lexer = lexer();
        let tokens = lexer.tokenize("int x; // done");
        assert_eq!(tokens.last().unwrap().kind, CommentSingle);
    }

    #[test]
    fn test_stray_comment_end_is_error() {
        let lexer = lexer();
        let tokens = lexer.tokenize("x */ y;");
        assert!(significant(&tokens).contains(&(Error, "*/")));
    }

    #[test]
    fn test_function_like_header_enters_function_state() {
        let lexer = lexer();
        let mut tokens = lexer.tokens("int f(int a) { return a; }\n");
        let sig: Vec<_> = tokens.by_ref().filter(|t| t.kind != Text).collect();
        assert!(sig.iter().any(|t| t.kind == NameFunction && t.text == "f"));
        assert_eq!(tokens.state_stack(), vec!["root"]);
    }
}
