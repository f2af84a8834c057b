//! MSG, the message definition language. Message files are C++ with a few
//! extra keywords, so the grammar extends the C++ one.

use crate::lexer::{inherit, rule, words, Grammar};
use crate::lexers::c_family::cpp_grammar;
use crate::token::TokenKind::*;

const DECLARATION_KEYWORDS: &[&str] = &[
    "import",
    "cplusplus",
    "namespace",
    "struct",
    "message",
    "packet",
    "class",
    "noncobject",
    "enum",
    "extends",
];

const SECTION_KEYWORDS: &[&str] = &["properties", "fields"];

pub fn grammar() -> Grammar {
    Grammar::new("msg")
        .filenames(&["*.msg"])
        .mimetypes(&["text/x-msg"])
        .state(
            "statements",
            vec![
                rule(words(DECLARATION_KEYWORDS, "", r"\b"), Keyword),
                rule(words(SECTION_KEYWORDS, "", r"\b"), Keyword),
                rule(
                    r"(abstract|readonly|bool|char|short|int|long|double|unsigned|string)\b",
                    KeywordType,
                ),
                rule(r"[~!%^&*+=|?:<>/@-]", Operator),
                inherit(),
            ],
        )
        .extend(&cpp_grammar())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::token::TokenKind;
    use std::string::String;

    fn significant(text: &str) -> Vec<(TokenKind, String)> {
        let lexer = Lexer::compile(grammar()).unwrap();
        lexer
            .tokenize(text)
            .into_iter()
            .filter(|t| t.kind != Text)
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn test_packet_definition() {
        let sig = significant(
            "import inet.common.INETDefs;\n\npacket Ipv4Header extends Chunk\n{\n    abstract string srcAddress;\n    uint8_t ttl = 64;\n}\n",
        );
        assert_eq!(sig[0], (Keyword, "import".to_string()));
        assert!(sig.contains(&(Keyword, "packet".to_string())));
        assert!(sig.contains(&(Keyword, "extends".to_string())));
        assert!(sig.contains(&(KeywordType, "abstract".to_string())));
        assert!(sig.contains(&(KeywordType, "string".to_string())));
        assert!(sig.contains(&(NumberInteger, "64".to_string())));
    }

    #[test]
    fn test_property_at_sign_is_operator() {
        let sig = significant("class Foo { @customize(true); }");
        assert_eq!(sig[0], (Keyword, "class".to_string()));
        assert_eq!(sig[1], (Name, "Foo".to_string()));
        assert!(sig.contains(&(Operator, "@".to_string())));
        assert!(sig.contains(&(NameBuiltin, "true".to_string())));
    }

    #[test]
    fn test_cplusplus_block_and_inherited_cpp_rules() {
        let sig = significant("cplusplus {{\n#include <vector>\n}}\nenum Kind { A = 1; };\n");
        assert_eq!(sig[0], (Keyword, "cplusplus".to_string()));
        assert!(sig.contains(&(CommentPreprocFile, "<vector>".to_string())));
        assert!(sig.contains(&(Keyword, "enum".to_string())));
    }
}
