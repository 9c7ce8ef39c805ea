use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref STRUCTURE_RX: Regex =
        Regex::new(r"\b(message|enum|oneof)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{|\{|\}").unwrap();
}

/// Structural event produced while scanning the comment-free body.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    OpenMessage(String),
    OpenEnum(String),
    OpenOneof(String),
    /// A `{` that does not open a message, enum or oneof.
    OpenBlock,
    Close,
    /// Declaration text found between structural markers on one line.
    Content(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Splits the body into structural events, line by line. Text between
/// markers on the same line becomes a `Content` token attributed to the
/// context open at that point; declarations are never joined across lines.
pub fn tokenize_schema(body: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    for (index, raw_line) in body.lines().enumerate() {
        let line = index + 1;
        let mut last_end = 0;

        for caps in STRUCTURE_RX.captures_iter(raw_line) {
            let Some(mat) = caps.get(0) else { continue };
            push_content(&mut tokens, &raw_line[last_end..mat.start()], line);

            let kind = match (caps.get(1).map(|m| m.as_str()), caps.get(2)) {
                (Some("message"), Some(name)) => TokenKind::OpenMessage(name.as_str().to_string()),
                (Some("enum"), Some(name))    => TokenKind::OpenEnum(name.as_str().to_string()),
                (Some("oneof"), Some(name))   => TokenKind::OpenOneof(name.as_str().to_string()),
                _ if mat.as_str() == "}"      => TokenKind::Close,
                _                             => TokenKind::OpenBlock,
            };
            tokens.push(Token { kind, line });
            last_end = mat.end();
        }

        push_content(&mut tokens, &raw_line[last_end..], line);
    }

    tokens
}

fn push_content(tokens: &mut Vec<Token>, text: &str, line: usize) {
    let text = text.trim();
    if !text.is_empty() {
        tokens.push(Token { kind: TokenKind::Content(text.to_string()), line });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(body: &str) -> Vec<TokenKind> {
        tokenize_schema(body).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_single_line_message() {
        let got = kinds("message Point { int32 x = 1; int32 y = 2; }");
        assert_eq!(got, vec![
            TokenKind::OpenMessage("Point".into()),
            TokenKind::Content("int32 x = 1; int32 y = 2;".into()),
            TokenKind::Close,
        ]);
    }

    #[test]
    fn test_tokenize_tracks_lines() {
        let tokens = tokenize_schema("enum Kind {\n  A = 0;\n\n}\n");
        assert_eq!(tokens, vec![
            Token { kind: TokenKind::OpenEnum("Kind".into()), line: 1 },
            Token { kind: TokenKind::Content("A = 0;".into()), line: 2 },
            Token { kind: TokenKind::Close, line: 4 },
        ]);
    }

    #[test]
    fn test_tokenize_oneof_and_anonymous_block() {
        let got = kinds("oneof choice {\nservice Api {\n}}");
        assert_eq!(got, vec![
            TokenKind::OpenOneof("choice".into()),
            TokenKind::Content("service Api".into()),
            TokenKind::OpenBlock,
            TokenKind::Close,
            TokenKind::Close,
        ]);
    }

    #[test]
    fn test_keyword_prefixed_type_is_not_an_opener() {
        let got = kinds("enum_type kind = 1;");
        assert_eq!(got, vec![TokenKind::Content("enum_type kind = 1;".into())]);
    }
}
