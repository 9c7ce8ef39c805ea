//! First stage: comment stripping and file-level directives.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref COMMENT_RX: Regex = Regex::new(r"(?ms)//[^\n]*|/\*.*?\*/").unwrap();
    static ref IMPORT_RX:  Regex = Regex::new(r#"\bimport\s+(?:(?:public|weak)\s+)?"([^"]+)"\s*;"#).unwrap();
    static ref PACKAGE_RX: Regex = Regex::new(r"\bpackage\s+([\w.]+)\s*;").unwrap();
}

#[derive(Debug, PartialEq)]
pub struct SchemaText {
    /// Schema text with all comments removed. Line breaks are preserved.
    pub body:    String,
    pub imports: Vec<String>,
    pub package: Option<String>,
}

/// Never fails: an unterminated block comment is left in place and a missing
/// package directive simply yields `None`.
pub fn read_schema(text: &str) -> SchemaText {
    let body = strip_comments(text);
    let imports = IMPORT_RX
        .captures_iter(&body)
        .map(|c| c[1].to_string())
        .collect();
    let package = PACKAGE_RX.captures(&body).map(|c| c[1].to_string());

    SchemaText { body, imports, package }
}

/// Removes `//` and `/* */` comments in a single pass. A block comment is
/// replaced by the line breaks it contained.
pub fn strip_comments(text: &str) -> String {
    COMMENT_RX
        .replace_all(text, |caps: &Captures| "\n".repeat(caps[0].matches('\n').count()))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_and_block_comments() {
        let input = "int32 a = 1; // trailing\n/* one\n two } */ int32 b = 2;\n";
        let body = strip_comments(input);
        assert_eq!(body, "int32 a = 1; \n\n int32 b = 2;\n");
        assert!(!body.contains('}'));
    }

    #[test]
    fn test_imports_and_package() {
        let input = r#"
            syntax = "proto3";
            package demo.v1;
            import "common/a.proto";
            import public "b.proto";
            // import "commented.proto";
        "#;
        let read = read_schema(input);
        assert_eq!(read.package.as_deref(), Some("demo.v1"));
        assert_eq!(read.imports, vec!["common/a.proto", "b.proto"]);
    }

    #[test]
    fn test_missing_package_is_none() {
        let read = read_schema("message A {}\n");
        assert_eq!(read.package, None);
        assert!(read.imports.is_empty());
    }

    #[test]
    fn test_unterminated_block_comment_is_kept() {
        let read = read_schema("message A { /* never closed\n}");
        assert!(read.body.contains("/*"));
    }
}
