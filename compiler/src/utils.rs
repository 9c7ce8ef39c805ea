use std::path::Path;

/// Quotes `text` as a string literal. JSON string syntax is a subset of
/// Rust's, so the result can be pasted into generated code as-is.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
}

/// Converts a string to PascalCase.
/// - Underscore-separated words are capitalized and the rest of each word lowercased.
/// - A fully uppercase word without underscores becomes `Xxxx`.
/// - Otherwise only the first letter is uppercased.
pub fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_')
         .filter(|word| !word.is_empty())
         .map(|word| capitalize(word, true))
         .collect::<String>()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a string to snake_case, keeping acronyms together
/// (e.g. "sessionID" becomes "session_id").
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if (!prev.is_uppercase() && prev != '_')
                    || (prev.is_uppercase() && i + 1 < chars.len() && chars[i + 1].is_lowercase())
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
pub fn escape_rust_keyword(s: &str) -> String {
    const KEYWORDS: [&str; 52] = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn",
        "else", "enum", "extern", "false", "fn", "for", "if", "impl",
        "in", "let", "loop", "match", "mod", "move", "mut", "pub",
        "ref", "return", "self", "Self", "static", "struct", "super", "trait",
        "true", "type", "unsafe", "use", "where", "while", "try",
        // reserved for future use
        "abstract", "become", "box", "do", "final", "gen", "macro", "override",
        "priv", "typeof", "unsized", "virtual", "yield",
    ];
    if KEYWORDS.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

pub fn type_ident(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

pub fn field_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Associated const for an enum alias, e.g. `inProgress` becomes `IN_PROGRESS`.
pub fn const_ident(name: &str) -> String {
    to_snake_case(name).to_uppercase()
}

/// Module that holds the nested types of the message `name`.
pub fn module_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Path of the artifact generated for an imported schema: the `.proto`
/// suffix is swapped for `.rs`.
pub fn artifact_path(import: &str) -> String {
    match import.strip_suffix(".proto") {
        Some(stem) => format!("{}.rs", stem),
        None       => format!("{}.rs", import),
    }
}

/// Module name under which an imported artifact is mounted.
pub fn import_module(import: &str) -> String {
    let stem = Path::new(import)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ident: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    match ident.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", ident),
        None => "_import".to_string(),
        _ => escape_rust_keyword(&to_snake_case(&ident)),
    }
}
