//! Default argument synthesis from declared type text.
//!
//! Maps a parameter's type, as written in the source, to a literal usable
//! as a call argument. Sits on a best-effort "make something runnable"
//! path: it must be total, so every unrecognized type falls through to a
//! safe zero literal rather than an error.

use regex::Regex;
use std::sync::LazyLock;

static CHAR_PTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)char\*$").expect("valid regex"));
static USER_TYPE_PTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z].*\*$").expect("valid regex"));
static ARRAY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d*\]$").expect("valid regex"));

/// Canonicalize spacing in a type so rule matching sees one spelling.
/// `std :: vector < int >` and `std::vector<int>` become the same key.
pub fn normalize_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            last_space = true;
            continue;
        }
        if last_space {
            // Spaces survive only between word characters; they are
            // dropped around punctuation like <, >, *, and commas.
            if matches!(ch, '<' | '>' | '*' | ',' | '&' | ':') {
                // skip
            } else if out
                .chars()
                .last()
                .map(|p| matches!(p, '<' | '>' | '*' | ',' | '&' | ':'))
                .unwrap_or(true)
            {
                // skip
            } else {
                out.push(' ');
            }
            last_space = false;
        }
        out.push(ch);
    }
    out
}

fn keyword_match(lower: &str, keywords: &[&str]) -> bool {
    keywords
        .iter()
        .any(|k| lower == *k || lower.starts_with(&format!("{k} ")))
}

/// Produce a literal expression for a declared type. Total: always returns
/// a non-empty string. Rules apply in order, first match wins.
pub fn synthesize(declared: Option<&str>) -> String {
    let raw = match declared {
        Some(t) if !t.trim().is_empty() => normalize_type(t),
        _ => return "0".to_string(),
    };
    let lower = raw.to_lowercase();

    if keyword_match(&lower, &["int", "long", "short"]) {
        return "1".to_string();
    }
    if keyword_match(&lower, &["float", "double"]) {
        return "1.0".to_string();
    }
    if keyword_match(&lower, &["string", "std::string", "str"]) {
        return "\"test\"".to_string();
    }
    if lower == "bool" || lower == "boolean" {
        return "false".to_string();
    }

    if raw.contains('*') {
        if CHAR_PTR.is_match(&raw) {
            return "\"test\"".to_string();
        }
        if USER_TYPE_PTR.is_match(&raw) {
            let pointee = raw.trim_end_matches('*').trim();
            return format!("new {pointee}()");
        }
        return "nullptr".to_string();
    }

    // Containers recurse on the element type and build a fixed two-element
    // literal, {v, v}.
    if let Some(element) = container_element(&raw) {
        let v = synthesize(Some(element));
        return format!("{{{v}, {v}}}");
    }

    // Capitalized bare names are assumed user-defined value types.
    if raw.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false) {
        return format!("{raw}()");
    }

    "0".to_string()
}

/// Element type of a `vector<T>` / `std::vector<T>` / trailing-array type,
/// or `None` when the type is not a recognized container.
fn container_element(raw: &str) -> Option<&str> {
    let lower = raw.to_lowercase();
    for prefix in ["std::vector<", "vector<"] {
        if lower.starts_with(prefix) && raw.ends_with('>') {
            return Some(raw[prefix.len()..raw.len() - 1].trim());
        }
    }
    if let Some(m) = ARRAY_SUFFIX.find(raw) {
        return Some(raw[..m.start()].trim());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(t: &str) -> String {
        synthesize(Some(t))
    }

    #[test]
    fn test_integer_family() {
        assert_eq!(synth("int"), "1");
        assert_eq!(synth("long"), "1");
        assert_eq!(synth("short"), "1");
        assert_eq!(synth("long long"), "1");
    }

    #[test]
    fn test_floating_point() {
        assert_eq!(synth("float"), "1.0");
        assert_eq!(synth("double"), "1.0");
    }

    #[test]
    fn test_string_family() {
        assert_eq!(synth("string"), "\"test\"");
        assert_eq!(synth("std::string"), "\"test\"");
        assert_eq!(synth("str"), "\"test\"");
    }

    #[test]
    fn test_boolean() {
        assert_eq!(synth("bool"), "false");
        assert_eq!(synth("boolean"), "false");
    }

    #[test]
    fn test_pointer_rules() {
        assert_eq!(synth("char*"), "\"test\"");
        assert_eq!(synth("const char*"), "\"test\"");
        assert_eq!(synth("int*"), "nullptr");
        assert_eq!(synth("MyClass*"), "new MyClass()");
    }

    #[test]
    fn test_container_recursion() {
        assert_eq!(synth("vector<int>"), "{1, 1}");
        assert_eq!(synth("std::vector<int>"), "{1, 1}");
        assert_eq!(synth("vector<vector<int>>"), "{{1, 1}, {1, 1}}");
        assert_eq!(synth("int[3]"), "{1, 1}");
        assert_eq!(synth("int[]"), "{1, 1}");
    }

    #[test]
    fn test_user_defined_value_type() {
        assert_eq!(synth("MyClass"), "MyClass()");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(synth("void"), "0");
        assert_eq!(synthesize(None), "0");
        assert_eq!(synthesize(Some("")), "0");
        assert_eq!(synthesize(Some("   ")), "0");
    }

    #[test]
    fn test_normalization_canonicalizes_spacing() {
        assert_eq!(normalize_type("std :: vector < int >"), "std::vector<int>");
        assert_eq!(normalize_type("char *"), "char*");
        assert_eq!(normalize_type("long   long"), "long long");
        assert_eq!(synth("vector < int >"), "{1, 1}");
    }

    #[test]
    fn test_total_over_arbitrary_inputs() {
        let weird = ["???", "<>", "*", "a<b", "]["];
        for t in weird {
            let v = synthesize(Some(t));
            assert!(!v.is_empty());
        }
    }
}
