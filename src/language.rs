//! Language classification for candidate code.
//!
//! A `LanguageVariant` is picked once per verification session and drives
//! everything downstream: which grammar parses the code, which harness
//! template wraps it, and which toolchain runs it.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Supported source languages, selected once at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageVariant {
    Python,
    JavaScript,
    Java,
    Cpp,
    Unknown,
}

impl LanguageVariant {
    /// Map an explicit language tag (editor language id, fence annotation,
    /// CLI flag) to a variant. Unrecognized tags map to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "python" | "py" => LanguageVariant::Python,
            "javascript" | "js" | "node" => LanguageVariant::JavaScript,
            "java" => LanguageVariant::Java,
            "cpp" | "c++" | "cxx" => LanguageVariant::Cpp,
            _ => LanguageVariant::Unknown,
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "py" => LanguageVariant::Python,
            "js" | "mjs" | "cjs" => LanguageVariant::JavaScript,
            "java" => LanguageVariant::Java,
            "cpp" | "cc" | "cxx" => LanguageVariant::Cpp,
            _ => LanguageVariant::Unknown,
        }
    }

    /// File extension used for the scratch source file.
    pub fn extension(&self) -> &'static str {
        match self {
            LanguageVariant::Python => "py",
            LanguageVariant::JavaScript => "js",
            LanguageVariant::Java => "java",
            LanguageVariant::Cpp => "cpp",
            LanguageVariant::Unknown => "txt",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LanguageVariant::Python => "python",
            LanguageVariant::JavaScript => "javascript",
            LanguageVariant::Java => "java",
            LanguageVariant::Cpp => "cpp",
            LanguageVariant::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LanguageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static FENCE_CPP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(cpp|c\+\+)").expect("valid regex"));
static FENCE_PYTHON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```python").expect("valid regex"));
static FENCE_JAVA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```java\b").expect("valid regex"));
static FENCE_JS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(javascript|js)\b").expect("valid regex"));

static PYTHON_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)import\s+.+|def\s+\w+").expect("valid regex"));
static JAVA_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)class\s+\w+").expect("valid regex"));
static JS_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)function\s+\w+|console\.log").expect("valid regex"));

/// Classify candidate code.
///
/// An explicit hint from the caller is authoritative. Otherwise ordered
/// heuristics run over the raw text: fence annotations first (they are the
/// strongest signal and vanish once the code is sanitized), then content
/// idioms. Callers must treat `Unknown` as "cannot execute".
pub fn classify(code: &str, hint: Option<&str>) -> LanguageVariant {
    if let Some(tag) = hint {
        if !tag.trim().is_empty() {
            return LanguageVariant::from_tag(tag);
        }
    }

    // Order matters: java's `class` heuristic would also match python
    // dataclasses, and js `function` would match nothing earlier.
    if FENCE_CPP.is_match(code) {
        return LanguageVariant::Cpp;
    }
    if FENCE_PYTHON.is_match(code) || PYTHON_TOKENS.is_match(code) {
        return LanguageVariant::Python;
    }
    if FENCE_JAVA.is_match(code) || JAVA_TOKENS.is_match(code) {
        return LanguageVariant::Java;
    }
    if FENCE_JS.is_match(code) || JS_TOKENS.is_match(code) {
        return LanguageVariant::JavaScript;
    }
    LanguageVariant::Unknown
}
