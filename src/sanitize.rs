//! Cleanup of raw model output before it is parsed or executed.
//!
//! Model responses arrive wrapped in markdown fences and occasionally
//! prefixed with stray colon characters (full-width or ASCII) at the start
//! of lines. Sanitizing is a pure text transform and is idempotent, so it
//! is safe to apply to every candidate, including ones that were already
//! sanitized on a previous attempt.

use regex::Regex;
use std::sync::LazyLock;

static LEADING_COLONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[：:]+").expect("valid regex"));

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-zA-Z+]*\n?|```").expect("valid regex"));

/// Strip markdown fences and stray leading colon markers, then trim.
pub fn sanitize(raw: &str) -> String {
    let without_colons = LEADING_COLONS.replace_all(raw, "");
    let without_fences = CODE_FENCE.replace_all(&without_colons, "");
    without_fences.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fenced_block() {
        let raw = "```python\ndef f():\n    return 1\n```";
        assert_eq!(sanitize(raw), "def f():\n    return 1");
    }

    #[test]
    fn test_strips_fence_without_language_tag() {
        let raw = "```\nint x = 1;\n```";
        assert_eq!(sanitize(raw), "int x = 1;");
    }

    #[test]
    fn test_strips_cpp_fence_with_plus_signs() {
        let raw = "```c++\nint main() {}\n```";
        assert_eq!(sanitize(raw), "int main() {}");
    }

    #[test]
    fn test_strips_leading_colons() {
        let raw = "：print('a')\n::print('b')";
        assert_eq!(sanitize(raw), "print('a')\nprint('b')");
    }

    #[test]
    fn test_plain_code_passes_through() {
        let raw = "def greet(name):\n    return name";
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "```js\nconsole.log(1)\n```",
            ":：:x = 1",
            "  surrounded by space  ",
            "",
            "no markup at all",
        ];
        for raw in inputs {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", raw);
        }
    }
}
