use regex::Regex;
use std::sync::LazyLock;

/// Characters that are not allowed in file or directory names on at least one
/// common filesystem.
pub const ILLEGAL_CHARS: [char; 9] = ['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

static ILLEGAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:"*?<>|]+"#).expect("valid regex"));

/// Make an arbitrary string safe to use as a single path component.
///
/// Each run of illegal characters becomes one `-`, then surrounding
/// whitespace is trimmed. Total and idempotent.
pub fn sanitize_name(name: &str) -> String {
    ILLEGAL_RUN.replace_all(name, "-").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_each_illegal_char() {
        for c in ILLEGAL_CHARS {
            let input = format!("a{c}b");
            assert_eq!(sanitize_name(&input), "a-b", "char {c:?}");
        }
    }

    #[test]
    fn test_collapses_runs() {
        assert_eq!(sanitize_name(r#"AC/DC: "Live"?"#), "AC-DC- -Live-");
        assert_eq!(sanitize_name("a<>|b"), "a-b");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize_name("  Foo Bar \t"), "Foo Bar");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_idempotent_and_clean() {
        let samples = [
            "plain",
            "  spaced  ",
            "x:/y\\z",
            "???",
            " * leading and trailing | ",
            "Ünïcödé — “quotes” / 曲名",
            "a - b",
        ];
        for s in samples {
            let once = sanitize_name(s);
            assert_eq!(sanitize_name(&once), once, "not idempotent for {s:?}");
            assert!(
                !once.contains(ILLEGAL_CHARS),
                "illegal char left in {once:?}"
            );
        }
    }
}
