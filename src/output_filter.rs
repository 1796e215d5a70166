//! Pure secret/PII redaction applied to streamed text and tool outputs.

use std::sync::OnceLock;

use regex::Regex;

struct Pattern {
    regex: Regex,
    replacement: &'static str,
}

fn patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern { regex: Regex::new(r"sk-[A-Za-z0-9]{20,}").unwrap(), replacement: "[REDACTED_KEY]" },
            Pattern {
                regex: Regex::new(r"(?i)\b(AKIA|ASIA)[A-Z0-9]{16}\b").unwrap(),
                replacement: "[REDACTED_AWS_KEY]",
            },
            Pattern {
                regex: Regex::new(r"(?i)(authorization:\s*bearer\s+)[A-Za-z0-9._-]+").unwrap(),
                replacement: "$1[REDACTED_TOKEN]",
            },
            Pattern {
                regex: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
                replacement: "[REDACTED_EMAIL]",
            },
        ]
    })
}

/// Scrubs known secret and PII shapes from `text`. Applied to both streamed
/// model text and emitted tool outputs before they leave the engine.
#[must_use]
pub fn filter(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in patterns() {
        out = pattern.regex.replace_all(&out, pattern.replacement).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_api_key() {
        let out = filter("key is sk-abcdefghijklmnopqrstuvwxyz123456");
        assert!(out.contains("[REDACTED_KEY]"));
        assert!(!out.contains("sk-abcdefghijklmnopqrstuvwxyz123456"));
    }

    #[test]
    fn redacts_email() {
        let out = filter("contact me at jane.doe@example.com please");
        assert_eq!(out, "contact me at [REDACTED_EMAIL] please");
    }

    #[test]
    fn leaves_ordinary_text_untouched() {
        let out = filter("the build passed with 3 warnings");
        assert_eq!(out, "the build passed with 3 warnings");
    }
}
