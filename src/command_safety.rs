//! Denylist for commands that must never reach `bash_execute`, regardless
//! of their arguments.

use regex::Regex;
use std::sync::OnceLock;

fn denylist() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^\s*rm\s+-[a-z]*r[a-z]*f[a-z]*\s+/\s*$",
            r"(?i)^\s*rm\s+-[a-z]*r[a-z]*f[a-z]*\s+/\*",
            r"(?i)^\s*rm\s+-[a-z]*f[a-z]*r[a-z]*\s+/\s*$",
            r"(?i)\bdd\s+if=/dev/(zero|random|urandom)\s+of=/dev/[sh]d",
            r"(?i)\bmkfs\.",
            r"(?i):\(\)\s*\{\s*:\|\s*:\s*&\s*\}\s*;",
            r"(?i)\b(shutdown|reboot|poweroff|halt)\b",
            r"(?i)\bchmod\s+-R\s+000\s+/",
            r"(?i)\bcurl\b.*\|\s*(sudo\s+)?(bash|sh)\b",
            r"(?i)\bwget\b.*\|\s*(sudo\s+)?(bash|sh)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("denylist pattern compiles"))
        .collect()
    })
}

/// Returns `true` if `command` matches a known-dangerous pattern and must be
/// blocked before execution.
#[must_use]
pub fn is_dangerous(command: &str) -> bool {
    if denylist().iter().any(|re| re.is_match(command)) {
        return true;
    }

    if let Some(script) = bash_dash_c_script(command) {
        return is_dangerous(script);
    }

    false
}

/// If `command` is of the form `bash -c "..."` / `sh -c "..."` / `zsh -lc "..."`,
/// returns the embedded script so its sub-commands can be checked too.
fn bash_dash_c_script(command: &str) -> Option<&str> {
    let mut parts = command.trim().splitn(3, char::is_whitespace);
    let shell = parts.next()?;
    let flag = parts.next()?;
    let rest = parts.next()?;

    let is_shell = matches!(shell, "bash" | "sh" | "zsh");
    let is_c_flag = matches!(flag, "-c" | "-lc" | "-ilc");
    if !(is_shell && is_c_flag) {
        return None;
    }

    Some(rest.trim_matches(|c| c == '"' || c == '\''))
}
