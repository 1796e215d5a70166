//! Centralized, environment-driven configuration.
//!
//! [`EngineConfig`] is built once via [`EngineConfig::from_env`] at request
//! entry and threaded immutably through the loop — it is never re-read
//! mid-request.

use std::env;

use crate::error::{EngineError, Result};

/// Every tunable the engine reads from the environment, with typed defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Max messages retained in history before truncation.
    pub max_context_messages: usize,
    /// Per-message character cap applied during trimming.
    pub max_msg_chars: usize,
    /// Per-turn response token cap for code/normal modes.
    pub max_tokens_code: u32,
    /// Per-turn response token cap for other modes.
    pub max_tokens_other: u32,
    /// Max agentic turns before the loop force-terminates.
    pub max_tool_turns: usize,
    /// Per-tool outer timeout, milliseconds.
    pub tool_execution_timeout_ms: u64,
    /// Max concurrent tool executions per dispatch chunk.
    pub tool_parallel_limit: usize,
    /// Loop transcript trim threshold.
    pub max_loop_messages: usize,
    /// Whether retrieval augmentation is attempted during PREPARE.
    pub rag_context_enabled: bool,
    /// Whether the `git_push` tool is enabled.
    pub enable_git_push: bool,
    /// Retrieval-augmentation race deadline, milliseconds.
    pub rag_context_deadline_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_context_messages: 12,
            max_msg_chars: 8000,
            max_tokens_code: 16384,
            max_tokens_other: 8192,
            max_tool_turns: 25,
            tool_execution_timeout_ms: 600_000,
            tool_parallel_limit: 5,
            max_loop_messages: 30,
            rag_context_enabled: false,
            enable_git_push: false,
            rag_context_deadline_ms: 200,
        }
    }
}

impl EngineConfig {
    /// Reads every tunable from the environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns [`EngineError::Configuration`] if a variable is set but does
    /// not parse as the expected type.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_context_messages: parse_env("CHAT_MAX_CONTEXT_MESSAGES", defaults.max_context_messages)?,
            max_msg_chars: parse_env("CHAT_MAX_MSG_CHARS", defaults.max_msg_chars)?,
            max_tokens_code: parse_env("CHAT_MAX_TOKENS", defaults.max_tokens_code)?,
            max_tokens_other: parse_env("CHAT_MAX_TOKENS_OTHER", defaults.max_tokens_other)?,
            max_tool_turns: parse_env("CHAT_MAX_TOOL_TURNS", defaults.max_tool_turns)?,
            tool_execution_timeout_ms: parse_env(
                "TOOL_EXECUTION_TIMEOUT_MS",
                defaults.tool_execution_timeout_ms,
            )?,
            tool_parallel_limit: parse_env("TOOL_PARALLEL_LIMIT", defaults.tool_parallel_limit)?,
            max_loop_messages: parse_env("AGENTIC_MAX_LOOP_MESSAGES", defaults.max_loop_messages)?,
            rag_context_enabled: parse_env("RAG_CONTEXT_ENABLED", defaults.rag_context_enabled)?,
            enable_git_push: parse_env("ENABLE_GIT_PUSH", defaults.enable_git_push)?,
            rag_context_deadline_ms: parse_env(
                "RAG_CONTEXT_DEADLINE_MS",
                defaults.rag_context_deadline_ms,
            )?,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| EngineError::Configuration(format!("{key}={raw:?}: {e}"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(EngineError::Configuration(format!("{key} is not valid unicode")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_table() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_context_messages, 12);
        assert_eq!(cfg.max_tool_turns, 25);
        assert_eq!(cfg.tool_parallel_limit, 5);
        assert!(!cfg.enable_git_push);
    }

    #[test]
    fn rejects_malformed_numeric_env() {
        // SAFETY: test runs single-threaded within this process's env mutation.
        unsafe { env::set_var("TOOL_PARALLEL_LIMIT", "not-a-number") };
        let result = EngineConfig::from_env();
        unsafe { env::remove_var("TOOL_PARALLEL_LIMIT") };
        assert!(result.is_err());
    }
}
