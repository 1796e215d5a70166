//! Per-request state: the workspace a request is bounded to, and the loop's
//! running counters and transcript.

use std::path::PathBuf;

use crate::types::{FileChangeRecord, Message};

/// The filesystem region and policy flags a single request is bounded to.
///
/// Created on request entry, owned exclusively by the agentic loop, and
/// never shared across requests.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub allowed_dirs: Vec<PathBuf>,
    pub guardrails_enabled: bool,
}

impl WorkspaceConfig {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root, allowed_dirs: Vec::new(), guardrails_enabled: false }
    }

    #[must_use]
    pub fn with_allowed_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.allowed_dirs = dirs;
        self
    }

    #[must_use]
    pub fn with_guardrails_enabled(mut self, enabled: bool) -> Self {
        self.guardrails_enabled = enabled;
        self
    }
}

/// Counters and the mutable transcript tracked across the agentic loop's
/// lifetime. Exclusively owned by the loop; the parallel runner only
/// borrows the workspace read-only while a chunk executes.
#[derive(Debug, Default)]
pub struct LoopState {
    pub turn_index: usize,
    pub total_tool_calls: usize,
    pub consecutive_empty_turns: usize,
    pub total_text_chars: usize,
    pub file_changes: Vec<FileChangeRecord>,
    pub commands_run: usize,
    pub commands_passed: usize,
    pub loop_messages: Vec<Message>,
}

impl LoopState {
    #[must_use]
    pub fn new(loop_messages: Vec<Message>) -> Self {
        Self { loop_messages, ..Self::default() }
    }

    pub fn record_turn_start(&mut self) {
        self.turn_index += 1;
    }

    pub fn record_empty_turn(&mut self) {
        self.consecutive_empty_turns += 1;
    }

    pub fn record_non_empty_turn(&mut self) {
        self.consecutive_empty_turns = 0;
    }

    #[must_use]
    pub fn should_stop_on_empty_turns(&self) -> bool {
        self.consecutive_empty_turns >= 2
    }

    #[must_use]
    pub fn reached_max_turns(&self, max_tool_turns: usize) -> bool {
        self.turn_index >= max_tool_turns
    }
}
