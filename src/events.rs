//! The streaming event bus the engine exposes to callers.

use serde::{Deserialize, Serialize};

use crate::types::{FileDiff, ToolCall};

/// One event emitted by the agentic loop. The ordering guarantees (every
/// `tool_result` has a preceding `tool_call`; parallel-chunk events appear
/// in input order) are documented on the loop itself, not enforced by this
/// type — this is purely the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum AgentEvent {
    Autonomous {
        value: bool,
    },
    Context {
        mode: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        capabilities: Option<Vec<String>>,
        tool_count: usize,
    },
    AgenticProgress {
        current_turn: usize,
        max_turns: usize,
        tool_call_count: usize,
    },
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        id: String,
        tool_name: String,
        output: String,
        success: bool,
        execution_time_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        diff: Option<FileDiff>,
    },
    FilesSummary {
        files: Vec<crate::types::FileChangeRecord>,
        commands_run: usize,
        commands_passed: usize,
        total_turns: usize,
    },
    Error {
        message: String,
        error_type: String,
        retryable: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
    },
    Done,
}

impl AgentEvent {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn tool_call(call: &ToolCall) -> Self {
        Self::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone().unwrap_or(serde_json::Value::Null),
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }
}
