//! Core data model: messages, tool calls/results, file changes, descriptors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in the loop transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

/// One element of a message's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
}

impl ContentPart {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::ImageUrl { .. } => None,
        }
    }
}

/// A single message in the loop transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Set only on `role = tool` messages: the id of the call this answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_calls: None,
            tool_call_id: None,
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            tool_call_id: None,
        }
    }

    #[must_use]
    pub fn tool_response(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentPart::as_text).collect::<Vec<_>>().join("\n")
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed input arguments. `None` alongside `Some(raw)` means the
    /// provider's JSON failed to parse and the call must not execute.
    #[serde(default)]
    pub input: Option<Value>,
    /// Present only when `input` is `None`: the unparsed argument text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ToolCall {
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.input.is_none()
    }
}

/// The outcome of dispatching a single tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<FileDiff>,
}

impl ToolResult {
    #[must_use]
    pub fn ok(output: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            execution_time_ms,
            exit_code: None,
            diff: None,
        }
    }

    #[must_use]
    pub fn fail(error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            execution_time_ms,
            exit_code: None,
            diff: None,
        }
    }

    #[must_use]
    pub fn with_diff(mut self, diff: FileDiff) -> Self {
        self.diff = Some(diff);
        self
    }

    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// The text fed back into the transcript as the paired tool message.
    #[must_use]
    pub fn feedback_text(&self) -> String {
        match (&self.output, &self.error) {
            (Some(out), _) if self.success => out.clone(),
            (_, Some(err)) => format!("Error: {err}"),
            (Some(out), None) => out.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Classification of a file mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

/// Before/after content pair attached to a write/edit result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub file_path: String,
    pub change_type: ChangeType,
    #[serde(default)]
    pub before_content: Option<String>,
    #[serde(default)]
    pub after_content: Option<String>,
}

/// A summarized record of one file's mutation, emitted in `files_summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChangeRecord {
    pub path: String,
    pub change_type: ChangeType,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub tool_name: String,
}

impl FileChangeRecord {
    #[must_use]
    pub fn from_diff(diff: &FileDiff, tool_name: impl Into<String>) -> Self {
        let before = diff.before_content.as_deref().unwrap_or("");
        let after = diff.after_content.as_deref().unwrap_or("");
        let (added, removed) = line_delta(before, after);
        Self {
            path: diff.file_path.clone(),
            change_type: diff.change_type,
            lines_added: added,
            lines_removed: removed,
            tool_name: tool_name.into(),
        }
    }
}

fn line_delta(before: &str, after: &str) -> (usize, usize) {
    use std::collections::HashSet;
    let before_lines: HashSet<&str> = before.lines().collect();
    let after_lines: HashSet<&str> = after.lines().collect();
    let added = after_lines.difference(&before_lines).count();
    let removed = before_lines.difference(&after_lines).count();
    (added, removed)
}

/// A tool's advertised name, description, and input schema, sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// A JSON-schema-shaped object describing the tool's parameters.
    pub input_schema: Value,
}

/// A JSON-schema-like property map used when a hand-rolled schema is cheaper
/// than deriving one via `schemars`.
pub type PropertyMap = HashMap<String, Value>;
