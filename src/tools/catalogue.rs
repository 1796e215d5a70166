//! Advertised descriptors for the built-in tool catalogue, sent to the model.
//!
//! Schemas are hand-rolled JSON-schema-shaped objects rather than derived,
//! matching `ToolDefinition.parameters: Value` upstream.

use serde_json::{json, Value};

use crate::types::ToolDescriptor;

fn descriptor(name: &str, description: &str, schema: Value) -> ToolDescriptor {
    ToolDescriptor { name: name.to_string(), description: description.to_string(), input_schema: schema }
}

fn open_object() -> Value {
    json!({"type": "object"})
}

/// Every built-in tool's descriptor, in the order it should be advertised.
#[must_use]
pub fn builtin_descriptors(include_git_push: bool) -> Vec<ToolDescriptor> {
    let mut tools = vec![
        descriptor(
            "bash_execute",
            "Run a shell command inside the workspace.",
            json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string"},
                    "cwd": {"type": "string"},
                    "timeoutMs": {"type": "integer"}
                },
                "required": ["command"]
            }),
        ),
        descriptor(
            "file_read",
            "Read a file's full contents as UTF-8 text.",
            json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]}),
        ),
        descriptor(
            "file_write",
            "Write content to a file, creating or overwriting it.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
                "required": ["path", "content"]
            }),
        ),
        descriptor(
            "file_edit",
            "Apply a sequence of line-addressed edits to an existing file.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "ops": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": {"type": "string", "enum": ["insert", "replace", "delete"]},
                                "line_start": {"type": "integer"},
                                "line_end": {"type": "integer"},
                                "content": {"type": "string"}
                            },
                            "required": ["type", "line_start"]
                        }
                    }
                },
                "required": ["path", "ops"]
            }),
        ),
        descriptor(
            "list_directory",
            "List the entries of a directory.",
            json!({"type": "object", "properties": {"path": {"type": "string"}}}),
        ),
        descriptor(
            "codebase_search",
            "Search file paths under the workspace by a substring query.",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}, "path": {"type": "string"}},
                "required": ["query"]
            }),
        ),
        descriptor(
            "grep_search",
            "Search file contents for a regular expression.",
            json!({
                "type": "object",
                "properties": {"pattern": {"type": "string"}, "path": {"type": "string"}},
                "required": ["pattern"]
            }),
        ),
        descriptor(
            "file_outline",
            "List top-level declarations (functions, types) in a file.",
            json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]}),
        ),
        descriptor("git_status", "Show the working tree status.", open_object()),
        descriptor(
            "git_diff",
            "Show unstaged changes, optionally scoped to a path.",
            json!({"type": "object", "properties": {"path": {"type": "string"}}}),
        ),
        descriptor("git_log", "Show recent commit history.", json!({"type": "object", "properties": {"limit": {"type": "integer"}}})),
        descriptor(
            "git_commit",
            "Stage and commit changes.",
            json!({
                "type": "object",
                "properties": {"message": {"type": "string"}, "addAll": {"type": "boolean"}},
                "required": ["message"]
            }),
        ),
        descriptor(
            "git_branch",
            "List branches, or create and switch to a new one.",
            json!({
                "type": "object",
                "properties": {"create": {"type": "boolean"}, "name": {"type": "string"}}
            }),
        ),
    ];
    if include_git_push {
        tools.push(descriptor("git_push", "Push the current branch to its remote.", open_object()));
    }
    tools
}
