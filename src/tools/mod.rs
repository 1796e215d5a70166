//! The built-in tool catalogue: shell, file I/O, search, and git.

mod bash;
mod catalogue;
mod file_ops;
mod git;
mod search;

pub use bash::bash_execute;
pub use catalogue::builtin_descriptors;
pub use file_ops::{file_edit, file_read, file_write, list_directory, EditOp};
pub use git::{git_branch, git_commit, git_diff, git_log, git_push, git_status};
pub use search::{codebase_search, file_outline, grep_search};

use crate::error::Result;
use crate::loop_state::WorkspaceConfig;
use crate::types::ToolResult;

/// Names of built-in tools whose successful result should be compressed as
/// a write/edit ("✓ Written …") rather than passed through verbatim.
pub const WRITE_TOOL_NAMES: &[&str] = &["file_write", "file_edit"];

/// Names of built-in tools that shell out and whose output should use the
/// exec compression rule (tail-capped) rather than the read/search cap.
pub const EXEC_TOOL_NAMES: &[&str] = &["bash_execute", "git_commit", "git_push"];

/// Dispatches `name` to its built-in implementation.
///
/// # Errors
/// Returns [`crate::error::EngineError`] only for request-level failures
/// (e.g. a filesystem race that produces an `io::Error` the tool itself
/// could not turn into a `ToolResult`); ordinary tool failures come back as
/// `Ok(ToolResult { success: false, .. })`.
pub async fn dispatch_builtin(
    name: &str,
    input: &serde_json::Value,
    workspace: &WorkspaceConfig,
    enable_git_push: bool,
) -> Result<ToolResult> {
    match name {
        "bash_execute" => bash::bash_execute(input, workspace).await,
        "file_read" => file_ops::file_read(input, workspace).await,
        "file_write" => file_ops::file_write(input, workspace).await,
        "file_edit" => file_ops::file_edit(input, workspace).await,
        "list_directory" => file_ops::list_directory(input, workspace).await,
        "codebase_search" => search::codebase_search(input, workspace).await,
        "grep_search" => search::grep_search(input, workspace).await,
        "file_outline" => search::file_outline(input, workspace).await,
        "git_status" => git::git_status(input, workspace).await,
        "git_diff" => git::git_diff(input, workspace).await,
        "git_log" => git::git_log(input, workspace).await,
        "git_commit" => git::git_commit(input, workspace).await,
        "git_branch" => git::git_branch(input, workspace).await,
        "git_push" => git::git_push(input, workspace, enable_git_push).await,
        other => Ok(ToolResult::fail(format!("Unknown tool: {other}"), 0)),
    }
}

/// Is `name` one of the built-in tools this module implements?
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "bash_execute"
            | "file_read"
            | "file_write"
            | "file_edit"
            | "list_directory"
            | "codebase_search"
            | "grep_search"
            | "file_outline"
            | "git_status"
            | "git_diff"
            | "git_log"
            | "git_commit"
            | "git_branch"
            | "git_push"
    )
}

/// Resolves a required string field of the tool's JSON input.
pub(crate) fn required_str<'a>(input: &'a serde_json::Value, field: &str) -> std::result::Result<&'a str, String> {
    input.get(field).and_then(serde_json::Value::as_str).ok_or_else(|| format!("missing required field '{field}'"))
}

/// Resolves an optional string field of the tool's JSON input.
pub(crate) fn optional_str<'a>(input: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    input.get(field).and_then(serde_json::Value::as_str)
}
