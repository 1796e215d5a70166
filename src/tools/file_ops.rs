//! `file_read`, `file_write`, `file_edit`, `list_directory`.

use std::time::Instant;

use imara_diff::intern::InternedInput;
use imara_diff::{diff, Algorithm, UnifiedDiffBuilder};
use serde::Deserialize;

use crate::error::Result;
use crate::loop_state::WorkspaceConfig;
use crate::path_policy::{self, PolicyDecision};
use crate::types::{ChangeType, FileDiff, ToolResult};

use super::required_str;

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// A short unified-diff rendering, used only to enrich the human-readable
/// success message — `FileDiff::before_content`/`after_content` remain the
/// source of truth for round-trip verification.
fn summarize_change(before: &str, after: &str) -> String {
    let input = InternedInput::new(before, after);
    diff(Algorithm::Histogram, &input, UnifiedDiffBuilder::new(&input))
}

fn resolve_or_fail(workspace: &WorkspaceConfig, requested: &str, started: Instant) -> std::result::Result<std::path::PathBuf, ToolResult> {
    match path_policy::resolve(workspace, requested) {
        PolicyDecision::Allowed(path) => Ok(path),
        PolicyDecision::Blocked(reason) => Err(ToolResult::fail(reason, elapsed_ms(started))),
    }
}

pub async fn file_read(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let requested = match required_str(input, "path") {
        Ok(p) => p,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };
    let path = match resolve_or_fail(workspace, requested, started) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(ToolResult::ok(content, elapsed_ms(started))),
        Err(e) => Ok(ToolResult::fail(format!("failed to read '{requested}': {e}"), elapsed_ms(started))),
    }
}

pub async fn file_write(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let requested = match required_str(input, "path") {
        Ok(p) => p,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };
    let content = match required_str(input, "content") {
        Ok(c) => c,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };
    let path = match resolve_or_fail(workspace, requested, started) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let before_content = tokio::fs::read_to_string(&path).await.ok();
    let change_type = if before_content.is_some() { ChangeType::Modified } else { ChangeType::Created };

    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return Ok(ToolResult::fail(format!("failed to create parent directory: {e}"), elapsed_ms(started)));
        }
    }

    if let Err(e) = tokio::fs::write(&path, content).await {
        return Ok(ToolResult::fail(format!("failed to write '{requested}': {e}"), elapsed_ms(started)));
    }

    let diff_text = summarize_change(before_content.as_deref().unwrap_or(""), content);
    let diff = FileDiff {
        file_path: requested.to_string(),
        change_type,
        before_content,
        after_content: Some(content.to_string()),
    };
    let elapsed = elapsed_ms(started);
    let message = format!("Wrote {} bytes to {requested}\n{diff_text}", content.len());
    Ok(ToolResult::ok(message, elapsed).with_diff(diff))
}

/// One line-addressed edit operation, applied in the order given.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditOp {
    Insert { line_start: usize, content: String },
    Replace { line_start: usize, line_end: usize, content: String },
    Delete { line_start: usize, line_end: usize },
}

pub async fn file_edit(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let requested = match required_str(input, "path") {
        Ok(p) => p,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };
    let ops: Vec<EditOp> = match input.get("ops").cloned().map(serde_json::from_value) {
        Some(Ok(ops)) => ops,
        Some(Err(e)) => return Ok(ToolResult::fail(format!("invalid ops: {e}"), elapsed_ms(started))),
        None => return Ok(ToolResult::fail("missing required field 'ops'", elapsed_ms(started))),
    };
    let path = match resolve_or_fail(workspace, requested, started) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let before_content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) => return Ok(ToolResult::fail(format!("failed to read '{requested}': {e}"), elapsed_ms(started))),
    };

    let mut lines: Vec<String> = before_content.lines().map(str::to_string).collect();

    for op in &ops {
        if let Err(reason) = apply_edit_op(&mut lines, op) {
            return Ok(ToolResult::fail(reason, elapsed_ms(started)));
        }
    }

    let after_content = if lines.is_empty() { String::new() } else { lines.join("\n") + "\n" };

    if let Err(e) = tokio::fs::write(&path, &after_content).await {
        return Ok(ToolResult::fail(format!("failed to write '{requested}': {e}"), elapsed_ms(started)));
    }

    let diff_text = summarize_change(&before_content, &after_content);
    let diff = FileDiff {
        file_path: requested.to_string(),
        change_type: ChangeType::Modified,
        before_content: Some(before_content),
        after_content: Some(after_content),
    };
    let elapsed = elapsed_ms(started);
    let message = format!("Applied {} edit(s) to {requested}\n{diff_text}", ops.len());
    Ok(ToolResult::ok(message, elapsed).with_diff(diff))
}

fn apply_edit_op(lines: &mut Vec<String>, op: &EditOp) -> std::result::Result<(), String> {
    match op {
        EditOp::Insert { line_start, content } => {
            if *line_start == 0 || *line_start > lines.len() + 1 {
                return Err(format!("insert lineStart {line_start} out of range (1..={})", lines.len() + 1));
            }
            lines.insert(line_start - 1, content.clone());
            Ok(())
        }
        EditOp::Replace { line_start, line_end, content } => {
            validate_range(*line_start, *line_end, lines.len())?;
            let new_lines: Vec<String> = content.lines().map(str::to_string).collect();
            lines.splice(line_start - 1..*line_end, new_lines);
            Ok(())
        }
        EditOp::Delete { line_start, line_end } => {
            validate_range(*line_start, *line_end, lines.len())?;
            lines.drain(line_start - 1..*line_end);
            Ok(())
        }
    }
}

fn validate_range(line_start: usize, line_end: usize, len: usize) -> std::result::Result<(), String> {
    if line_start == 0 || line_end < line_start || line_end > len {
        return Err(format!("edit range {line_start}..={line_end} out of bounds (1..={len})"));
    }
    Ok(())
}

pub async fn list_directory(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let requested = super::optional_str(input, "path").unwrap_or(".");
    let path = match resolve_or_fail(workspace, requested, started) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let mut entries = match tokio::fs::read_dir(&path).await {
        Ok(entries) => entries,
        Err(e) => return Ok(ToolResult::fail(format!("failed to list '{requested}': {e}"), elapsed_ms(started))),
    };

    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name().to_string_lossy().into_owned();
                let suffix = if entry.path().is_dir() { "/" } else { "" };
                names.push(format!("{name}{suffix}"));
            }
            Ok(None) => break,
            Err(e) => return Ok(ToolResult::fail(format!("error reading directory: {e}"), elapsed_ms(started))),
        }
    }
    names.sort();

    Ok(ToolResult::ok(names.join("\n"), elapsed_ms(started)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        let write = file_write(&json!({"path": "a.txt", "content": "hello"}), &workspace).await.unwrap();
        assert!(write.success);
        assert_eq!(write.diff.as_ref().unwrap().change_type, ChangeType::Created);

        let read = file_read(&json!({"path": "a.txt"}), &workspace).await.unwrap();
        assert_eq!(read.output.unwrap(), "hello");
    }

    #[tokio::test]
    async fn second_write_is_modification_and_diff_matches_disk() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        file_write(&json!({"path": "a.txt", "content": "v1"}), &workspace).await.unwrap();
        let second = file_write(&json!({"path": "a.txt", "content": "v2"}), &workspace).await.unwrap();
        assert_eq!(second.diff.as_ref().unwrap().change_type, ChangeType::Modified);

        let on_disk = tokio::fs::read_to_string(dir.path().join("a.txt")).await.unwrap();
        assert_eq!(Some(on_disk), second.diff.unwrap().after_content);
    }

    #[tokio::test]
    async fn edit_replace_applies_in_order() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        file_write(&json!({"path": "a.txt", "content": "one\ntwo\nthree"}), &workspace).await.unwrap();
        let ops = json!([{"type": "replace", "line_start": 2, "line_end": 2, "content": "TWO"}]);
        let result = file_edit(&json!({"path": "a.txt", "ops": ops}), &workspace).await.unwrap();
        assert!(result.success);
        assert_eq!(result.diff.unwrap().after_content.unwrap(), "one\nTWO\nthree\n");
    }

    #[tokio::test]
    async fn edit_rejects_out_of_range_without_writing() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        file_write(&json!({"path": "a.txt", "content": "one"}), &workspace).await.unwrap();
        let ops = json!([{"type": "replace", "line_start": 5, "line_end": 5, "content": "x"}]);
        let result = file_edit(&json!({"path": "a.txt", "ops": ops}), &workspace).await.unwrap();
        assert!(!result.success);
        let on_disk = tokio::fs::read_to_string(dir.path().join("a.txt")).await.unwrap();
        assert_eq!(on_disk, "one");
    }

    #[tokio::test]
    async fn listing_unchanged_directory_is_idempotent() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        file_write(&json!({"path": "a.txt", "content": "x"}), &workspace).await.unwrap();
        let first = list_directory(&json!({}), &workspace).await.unwrap();
        let second = list_directory(&json!({}), &workspace).await.unwrap();
        assert_eq!(first.output, second.output);
    }
}
