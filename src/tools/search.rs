//! `codebase_search`, `grep_search`, `file_outline` — read-only traversal
//! and text search over the workspace.

use std::time::Instant;

use grep_regex::RegexMatcher;
use grep_searcher::sinks::UTF8;
use grep_searcher::Searcher;
use ignore::WalkBuilder;

use crate::error::Result;
use crate::loop_state::WorkspaceConfig;
use crate::path_policy::{self, PolicyDecision};
use crate::types::ToolResult;

use super::{optional_str, required_str};

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

const MAX_MATCHES: usize = 200;

pub async fn grep_search(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let pattern = match required_str(input, "pattern") {
        Ok(p) => p,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };
    let requested_path = optional_str(input, "path").unwrap_or(".");
    let root = match path_policy::resolve(workspace, requested_path) {
        PolicyDecision::Allowed(path) => path,
        PolicyDecision::Blocked(reason) => return Ok(ToolResult::fail(reason, elapsed_ms(started))),
    };

    let matcher = match RegexMatcher::new(pattern) {
        Ok(m) => m,
        Err(e) => return Ok(ToolResult::fail(format!("invalid pattern: {e}"), elapsed_ms(started))),
    };

    let mut hits = Vec::new();
    for entry in WalkBuilder::new(&root).hidden(false).build().flatten() {
        if hits.len() >= MAX_MATCHES {
            break;
        }
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path().to_path_buf();
        let mut searcher = Searcher::new();
        let matcher_ref = &matcher;
        let path_for_sink = path.clone();
        let _ = searcher.search_path(
            matcher_ref,
            &path,
            UTF8(|line_number, line| {
                hits.push(format!("{}:{line_number}:{}", path_for_sink.display(), line.trim_end()));
                Ok(hits.len() < MAX_MATCHES)
            }),
        );
    }

    let output = if hits.is_empty() { "No matches found".to_string() } else { hits.join("\n") };
    Ok(ToolResult::ok(output, elapsed_ms(started)))
}

pub async fn codebase_search(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let query = match required_str(input, "query") {
        Ok(q) => q,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };
    let requested_path = optional_str(input, "path").unwrap_or(".");
    let root = match path_policy::resolve(workspace, requested_path) {
        PolicyDecision::Allowed(path) => path,
        PolicyDecision::Blocked(reason) => return Ok(ToolResult::fail(reason, elapsed_ms(started))),
    };

    let needle = query.to_lowercase();
    let mut hits = Vec::new();
    for entry in WalkBuilder::new(&root).hidden(false).build().flatten() {
        if hits.len() >= MAX_MATCHES {
            break;
        }
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if entry.path().to_string_lossy().to_lowercase().contains(&needle) {
            hits.push(entry.path().display().to_string());
        }
    }

    let output = if hits.is_empty() { "No matches found".to_string() } else { hits.join("\n") };
    Ok(ToolResult::ok(output, elapsed_ms(started)))
}

pub async fn file_outline(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let requested = match required_str(input, "path") {
        Ok(p) => p,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };
    let path = match path_policy::resolve(workspace, requested) {
        PolicyDecision::Allowed(path) => path,
        PolicyDecision::Blocked(reason) => return Ok(ToolResult::fail(reason, elapsed_ms(started))),
    };

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) => return Ok(ToolResult::fail(format!("failed to read '{requested}': {e}"), elapsed_ms(started))),
    };

    let outline: Vec<String> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| is_outline_worthy(line))
        .map(|(idx, line)| format!("{}: {}", idx + 1, line.trim()))
        .collect();

    let output = if outline.is_empty() { "No top-level items found".to_string() } else { outline.join("\n") };
    Ok(ToolResult::ok(output, elapsed_ms(started)))
}

fn is_outline_worthy(line: &str) -> bool {
    let trimmed = line.trim_start();
    const MARKERS: &[&str] = &["fn ", "pub fn ", "struct ", "pub struct ", "enum ", "pub enum ", "trait ", "pub trait ", "impl ", "class ", "def ", "function "];
    MARKERS.iter().any(|marker| trimmed.starts_with(marker))
}
