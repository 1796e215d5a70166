//! `git_status`, `git_diff`, `git_log`, `git_commit`, `git_branch`, `git_push`.

use std::time::Instant;

use tokio::process::Command;

use crate::error::Result;
use crate::loop_state::WorkspaceConfig;
use crate::types::ToolResult;

use super::optional_str;

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

async fn run_git(workspace: &WorkspaceConfig, args: &[&str]) -> std::io::Result<std::process::Output> {
    Command::new("git").args(args).current_dir(&workspace.root).output().await
}

fn result_from_output(output: std::process::Output, started: Instant) -> ToolResult {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        text.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    let elapsed = elapsed_ms(started);
    let exit_code = output.status.code().unwrap_or(-1);
    if output.status.success() {
        ToolResult::ok(text, elapsed).with_exit_code(exit_code)
    } else {
        ToolResult::fail(if text.is_empty() { format!("git exited with status {exit_code}") } else { text }, elapsed)
            .with_exit_code(exit_code)
    }
}

pub async fn git_status(_input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    match run_git(workspace, &["status", "--short", "--branch"]).await {
        Ok(output) => Ok(result_from_output(output, started)),
        Err(e) => Ok(ToolResult::fail(format!("failed to run git: {e}"), elapsed_ms(started))),
    }
}

pub async fn git_diff(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let mut args = vec!["diff"];
    if let Some(path) = optional_str(input, "path") {
        args.push(path);
    }
    match run_git(workspace, &args).await {
        Ok(output) => Ok(result_from_output(output, started)),
        Err(e) => Ok(ToolResult::fail(format!("failed to run git: {e}"), elapsed_ms(started))),
    }
}

pub async fn git_log(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let limit = input.get("limit").and_then(serde_json::Value::as_u64).unwrap_or(20);
    let limit_flag = format!("-{limit}");
    let args = vec!["log", "--oneline", &limit_flag];
    match run_git(workspace, &args).await {
        Ok(output) => Ok(result_from_output(output, started)),
        Err(e) => Ok(ToolResult::fail(format!("failed to run git: {e}"), elapsed_ms(started))),
    }
}

pub async fn git_commit(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let message = match super::required_str(input, "message") {
        Ok(m) => m,
        Err(e) => return Ok(ToolResult::fail(e, elapsed_ms(started))),
    };
    let add_all = input.get("addAll").and_then(serde_json::Value::as_bool).unwrap_or(true);

    if add_all {
        if let Err(e) = run_git(workspace, &["add", "-A"]).await {
            return Ok(ToolResult::fail(format!("failed to stage changes: {e}"), elapsed_ms(started)));
        }
    }

    match run_git(workspace, &["commit", "-m", message]).await {
        Ok(output) => Ok(result_from_output(output, started)),
        Err(e) => Ok(ToolResult::fail(format!("failed to run git: {e}"), elapsed_ms(started))),
    }
}

pub async fn git_branch(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();
    let create = input.get("create").and_then(serde_json::Value::as_bool).unwrap_or(false);

    if create {
        let name = match super::required_str(input, "name") {
            Ok(n) => n,
            Err(e) => return Ok(ToolResult::fail(e, elapsed_ms(started))),
        };
        return match run_git(workspace, &["checkout", "-b", name]).await {
            Ok(output) => Ok(result_from_output(output, started)),
            Err(e) => Ok(ToolResult::fail(format!("failed to run git: {e}"), elapsed_ms(started))),
        };
    }

    match run_git(workspace, &["branch", "--list"]).await {
        Ok(output) => Ok(result_from_output(output, started)),
        Err(e) => Ok(ToolResult::fail(format!("failed to run git: {e}"), elapsed_ms(started))),
    }
}

pub async fn git_push(_input: &serde_json::Value, workspace: &WorkspaceConfig, enabled: bool) -> Result<ToolResult> {
    let started = Instant::now();
    if !enabled {
        return Ok(ToolResult::fail("git_push is disabled", elapsed_ms(started)));
    }
    match run_git(workspace, &["push"]).await {
        Ok(output) => Ok(result_from_output(output, started)),
        Err(e) => Ok(ToolResult::fail(format!("failed to run git: {e}"), elapsed_ms(started))),
    }
}
