//! `bash_execute`: run a shell command inside the workspace, guarded by the
//! dangerous-command denylist and a hard timeout.

use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::command_safety;
use crate::error::Result;
use crate::loop_state::WorkspaceConfig;
use crate::path_policy::{self, PolicyDecision};
use crate::types::ToolResult;

use super::{optional_str, required_str};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_TIMEOUT_SECS: u64 = 120;

pub async fn bash_execute(input: &serde_json::Value, workspace: &WorkspaceConfig) -> Result<ToolResult> {
    let started = Instant::now();

    let command = match required_str(input, "command") {
        Ok(c) => c,
        Err(message) => return Ok(ToolResult::fail(message, elapsed_ms(started))),
    };

    if command_safety::is_dangerous(command) {
        warn!(command, "blocked dangerous command");
        return Ok(ToolResult::fail("Dangerous command blocked", elapsed_ms(started)));
    }

    let cwd = match optional_str(input, "cwd") {
        Some(requested) => match path_policy::resolve(workspace, requested) {
            PolicyDecision::Allowed(path) => path,
            PolicyDecision::Blocked(reason) => return Ok(ToolResult::fail(reason, elapsed_ms(started))),
        },
        None => workspace.root.clone(),
    };

    let timeout_secs = input
        .get("timeoutMs")
        .and_then(serde_json::Value::as_u64)
        .map(|ms| (ms / 1000).clamp(1, MAX_TIMEOUT_SECS))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command).current_dir(&cwd).kill_on_drop(true);

    let output = match timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(io_err)) => return Ok(ToolResult::fail(format!("failed to spawn command: {io_err}"), elapsed_ms(started))),
        Err(_) => {
            return Ok(ToolResult::fail(
                format!("Tool 'bash_execute' timed out after {timeout_secs}s"),
                elapsed_ms(started),
            ));
        }
    };

    let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        merged.push_str(&String::from_utf8_lossy(&output.stderr));
    }

    let exit_code = output.status.code().unwrap_or(-1);
    let elapsed = elapsed_ms(started);
    let result = if output.status.success() {
        ToolResult::ok(merged, elapsed)
    } else {
        ToolResult { success: false, output: Some(merged), error: Some(format!("exit status {exit_code}")), execution_time_ms: elapsed, exit_code: Some(exit_code), diff: None }
    };
    Ok(result.with_exit_code(exit_code))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
