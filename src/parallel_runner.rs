//! Bounded-parallel tool execution: chunks of `≤ concurrency` calls run
//! concurrently, each racing a per-call timeout, with results preserved in
//! the calls' original order regardless of completion order.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;

use crate::config::EngineConfig;
use crate::dispatcher;
use crate::error::Result;
use crate::guardrails::GuardrailCheck;
use crate::loop_state::WorkspaceConfig;
use crate::registry::ToolRegistry;
use crate::types::{ToolCall, ToolResult};

/// Runs every call in `calls`, `concurrency` at a time, preserving input order.
///
/// A single call timing out or failing never cancels its siblings in the
/// same chunk; the timeout produces a synthesized failure result rather
/// than propagating an error.
pub async fn execute_tool_calls(
    calls: &[ToolCall],
    workspace: &WorkspaceConfig,
    registries: &[&dyn ToolRegistry],
    guardrail: &dyn GuardrailCheck,
    config: &EngineConfig,
) -> Result<Vec<ToolResult>> {
    let concurrency = config.tool_parallel_limit.max(1);
    let per_call_timeout = Duration::from_millis(config.tool_execution_timeout_ms);

    let mut results = Vec::with_capacity(calls.len());
    for chunk in calls.chunks(concurrency) {
        let futures = chunk.iter().map(|call| execute_one(call, workspace, registries, guardrail, config, per_call_timeout));
        let chunk_results = join_all(futures).await;
        for result in chunk_results {
            results.push(result?);
        }
    }
    Ok(results)
}

async fn execute_one(
    call: &ToolCall,
    workspace: &WorkspaceConfig,
    registries: &[&dyn ToolRegistry],
    guardrail: &dyn GuardrailCheck,
    config: &EngineConfig,
    per_call_timeout: Duration,
) -> Result<ToolResult> {
    if call.is_malformed() {
        return Ok(ToolResult::fail(
            "Invalid JSON arguments for tool call, please retry with valid JSON".to_string(),
            0,
        ));
    }

    match timeout(per_call_timeout, dispatcher::dispatch(call, workspace, registries, guardrail, config)).await {
        Ok(inner) => inner,
        Err(_) => Ok(ToolResult::fail(
            format!("Tool '{}' timed out after {}s", call.name, per_call_timeout.as_secs()),
            per_call_timeout.as_millis() as u64,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrails::NoopGuardrail;
    use crate::registry::EmptyRegistry;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn preserves_input_order_across_a_chunk() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("c.txt"), "c").unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());

        let calls = vec![
            ToolCall { id: "A".into(), name: "file_read".into(), input: Some(json!({"path": "a.txt"})), raw: None },
            ToolCall { id: "B".into(), name: "file_read".into(), input: Some(json!({"path": "b.txt"})), raw: None },
            ToolCall { id: "C".into(), name: "file_read".into(), input: Some(json!({"path": "c.txt"})), raw: None },
        ];

        let registry = EmptyRegistry;
        let registries: Vec<&dyn ToolRegistry> = vec![&registry];
        let guardrail = NoopGuardrail;
        let mut config = EngineConfig::default();
        config.tool_parallel_limit = 5;

        let results = execute_tool_calls(&calls, &workspace, &registries, &guardrail, &config).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].output.as_deref(), Some("a"));
        assert_eq!(results[1].output.as_deref(), Some("b"));
        assert_eq!(results[2].output.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn malformed_call_produces_retry_prompt_without_executing() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        let calls = vec![ToolCall { id: "X".into(), name: "file_read".into(), input: None, raw: Some("{bad".into()) }];
        let registry = EmptyRegistry;
        let registries: Vec<&dyn ToolRegistry> = vec![&registry];
        let guardrail = NoopGuardrail;
        let config = EngineConfig::default();
        let results = execute_tool_calls(&calls, &workspace, &registries, &guardrail, &config).await.unwrap();
        assert!(!results[0].success);
        assert!(results[0].error.as_ref().unwrap().contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn timeout_produces_synthesized_failure() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        let calls = vec![ToolCall { id: "T".into(), name: "bash_execute".into(), input: Some(json!({"command": "sleep 5"})), raw: None }];
        let registry = EmptyRegistry;
        let registries: Vec<&dyn ToolRegistry> = vec![&registry];
        let guardrail = NoopGuardrail;
        let mut config = EngineConfig::default();
        config.tool_execution_timeout_ms = 100;
        let results = execute_tool_calls(&calls, &workspace, &registries, &guardrail, &config).await.unwrap();
        assert!(!results[0].success);
        assert!(results[0].error.as_ref().unwrap().contains("timed out after"));
    }
}
