//! Resolves a tool call by name and runs it, wrapped by guardrails and a
//! span, converting any unexpected failure into a `ToolResult`.

use std::time::Instant;

use serde_json::Value;
use tracing::{field::Empty, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::guardrails::{GuardrailAction, GuardrailCheck, FILTERED_OUTPUT_PLACEHOLDER};
use crate::loop_state::WorkspaceConfig;
use crate::registry::ToolRegistry;
use crate::tools;
use crate::types::{ToolCall, ToolResult};

/// Routes `call` to a skill/user/MCP/built-in executor, applying guardrails
/// around every dispatch except the unknown-tool case.
///
/// # Errors
/// Only propagates [`crate::error::EngineError`] for request-level problems
/// surfaced by a registry; ordinary tool failures are `Ok(ToolResult{success:false,..})`.
pub async fn dispatch(
    call: &ToolCall,
    workspace: &WorkspaceConfig,
    registries: &[&dyn ToolRegistry],
    guardrail: &dyn GuardrailCheck,
    config: &EngineConfig,
) -> Result<ToolResult> {
    let span = info_span!(
        "tool",
        tool.name = %call.name,
        tool.id = %call.id,
        tool.success = Empty,
        tool.execution_time_ms = Empty,
    );
    async { dispatch_inner(call, workspace, registries, guardrail, config).await }
        .instrument(span)
        .await
}

async fn dispatch_inner(
    call: &ToolCall,
    workspace: &WorkspaceConfig,
    registries: &[&dyn ToolRegistry],
    guardrail: &dyn GuardrailCheck,
    config: &EngineConfig,
) -> Result<ToolResult> {
    let started = Instant::now();
    let input = call.input.clone().unwrap_or(Value::Null);

    let resolution = resolve_executor(&call.name, registries);

    let Some(executor) = resolution else {
        return Ok(ToolResult::fail(format!("Unknown tool: {}", call.name), elapsed_ms(started)));
    };

    if workspace.guardrails_enabled {
        let verdict = guardrail.check_input(&call.name, &input).await?;
        if !verdict.passed {
            warn!(tool = %call.name, policies = ?verdict.triggered_policies, "guardrail blocked input");
            return Ok(ToolResult::fail(
                format!("Blocked by guardrails: {}", verdict.triggered_policies.join(", ")),
                elapsed_ms(started),
            ));
        }
    }

    let mut result = match executor {
        Executor::Builtin => match tools::dispatch_builtin(&call.name, &input, workspace, config.enable_git_push).await {
            Ok(result) => result,
            Err(e) => ToolResult::fail(format!("tool execution failed: {e}"), elapsed_ms(started)),
        },
        Executor::Registry(registry) => match registry.execute(&call.name, &input).await {
            Ok(result) => result,
            Err(e) => ToolResult::fail(format!("tool execution failed: {e}"), elapsed_ms(started)),
        },
    };

    if workspace.guardrails_enabled && result.success {
        let output_value = Value::String(result.output.clone().unwrap_or_default());
        let verdict = guardrail.check_output(&call.name, &output_value).await?;
        if !verdict.passed && verdict.action == Some(GuardrailAction::Block) {
            result.output = Some(FILTERED_OUTPUT_PLACEHOLDER.to_string());
        }
    }

    tracing::Span::current().record("tool.success", result.success);
    tracing::Span::current().record("tool.execution_time_ms", result.execution_time_ms);

    Ok(result)
}

enum Executor<'a> {
    Builtin,
    Registry(&'a dyn ToolRegistry),
}

fn resolve_executor<'a>(name: &str, registries: &[&'a dyn ToolRegistry]) -> Option<Executor<'a>> {
    if name.starts_with("skill_") {
        return registries.iter().find(|r| r.has(name)).map(|r| Executor::Registry(*r));
    }
    if let Some(registry) = registries.iter().find(|r| r.has(name)) {
        return Some(Executor::Registry(*registry));
    }
    if tools::is_builtin(name) {
        return Some(Executor::Builtin);
    }
    None
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrails::NoopGuardrail;
    use crate::registry::EmptyRegistry;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn unknown_tool_returns_failure_without_guardrails() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        let call = ToolCall { id: "1".into(), name: "nonexistent".into(), input: Some(json!({})), raw: None };
        let registry = EmptyRegistry;
        let registries: Vec<&dyn ToolRegistry> = vec![&registry];
        let guardrail = NoopGuardrail;
        let config = EngineConfig::default();
        let result = dispatch(&call, &workspace, &registries, &guardrail, &config).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn dispatches_to_builtin_tool() {
        let dir = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
        let call = ToolCall {
            id: "1".into(),
            name: "list_directory".into(),
            input: Some(json!({})),
            raw: None,
        };
        let registry = EmptyRegistry;
        let registries: Vec<&dyn ToolRegistry> = vec![&registry];
        let guardrail = NoopGuardrail;
        let config = EngineConfig::default();
        let result = dispatch(&call, &workspace, &registries, &guardrail, &config).await.unwrap();
        assert!(result.success);
    }
}
