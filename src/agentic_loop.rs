//! The top-level agentic state machine: PREPARE, TURN_STREAM, TURN_DISPATCH,
//! TURN_APPEND, repeating until a text-only turn or the turn budget is
//! exhausted. Grounded in the turn-loop shape of a streaming agent runner,
//! generalized from "agent run" semantics to tool-dispatch-engine semantics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::context_shaper;
use crate::error::{EngineError, Result};
use crate::events::AgentEvent;
use crate::guardrails::GuardrailCheck;
use crate::loop_state::{LoopState, WorkspaceConfig};
use crate::output_filter;
use crate::parallel_runner;
use crate::provider::{ChatProvider, ChatRequest, ProviderEvent, RagProvider};
use crate::registry::ToolRegistry;
use crate::tools;
use crate::types::{Message, ToolCall, ToolDescriptor};

/// Everything one request needs to drive the loop, owned so the resulting
/// stream has no borrowed lifetime.
pub struct RunRequest {
    pub model: String,
    /// `"code"` skips tool-relevance filtering and keeps the full catalogue;
    /// any other mode applies the (external) relevance filter upstream of
    /// this request being built.
    pub mode: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub workspace: WorkspaceConfig,
    pub registries: Vec<Arc<dyn ToolRegistry>>,
    pub guardrail: Arc<dyn GuardrailCheck>,
    pub autonomous: bool,
    pub user_id: Option<String>,
    /// Consulted during PREPARE under a hard deadline when `rag_context_enabled`.
    pub rag_provider: Option<Arc<dyn RagProvider>>,
}

/// Drives the turn-structured loop against a [`ChatProvider`].
pub struct AgenticLoop {
    provider: Arc<dyn ChatProvider>,
    config: EngineConfig,
}

impl AgenticLoop {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    /// Runs `request` to completion, yielding the ordered event sequence.
    ///
    /// The stream is lazy and single-consumer; dropping it before
    /// completion is equivalent to letting `abort` fire.
    pub fn run_streamed(
        &self,
        request: RunRequest,
        abort: Arc<AtomicBool>,
    ) -> impl Stream<Item = Result<AgentEvent>> + 'static {
        let provider = self.provider.clone();
        let config = self.config.clone();
        let run_span = info_span!("agent_run", mode = %request.mode, max_turns = config.max_tool_turns);

        let inner = try_stream! {
            if request.autonomous {
                yield AgentEvent::Autonomous { value: true };
            }

            let registries: Vec<&dyn ToolRegistry> = request.registries.iter().map(|r| r.as_ref()).collect();
            let descriptors: Vec<ToolDescriptor> = collect_tool_descriptors(&registries, &config);

            let temperature = if request.mode == "code" || request.mode == "normal" { 0.1 } else { 0.4 };
            let max_tokens = if request.mode == "code" || request.mode == "normal" { config.max_tokens_code } else { config.max_tokens_other };

            let system_prompt = augment_system_prompt(&request, &config).await;

            let shaped_messages = context_shaper::shape_initial_history(request.messages.clone(), &config);
            let mut state = LoopState::new(shaped_messages);

            yield AgentEvent::Context { mode: request.mode.clone(), capabilities: None, tool_count: descriptors.len() };

            'turns: loop {
                if abort.load(Ordering::SeqCst) {
                    yield AgentEvent::Error { message: "Stream aborted".into(), error_type: "aborted".into(), retryable: false, retry_after: None };
                    return;
                }

                if state.reached_max_turns(config.max_tool_turns) {
                    yield AgentEvent::Text { text: "Reached maximum tool execution limit.".into() };
                    break 'turns;
                }

                state.record_turn_start();
                yield AgentEvent::AgenticProgress { current_turn: state.turn_index, max_turns: config.max_tool_turns, tool_call_count: state.total_tool_calls };

                if state.loop_messages.len() > config.max_loop_messages {
                    let trimmed = context_shaper::trim_loop_messages(std::mem::take(&mut state.loop_messages), config.max_loop_messages);
                    state.loop_messages = trimmed;
                }

                let chat_request = ChatRequest {
                    model: request.model.clone(),
                    max_tokens,
                    system: system_prompt.clone(),
                    messages: state.loop_messages.clone(),
                    tools: descriptors.clone(),
                    temperature,
                    user_id: request.user_id.clone(),
                };

                let turn_span = info_span!("turn", turn_index = state.turn_index);
                let mut provider_stream = match provider.stream(chat_request).instrument(turn_span.clone()).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        yield classify_provider_error(e);
                        return;
                    }
                };

                let mut turn_text = String::new();
                let mut pending_calls: Vec<PendingCall> = Vec::new();

                while let Some(event) = provider_stream.next().await {
                    if abort.load(Ordering::SeqCst) {
                        yield AgentEvent::Error { message: "Stream aborted".into(), error_type: "aborted".into(), retryable: false, retry_after: None };
                        return;
                    }
                    match event {
                        Ok(ProviderEvent::TextDelta { text }) => {
                            let filtered = output_filter::filter(&text);
                            turn_text.push_str(&filtered);
                            state.total_text_chars += filtered.len();
                            yield AgentEvent::Text { text: filtered };
                        }
                        Ok(ProviderEvent::ToolUseStart { index, id, name }) => {
                            pending_calls.push(PendingCall { index, id, name, json_buf: String::new() });
                        }
                        Ok(ProviderEvent::ToolUseDelta { index, partial_json }) => {
                            if let Some(call) = pending_calls.iter_mut().find(|c| c.index == index) {
                                call.json_buf.push_str(&partial_json);
                            }
                        }
                        Ok(ProviderEvent::ToolUseComplete { index }) => {
                            if let Some(call) = pending_calls.iter().find(|c| c.index == index) {
                                let tool_call = finalize_call(call);
                                yield AgentEvent::ToolCall { id: tool_call.id.clone(), name: tool_call.name.clone(), input: tool_call.input.clone().unwrap_or(Value::Null) };
                            }
                        }
                        Ok(ProviderEvent::MessageStop) => break,
                        Err(e) => {
                            yield classify_provider_error(e);
                            return;
                        }
                    }
                }

                let tool_calls: Vec<ToolCall> = pending_calls.iter().map(finalize_call).collect();

                if tool_calls.is_empty() && turn_text.trim().is_empty() {
                    state.record_empty_turn();
                    if state.should_stop_on_empty_turns() {
                        yield AgentEvent::Text { text: "The model returned empty responses; ending the run.".into() };
                        break 'turns;
                    }
                    state.loop_messages.push(Message::assistant(String::new(), vec![]));
                    continue 'turns;
                }
                state.record_non_empty_turn();

                if tool_calls.is_empty() {
                    break 'turns;
                }

                state.total_tool_calls += tool_calls.len();

                let results = parallel_runner::execute_tool_calls(&tool_calls, &request.workspace, &registries, request.guardrail.as_ref(), &config).await?;

                for (call, result) in tool_calls.iter().zip(results.iter()) {
                    let feedback = compress_feedback(&call.name, result);
                    yield AgentEvent::ToolResult {
                        id: call.id.clone(),
                        tool_name: call.name.clone(),
                        output: feedback,
                        success: result.success,
                        execution_time_ms: result.execution_time_ms,
                        diff: result.diff.clone(),
                    };

                    if tools::EXEC_TOOL_NAMES.contains(&call.name.as_str()) {
                        state.commands_run += 1;
                        if result.success {
                            state.commands_passed += 1;
                        }
                    }

                    if let Some(diff) = &result.diff {
                        state.file_changes.push(crate::types::FileChangeRecord::from_diff(diff, &call.name));
                    }
                }

                state.loop_messages.push(Message::assistant(turn_text, tool_calls.clone()));
                for (call, result) in tool_calls.iter().zip(results.iter()) {
                    state.loop_messages.push(Message::tool_response(call.id.clone(), result.feedback_text()));
                }
            }

            if !state.file_changes.is_empty() || state.commands_run > 0 {
                yield AgentEvent::FilesSummary {
                    files: state.file_changes.clone(),
                    commands_run: state.commands_run,
                    commands_passed: state.commands_passed,
                    total_turns: state.turn_index,
                };
            }

            yield AgentEvent::Done;
        };

        inner.instrument(run_span)
    }
}

/// PREPARE's retrieval-augmentation step: races the optional [`RagProvider`]
/// against `RAG_CONTEXT_DEADLINE_MS` and folds any returned context into the
/// system prompt. A timeout, error, or `Ok(None)` all mean "no augmentation";
/// none of them fail the request.
async fn augment_system_prompt(request: &RunRequest, config: &EngineConfig) -> String {
    if !config.rag_context_enabled {
        return request.system_prompt.clone();
    }
    let Some(rag) = &request.rag_provider else {
        return request.system_prompt.clone();
    };
    let Some(query) = request.messages.iter().rev().find(|m| m.role == crate::types::MessageRole::User) else {
        return request.system_prompt.clone();
    };
    let deadline = std::time::Duration::from_millis(config.rag_context_deadline_ms);
    match tokio::time::timeout(deadline, rag.augment(&query.text())).await {
        Ok(Ok(Some(context))) => format!("{}\n\nRelevant context:\n{context}", request.system_prompt),
        Ok(Ok(None)) => request.system_prompt.clone(),
        Ok(Err(e)) => {
            debug!(error = %e, "retrieval augmentation failed; continuing without context");
            request.system_prompt.clone()
        }
        Err(_) => {
            debug!(deadline_ms = config.rag_context_deadline_ms, "retrieval augmentation deadline exceeded");
            request.system_prompt.clone()
        }
    }
}

struct PendingCall {
    index: usize,
    id: String,
    name: String,
    json_buf: String,
}

fn finalize_call(pending: &PendingCall) -> ToolCall {
    match serde_json::from_str::<Value>(&pending.json_buf) {
        Ok(value) => ToolCall { id: pending.id.clone(), name: pending.name.clone(), input: Some(value), raw: None },
        Err(_) => ToolCall { id: pending.id.clone(), name: pending.name.clone(), input: None, raw: Some(pending.json_buf.clone()) },
    }
}

fn compress_feedback(tool_name: &str, result: &crate::types::ToolResult) -> String {
    if let Some(error) = &result.error {
        return context_shaper::compress_error(&output_filter::filter(error));
    }
    let output = output_filter::filter(&result.output.clone().unwrap_or_default());
    let kind = if tools::WRITE_TOOL_NAMES.contains(&tool_name) {
        context_shaper::ToolOutputKind::Write
    } else if tools::EXEC_TOOL_NAMES.contains(&tool_name) {
        context_shaper::ToolOutputKind::Exec
    } else {
        context_shaper::ToolOutputKind::ReadOrSearch
    };
    let path_hint = result.diff.as_ref().map(|d| d.file_path.as_str());
    context_shaper::compress_tool_output(kind, path_hint, &output)
}

fn collect_tool_descriptors(registries: &[&dyn ToolRegistry], config: &EngineConfig) -> Vec<ToolDescriptor> {
    let mut descriptors = tools::builtin_descriptors(config.enable_git_push);
    for registry in registries {
        descriptors.extend(registry.list());
    }
    descriptors
}

fn classify_provider_error(error: EngineError) -> AgentEvent {
    match error {
        EngineError::Provider { message, kind, retryable, retry_after } => {
            warn!(error = %message, kind = kind.as_str(), "provider error terminated run");
            AgentEvent::Error { message, error_type: kind.as_str().to_string(), retryable, retry_after }
        }
        other => {
            debug!(error = %other, "non-provider error terminated run");
            AgentEvent::Error { message: other.to_string(), error_type: "internal".into(), retryable: false, retry_after: None }
        }
    }
}
