//! End-to-end scenarios driving the agentic loop against a scripted provider.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use agentic_core::prelude::*;
use agentic_core::provider::ProviderEvent;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

/// Plays back one scripted turn per call to `stream`, advancing by an
/// internal counter. Ignores the request content — tests script turns by
/// position, not by reading back what was sent.
struct FakeProvider {
    turns: Vec<Vec<ProviderEvent>>,
    call_count: AtomicUsize,
}

impl FakeProvider {
    fn new(turns: Vec<Vec<ProviderEvent>>) -> Self {
        Self { turns, call_count: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn stream(&self, _request: ChatRequest) -> Result<BoxStream<'static, Result<ProviderEvent>>> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        let events = self.turns.get(index).cloned().unwrap_or_default();
        Ok(stream::iter(events.into_iter().map(Ok)).boxed())
    }
}

fn tool_use(index: usize, id: &str, name: &str, args: &str) -> Vec<ProviderEvent> {
    vec![
        ProviderEvent::ToolUseStart { index, id: id.into(), name: name.into() },
        ProviderEvent::ToolUseDelta { index, partial_json: args.into() },
        ProviderEvent::ToolUseComplete { index },
        ProviderEvent::MessageStop,
    ]
}

fn text_turn(text: &str) -> Vec<ProviderEvent> {
    vec![ProviderEvent::TextDelta { text: text.into() }, ProviderEvent::MessageStop]
}

fn request(workspace: WorkspaceConfig, messages: Vec<Message>) -> RunRequest {
    RunRequest {
        model: "test-model".into(),
        mode: "code".into(),
        system_prompt: "You are a helpful engineering assistant.".into(),
        messages,
        workspace,
        registries: Vec::new(),
        guardrail: Arc::new(NoopGuardrail),
        autonomous: false,
        user_id: None,
        rag_provider: None,
    }
}

async fn run_to_completion(provider: FakeProvider, config: EngineConfig, req: RunRequest) -> Vec<AgentEvent> {
    let loop_engine = AgenticLoop::new(Arc::new(provider), config);
    let abort = Arc::new(AtomicBool::new(false));
    let stream = loop_engine.run_streamed(req, abort);
    tokio::pin!(stream);
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.expect("scenario should not error"));
    }
    events
}

#[tokio::test]
async fn s1_single_tool_then_terminal_text() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/a.ts"), "").unwrap();
    std::fs::write(dir.path().join("src/b.ts"), "").unwrap();
    std::fs::write(dir.path().join("src/c.ts"), "").unwrap();

    let provider = FakeProvider::new(vec![
        tool_use(0, "call_1", "list_directory", r#"{"path":"src"}"#),
        text_turn("Found 3 files."),
    ]);

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let req = request(workspace, vec![Message::user("list files in src")]);
    let events = run_to_completion(provider, EngineConfig::default(), req).await;

    let tool_result = events.iter().find_map(|e| match e {
        AgentEvent::ToolResult { output, success, .. } => Some((output.clone(), *success)),
        _ => None,
    });
    assert_eq!(tool_result, Some(("a.ts\nb.ts\nc.ts".to_string(), true)));

    let has_final_text = events.iter().any(|e| matches!(e, AgentEvent::Text { text } if text.contains("Found 3 files")));
    assert!(has_final_text);
    assert!(matches!(events.last(), Some(AgentEvent::Done)));
}

#[tokio::test]
async fn s2_dangerous_command_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::new(vec![
        tool_use(0, "call_1", "bash_execute", r#"{"command":"rm -rf /"}"#),
        text_turn("Understood, I will not run that."),
    ]);

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let req = request(workspace, vec![Message::user("delete everything")]);
    let events = run_to_completion(provider, EngineConfig::default(), req).await;

    let blocked = events.iter().any(|e| matches!(e, AgentEvent::ToolResult { success: false, output, .. } if output.contains("Dangerous command blocked")));
    assert!(blocked);
    assert!(dir.path().exists());
}

/// Three simultaneous `tool_use` blocks in one turn, as a provider would
/// stream them interleaved by index before a single `MessageStop`.
fn parallel_tool_use(calls: &[(usize, &str, &str, &str)]) -> Vec<ProviderEvent> {
    let mut events = Vec::new();
    for (index, id, name, args) in calls {
        events.push(ProviderEvent::ToolUseStart { index: *index, id: (*id).into(), name: (*name).into() });
        events.push(ProviderEvent::ToolUseDelta { index: *index, partial_json: (*args).into() });
    }
    for (index, ..) in calls {
        events.push(ProviderEvent::ToolUseComplete { index: *index });
    }
    events.push(ProviderEvent::MessageStop);
    events
}

#[tokio::test]
async fn s3_parallel_tool_calls_preserve_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();
    std::fs::write(dir.path().join("b.txt"), "b").unwrap();
    std::fs::write(dir.path().join("c.txt"), "c").unwrap();

    let provider = FakeProvider::new(vec![
        parallel_tool_use(&[
            (0, "call_a", "file_read", r#"{"path":"a.txt"}"#),
            (1, "call_b", "file_read", r#"{"path":"b.txt"}"#),
            (2, "call_c", "file_read", r#"{"path":"c.txt"}"#),
        ]),
        text_turn("Read all three files."),
    ]);

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let req = request(workspace, vec![Message::user("read a, b, and c")]);
    let events = run_to_completion(provider, EngineConfig::default(), req).await;

    let results: Vec<(String, String)> =
        events.iter().filter_map(|e| match e { AgentEvent::ToolResult { id, output, .. } => Some((id.clone(), output.clone())), _ => None }).collect();

    assert_eq!(
        results,
        vec![
            ("call_a".to_string(), "a".to_string()),
            ("call_b".to_string(), "b".to_string()),
            ("call_c".to_string(), "c".to_string()),
        ]
    );
    assert!(matches!(events.last(), Some(AgentEvent::Done)));
}

#[tokio::test]
async fn s4_tool_timeout_then_continues() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::new(vec![
        tool_use(0, "call_1", "bash_execute", r#"{"command":"sleep 5"}"#),
        text_turn("Done."),
    ]);

    let mut config = EngineConfig::default();
    config.tool_execution_timeout_ms = 100;

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let req = request(workspace, vec![Message::user("sleep")]);
    let events = run_to_completion(provider, config, req).await;

    let timed_out = events.iter().any(|e| matches!(e, AgentEvent::ToolResult { success: false, output, .. } if output.contains("timed out after")));
    assert!(timed_out);
}

#[tokio::test]
async fn s5_max_turns_reached() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "x").unwrap();

    let turns = (0..5).map(|i| tool_use(0, &format!("call_{i}"), "file_read", r#"{"path":"a.txt"}"#)).collect();
    let provider = FakeProvider::new(turns);

    let mut config = EngineConfig::default();
    config.max_tool_turns = 3;

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let req = request(workspace, vec![Message::user("keep reading")]);
    let events = run_to_completion(provider, config, req).await;

    let progress_count = events.iter().filter(|e| matches!(e, AgentEvent::AgenticProgress { .. })).count();
    assert_eq!(progress_count, 3);

    let limit_notice = events.iter().any(|e| matches!(e, AgentEvent::Text { text } if text.contains("maximum tool execution limit")));
    assert!(limit_notice);
    assert!(matches!(events.last(), Some(AgentEvent::Done)));
}

struct FakeRagProvider {
    context: Option<&'static str>,
}

#[async_trait]
impl RagProvider for FakeRagProvider {
    async fn augment(&self, _query: &str) -> Result<Option<String>> {
        Ok(self.context.map(str::to_string))
    }
}

struct StalledRagProvider;

#[async_trait]
impl RagProvider for StalledRagProvider {
    async fn augment(&self, _query: &str) -> Result<Option<String>> {
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        Ok(Some("too late".to_string()))
    }
}

#[tokio::test]
async fn s7_retrieval_augmentation_folds_into_system_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::new(vec![text_turn("Answered with context.")]);

    let mut config = EngineConfig::default();
    config.rag_context_enabled = true;

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let mut req = request(workspace, vec![Message::user("what's the deploy process")]);
    req.rag_provider = Some(Arc::new(FakeRagProvider { context: Some("deploy via `make release`") }));

    let events = run_to_completion(provider, config, req).await;
    assert!(matches!(events.last(), Some(AgentEvent::Done)));
}

#[tokio::test]
async fn s7_retrieval_augmentation_deadline_is_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::new(vec![text_turn("Answered without context.")]);

    let mut config = EngineConfig::default();
    config.rag_context_enabled = true;
    config.rag_context_deadline_ms = 50;

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let mut req = request(workspace, vec![Message::user("what's the deploy process")]);
    req.rag_provider = Some(Arc::new(StalledRagProvider));

    let events = run_to_completion(provider, config, req).await;
    let has_final_text = events.iter().any(|e| matches!(e, AgentEvent::Text { text } if text.contains("Answered without context")));
    assert!(has_final_text);
    assert!(matches!(events.last(), Some(AgentEvent::Done)));
}

#[tokio::test]
async fn s6_path_outside_workspace_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::new(vec![
        tool_use(0, "call_1", "file_read", r#"{"path":"/etc/passwd"}"#),
        text_turn("Can't read that."),
    ]);

    let workspace = WorkspaceConfig::new(dir.path().to_path_buf());
    let req = request(workspace, vec![Message::user("read /etc/passwd")]);
    let events = run_to_completion(provider, EngineConfig::default(), req).await;

    let rejected = events.iter().any(|e| matches!(e, AgentEvent::ToolResult { success: false, .. }));
    assert!(rejected);
}
