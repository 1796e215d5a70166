//! Convenience re-exports for consumers of this crate.

pub use crate::agentic_loop::{AgenticLoop, RunRequest};
pub use crate::config::EngineConfig;
pub use crate::error::{EngineError, Result};
pub use crate::events::AgentEvent;
pub use crate::guardrails::{GuardrailCheck, GuardrailVerdict, NoopGuardrail};
pub use crate::loop_state::{LoopState, WorkspaceConfig};
pub use crate::provider::{ChatProvider, ChatRequest, ProviderEvent, RagProvider};
pub use crate::registry::{EmptyRegistry, ToolRegistry};
pub use crate::types::{
    ChangeType, ContentPart, FileChangeRecord, FileDiff, Message, MessageRole, ToolCall, ToolDescriptor, ToolResult,
};
