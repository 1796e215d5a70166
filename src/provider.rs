//! The external LLM streaming provider the loop consumes from.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Message, ToolDescriptor};

/// A request for one streamed model turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
    pub temperature: f32,
    pub user_id: Option<String>,
}

/// One event in a provider's stream, the minimal shape the loop requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderEvent {
    TextDelta { text: String },
    ToolUseStart { index: usize, id: String, name: String },
    /// Cumulative JSON text for the tool call at `index`; the last one
    /// received before completion is the call's full argument string.
    ToolUseDelta { index: usize, partial_json: String },
    ToolUseComplete { index: usize },
    MessageStop,
}

/// The external streaming chat provider.
///
/// Implementations talk to a concrete LLM gateway; the engine only depends
/// on this trait so it can be driven by a scripted fake in tests.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn stream(&self, request: ChatRequest) -> Result<BoxStream<'static, Result<ProviderEvent>>>;
}

/// The external retrieval-augmentation service PREPARE optionally consults.
///
/// Raced under `RAG_CONTEXT_DEADLINE_MS` (default 200ms); a timeout or `Ok(None)`
/// both mean "no augmentation", never a request failure.
#[async_trait]
pub trait RagProvider: Send + Sync {
    async fn augment(&self, query: &str) -> Result<Option<String>>;
}
