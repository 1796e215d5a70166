//! External tool providers: user-defined tools, MCP tools, and skills.
//!
//! The dispatcher depends on exactly these three operations; any backing
//! store (an in-process map, an MCP client, a skill loader) can implement
//! this trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{ToolDescriptor, ToolResult};

/// A read-only, request-scoped snapshot of externally-registered tools.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Lists every tool this registry currently exposes.
    fn list(&self) -> Vec<ToolDescriptor>;

    /// Whether `name` is handled by this registry.
    fn has(&self, name: &str) -> bool;

    /// Executes `name` with `input`. Only called after `has(name)` is true.
    async fn execute(&self, name: &str, input: &Value) -> Result<ToolResult>;
}

/// An empty registry, used when a request has no user/MCP/skill tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRegistry;

#[async_trait]
impl ToolRegistry for EmptyRegistry {
    fn list(&self) -> Vec<ToolDescriptor> {
        Vec::new()
    }

    fn has(&self, _name: &str) -> bool {
        false
    }

    async fn execute(&self, name: &str, _input: &Value) -> Result<ToolResult> {
        Ok(ToolResult::fail(format!("Unknown tool: {name}"), 0))
    }
}
