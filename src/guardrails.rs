//! Input/output policy filters applied around tool dispatch.
//!
//! Adapted from the tripwire concept used for whole-conversation guardrails:
//! here the check runs per tool call, before (`check_input`) and after
//! (`check_output`) dispatch, rather than once per agent run.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// What a guardrail recommends doing with an output that did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardrailAction {
    /// Replace the output text with a filtered placeholder; keep `success`.
    Block,
    /// Record the violation but let the output through unchanged.
    Warn,
}

/// The result of a guardrail check.
#[derive(Debug, Clone)]
pub struct GuardrailVerdict {
    pub passed: bool,
    pub triggered_policies: Vec<String>,
    pub action: Option<GuardrailAction>,
}

impl GuardrailVerdict {
    #[must_use]
    pub const fn pass() -> Self {
        Self { passed: true, triggered_policies: Vec::new(), action: None }
    }

    #[must_use]
    pub fn block(policy: impl Into<String>) -> Self {
        Self { passed: false, triggered_policies: vec![policy.into()], action: Some(GuardrailAction::Block) }
    }

    #[must_use]
    pub fn warn(policy: impl Into<String>) -> Self {
        Self { passed: false, triggered_policies: vec![policy.into()], action: Some(GuardrailAction::Warn) }
    }
}

/// Checks a tool call's input before dispatch, or its output after.
#[async_trait]
pub trait GuardrailCheck: Send + Sync {
    async fn check_input(&self, tool_name: &str, input: &Value) -> Result<GuardrailVerdict>;
    async fn check_output(&self, tool_name: &str, output: &Value) -> Result<GuardrailVerdict>;
}

/// A no-op guardrail that passes everything; used when guardrails are
/// disabled for a workspace but the dispatcher still wants a uniform path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGuardrail;

#[async_trait]
impl GuardrailCheck for NoopGuardrail {
    async fn check_input(&self, _tool_name: &str, _input: &Value) -> Result<GuardrailVerdict> {
        Ok(GuardrailVerdict::pass())
    }

    async fn check_output(&self, _tool_name: &str, _output: &Value) -> Result<GuardrailVerdict> {
        Ok(GuardrailVerdict::pass())
    }
}

/// Placeholder text substituted for an output whose guardrail action is
/// [`GuardrailAction::Block`].
pub const FILTERED_OUTPUT_PLACEHOLDER: &str = "[Output filtered by guardrails]";

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_guardrail_always_passes() {
        let g = NoopGuardrail;
        let v = g.check_input("bash_execute", &Value::Null).await.unwrap();
        assert!(v.passed);
    }
}
