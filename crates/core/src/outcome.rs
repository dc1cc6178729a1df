use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform result envelope for one capability invocation.
///
/// Exactly one invocation produces exactly one envelope. `partial == Some(true)`
/// marks a degraded or timed-out outcome: callers must not trust `data` when
/// `partial` is set alongside `error`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
}

impl ToolOutcome {
    pub fn success(data: Value) -> Self {
        Self { data: Some(data), error: None, partial: None }
    }

    /// Failure envelope for a handler-level error. `partial` is set exactly
    /// when the message mentions a timeout, so degraded upstream results are
    /// distinguishable from actionable argument/query errors.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let partial = message.to_ascii_lowercase().contains("timeout").then_some(true);
        Self { data: None, error: Some(message), partial }
    }

    /// Envelope returned when the dispatcher's own deadline fires.
    pub fn timed_out(deadline_secs: u64) -> Self {
        Self {
            data: None,
            error: Some(format!("Tool timeout ({deadline_secs}s)")),
            partial: Some(true),
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self { data: None, error: Some(format!("Unknown tool: {name}")), partial: None }
    }

    pub fn is_partial(&self) -> bool {
        self.partial == Some(true)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
