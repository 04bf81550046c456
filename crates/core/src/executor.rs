//! Agent executor contract: the boundary to the external coding agent.
//!
//! The orchestrator hands over structured prompt variables, the resolved
//! tool sets, and the tool-provider configuration; it gets back an outcome
//! with optional cost/duration metrics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Everything the external agent needs for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub prompt_variables: serde_json::Value,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub tool_config: serde_json::Value,
}

/// What the agent reported back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_turns: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// A failed outcome carrying only an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Runs the external agent.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    async fn execute(&self, request: AgentRequest) -> Result<ExecutionOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parses_partial_json() {
        let outcome: ExecutionOutcome =
            serde_json::from_str(r#"{"success": true, "cost_usd": 0.25}"#).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.cost_usd, Some(0.25));
        assert!(outcome.duration_ms.is_none());
    }

    #[test]
    fn failed_outcome_has_error() {
        let outcome = ExecutionOutcome::failed("boom");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }
}
