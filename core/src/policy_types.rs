//! Wire types for the security policy service: inspection requests and
//! responses, verdicts, and user-confirmation records.

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Block,
    RequiredExplicitUserConfirmation,
    NeedMoreInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Ordering used by the `MIN_BLOCK_SEVERITY` filter. An unknown severity
    /// is treated as `high`.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High | Severity::Unknown => 2,
            Severity::Critical => 3,
        }
    }

    pub fn parse(value: &str) -> Severity {
        match value.to_ascii_lowercase().as_str() {
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }
}

/// The policy service's answer to an inspection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub decision: Decision,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub need_fields: Vec<String>,
    #[serde(default)]
    pub call_type: Option<String>,
    #[serde(default)]
    pub matched_rules: Vec<String>,
}

impl PolicyVerdict {
    pub fn allow() -> Self {
        PolicyVerdict {
            decision: Decision::Allow,
            severity: Severity::Low,
            reasons: Vec::new(),
            need_fields: Vec::new(),
            call_type: None,
            matched_rules: Vec::new(),
        }
    }

    /// Local fallback when the policy service is unreachable or errors.
    /// Indistinguishable from a genuine block downstream.
    pub fn api_failure(error: &dyn std::fmt::Display) -> Self {
        PolicyVerdict {
            decision: Decision::Block,
            severity: Severity::High,
            reasons: vec![format!("Security API unavailable: {error}")],
            need_fields: Vec::new(),
            call_type: None,
            matched_rules: vec!["security_api.error".to_string()],
        }
    }
}

/// Agent-supplied intent metadata carried in the `__wrapper_*` arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    #[serde(default)]
    pub last_user_prompt: String,
    #[serde(default)]
    pub context_summary: String,
    #[serde(default)]
    pub user_prompt_id: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub expected_outputs: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceContext {
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub current_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub session_id: String,
    #[serde(default)]
    pub workspace: WorkspaceContext,
    pub client: String,
    pub client_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRef {
    pub name: String,
    pub transport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTool {
    pub name: String,
    pub method: String,
}

/// Request-direction inspection payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub event_id: String,
    pub server: ServerRef,
    pub tool: PolicyTool,
    pub agent_context: AgentContext,
    pub env_context: EnvironmentContext,
    pub arguments: serde_json::Value,
}

/// Response-direction inspection payload. `response_content` is the
/// serialized result the wrapped server produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub event_id: String,
    pub server: ServerRef,
    pub tool: PolicyTool,
    pub agent_context: AgentContext,
    pub env_context: EnvironmentContext,
    pub response_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitRequest {
    pub environment: EnvironmentContext,
    pub server: ServerRef,
    pub tools: Vec<ToolRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserDecision {
    #[serde(rename = "ALLOW")]
    Allow,
    #[serde(rename = "ALLOW_ALWAYS")]
    AllowAlways,
    #[serde(rename = "BLOCK")]
    Block,
}

impl UserDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserDecision::Allow => "ALLOW",
            UserDecision::AllowAlways => "ALLOW_ALWAYS",
            UserDecision::Block => "BLOCK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

/// Echo of a dialog outcome, posted to `/confirm` best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfirmation {
    pub event_id: String,
    pub direction: Direction,
    pub user_decision: UserDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_defaults_missing_severity_to_unknown() {
        let verdict: PolicyVerdict =
            serde_json::from_value(json!({"decision": "block"})).unwrap();
        assert_eq!(verdict.severity, Severity::Unknown);
        assert_eq!(verdict.severity.rank(), Severity::High.rank());
    }

    #[test]
    fn verdict_parses_server_shape() {
        let verdict: PolicyVerdict = serde_json::from_value(json!({
            "decision": "need_more_info",
            "severity": "medium",
            "reasons": ["missing intent"],
            "need_fields": ["context.agent.intent"],
            "call_type": null
        }))
        .unwrap();
        assert_eq!(verdict.decision, Decision::NeedMoreInfo);
        assert_eq!(verdict.need_fields, vec!["context.agent.intent"]);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low.rank() < Severity::Medium.rank());
        assert!(Severity::Medium.rank() < Severity::High.rank());
        assert!(Severity::High.rank() < Severity::Critical.rank());
        assert_eq!(Severity::Unknown.rank(), Severity::High.rank());
    }

    #[test]
    fn user_decision_wire_names() {
        assert_eq!(
            serde_json::to_value(UserDecision::AllowAlways).unwrap(),
            json!("ALLOW_ALWAYS")
        );
        assert_eq!(serde_json::to_value(Direction::Request).unwrap(), json!("request"));
    }

    #[test]
    fn api_failure_verdict_shape() {
        let verdict = PolicyVerdict::api_failure(&"connection refused");
        assert_eq!(verdict.decision, Decision::Block);
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(verdict.matched_rules, vec!["security_api.error"]);
        assert!(verdict.reasons[0].starts_with("Security API unavailable:"));
    }
}
