//! HTTP client for the security policy service.
//!
//! Inspection calls are synchronous gates for the pipeline and fail closed:
//! any transport error or non-2xx status synthesizes a local block verdict.
//! `/init` and `/confirm` are best-effort and only log their failures.

use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;
use tracing::error;

use crate::flags;
use crate::policy_types::InitRequest;
use crate::policy_types::PolicyRequest;
use crate::policy_types::PolicyResponse;
use crate::policy_types::PolicyVerdict;
use crate::policy_types::UserConfirmation;

pub struct SecurityPolicyClient {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
    app_uid: String,
}

#[derive(Debug, thiserror::Error)]
enum InspectError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}: {1}")]
    Status(StatusCode, String),
}

impl SecurityPolicyClient {
    pub fn new(session_id: &str, app_uid: &str) -> Self {
        Self::with_base_url(&flags::MCPOWER_API_BASE, session_id, app_uid)
    }

    pub fn with_base_url(base_url: &str, session_id: &str, app_uid: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(*flags::MCPOWER_API_TIMEOUT_MS)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: session_id.to_string(),
            app_uid: app_uid.to_string(),
        }
    }

    /// Register the wrapped server and its tools. Failures are logged and
    /// swallowed; `tools/list` must never fail because of this call.
    pub async fn init_tools(&self, request: &InitRequest, event_id: &str, prompt_id: Option<&str>) {
        match self
            .post::<_, serde_json::Value>("/init", request, event_id, prompt_id)
            .await
        {
            Ok(_) => debug!("init_tools registered {} tools", request.tools.len()),
            Err(e) => error!("init_tools failed: {e}"),
        }
    }

    pub async fn inspect_policy_request(
        &self,
        request: &PolicyRequest,
        prompt_id: Option<&str>,
    ) -> PolicyVerdict {
        match self
            .post("/inspect/request", request, &request.event_id, prompt_id)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                error!("request inspection failed: {e}");
                PolicyVerdict::api_failure(&e)
            }
        }
    }

    pub async fn inspect_policy_response(
        &self,
        response: &PolicyResponse,
        prompt_id: Option<&str>,
    ) -> PolicyVerdict {
        match self
            .post("/inspect/response", response, &response.event_id, prompt_id)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                error!("response inspection failed: {e}");
                PolicyVerdict::api_failure(&e)
            }
        }
    }

    /// Fire-and-forget echo of a dialog outcome. Never changes the
    /// user-visible result of the operation.
    pub async fn record_user_confirmation(
        &self,
        confirmation: &UserConfirmation,
        prompt_id: Option<&str>,
    ) {
        match self
            .post::<_, serde_json::Value>("/confirm", confirmation, &confirmation.event_id, prompt_id)
            .await
        {
            Ok(_) => debug!(
                "recorded user confirmation {} for {}",
                confirmation.user_decision.as_str(),
                confirmation.event_id
            ),
            Err(e) => error!("failed to record user confirmation: {e}"),
        }
    }

    async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        event_id: &str,
        prompt_id: Option<&str>,
    ) -> Result<R, InspectError>
    where
        B: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .http
            .post(&url)
            .header("x-session-id", &self.session_id)
            .header("x-app-uid", &self.app_uid)
            .header("x-event-id", event_id)
            .json(body);
        if let Some(prompt_id) = prompt_id {
            request = request.header("x-prompt-id", prompt_id);
        }
        if let Some(key) = *flags::MCPOWER_API_KEY {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InspectError::Status(status, text));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::policy_types::AgentContext;
    use crate::policy_types::Decision;
    use crate::policy_types::Direction;
    use crate::policy_types::EnvironmentContext;
    use crate::policy_types::PolicyTool;
    use crate::policy_types::ServerRef;
    use crate::policy_types::Severity;
    use crate::policy_types::UserDecision;
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    fn sample_request(event_id: &str) -> PolicyRequest {
        PolicyRequest {
            event_id: event_id.to_string(),
            server: ServerRef {
                name: "echo-server".into(),
                transport: "stdio".into(),
                version: None,
            },
            tool: PolicyTool {
                name: "echo".into(),
                method: "tools/call".into(),
            },
            agent_context: AgentContext::default(),
            env_context: EnvironmentContext {
                session_id: "session".into(),
                workspace: Default::default(),
                client: "mcpower".into(),
                client_version: "0.1.0".into(),
            },
            arguments: json!({"message": "hello"}),
        }
    }

    #[tokio::test]
    async fn inspect_request_parses_verdict_and_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inspect/request"))
            .and(header("x-session-id", "session-1"))
            .and(header("x-app-uid", "app-1"))
            .and(header("x-prompt-id", "prompt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "decision": "allow",
                "severity": "low"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SecurityPolicyClient::with_base_url(&server.uri(), "session-1", "app-1");
        let verdict = client
            .inspect_policy_request(&sample_request("ev-1"), Some("prompt-1"))
            .await;
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn non_2xx_synthesizes_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inspect/request"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SecurityPolicyClient::with_base_url(&server.uri(), "s", "a");
        let verdict = client
            .inspect_policy_request(&sample_request("ev-2"), None)
            .await;
        assert_eq!(verdict.decision, Decision::Block);
        assert_eq!(verdict.severity, Severity::High);
        assert!(verdict.reasons[0].contains("Security API unavailable:"));
        assert_eq!(verdict.matched_rules, vec!["security_api.error"]);
    }

    #[tokio::test]
    async fn unreachable_service_synthesizes_block() {
        // Nothing listens on this port.
        let client =
            SecurityPolicyClient::with_base_url("http://127.0.0.1:9", "s", "a");
        let verdict = client
            .inspect_policy_request(&sample_request("ev-3"), None)
            .await;
        assert_eq!(verdict.decision, Decision::Block);
        assert!(verdict.reasons[0].contains("Security API unavailable:"));
    }

    #[tokio::test]
    async fn record_confirmation_swallows_errors() {
        let client =
            SecurityPolicyClient::with_base_url("http://127.0.0.1:9", "s", "a");
        // Must not panic or propagate.
        client
            .record_user_confirmation(
                &UserConfirmation {
                    event_id: "ev-4".into(),
                    direction: Direction::Request,
                    user_decision: UserDecision::Allow,
                    call_type: Some("read".into()),
                },
                None,
            )
            .await;
    }

    #[tokio::test]
    async fn inspect_response_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inspect/response"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "decision": "required_explicit_user_confirmation",
                "severity": "medium",
                "reasons": ["review output"],
                "call_type": "read"
            })))
            .mount(&server)
            .await;

        let client = SecurityPolicyClient::with_base_url(&server.uri(), "s", "a");
        let response = PolicyResponse {
            event_id: "ev-5".into(),
            server: ServerRef {
                name: "echo-server".into(),
                transport: "stdio".into(),
                version: None,
            },
            tool: PolicyTool {
                name: "echo".into(),
                method: "tools/call".into(),
            },
            agent_context: AgentContext::default(),
            env_context: EnvironmentContext {
                session_id: "s".into(),
                workspace: Default::default(),
                client: "mcpower".into(),
                client_version: "0.1.0".into(),
            },
            response_content: json!({"content": [{"type": "text", "text": "hi"}]}).to_string(),
        };
        let verdict = client.inspect_policy_response(&response, None).await;
        assert_eq!(verdict.decision, Decision::RequiredExplicitUserConfirmation);
        assert_eq!(verdict.call_type.as_deref(), Some("read"));
    }
}
