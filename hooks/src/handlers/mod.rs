//! IDE-agnostic hook handlers. Each handler normalizes one hook's payload,
//! runs redaction/analysis, consults the policy service and reports a
//! verdict back to the router.

pub mod init;
pub mod mcp_execution;
pub mod prompt_submit;
pub mod read_file;
pub mod shell_execution;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use mcpower_core::McpowerErr;
use mcpower_core::audit::AuditTrailLogger;
use mcpower_core::confirm::DenyAllDialog;
use mcpower_core::decision::DecisionHandler;
use mcpower_core::decision::EnforcementContext;
use mcpower_core::ids::read_app_uid;
use mcpower_core::policy_client::SecurityPolicyClient;
use mcpower_core::policy_types::AgentContext;
use mcpower_core::policy_types::EnvironmentContext;
use mcpower_core::policy_types::PolicyRequest;
use mcpower_core::policy_types::PolicyResponse;
use mcpower_core::policy_types::PolicyTool;
use mcpower_core::policy_types::PolicyVerdict;
use mcpower_core::policy_types::ServerRef;
use mcpower_core::policy_types::WorkspaceContext;

use crate::output::IdeFormat;

#[derive(Debug, Clone, Copy)]
pub struct HookConfig {
    pub format: IdeFormat,
    pub server_name: &'static str,
    pub client_name: &'static str,
}

pub const CLAUDE_CODE_CONFIG: HookConfig = HookConfig {
    format: IdeFormat::ClaudeCode,
    server_name: "claude_code_tools",
    client_name: "claude-code",
};

pub const CURSOR_CONFIG: HookConfig = HookConfig {
    format: IdeFormat::Cursor,
    server_name: "cursor_tools",
    client_name: "cursor",
};

/// Per-invocation state shared by every handler.
pub struct HookContext {
    pub config: HookConfig,
    pub audit: AuditTrailLogger,
    pub policy_base_url: String,
    pub session_id: String,
    pub prompt_id: String,
    pub event_id: String,
    pub cwd: Option<PathBuf>,
    pub workspace_roots: Vec<String>,
}

impl HookContext {
    /// App uid for this project: first workspace root, then cwd, then the
    /// home fallback.
    pub fn app_uid(&self) -> String {
        let root = self
            .workspace_roots
            .first()
            .map(|r| PathBuf::from(r))
            .or_else(|| self.cwd.clone());
        let uid = read_app_uid(root.as_deref()).unwrap_or_default();
        if !uid.is_empty() {
            self.audit.set_app_uid(&uid);
        }
        uid
    }

    fn roots(&self) -> Vec<String> {
        if !self.workspace_roots.is_empty() {
            return self.workspace_roots.clone();
        }
        self.cwd
            .as_deref()
            .map(Path::display)
            .map(|d| vec![d.to_string()])
            .unwrap_or_default()
    }

    fn env_context(&self, current_files: Vec<String>) -> EnvironmentContext {
        EnvironmentContext {
            session_id: self.session_id.clone(),
            workspace: WorkspaceContext {
                roots: self.roots(),
                current_files,
            },
            client: self.config.client_name.to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn server_ref(&self) -> ServerRef {
        ServerRef {
            name: self.config.server_name.to_string(),
            transport: "ide_hook".to_string(),
            version: None,
        }
    }

    pub(crate) fn policy_client(&self, app_uid: &str) -> SecurityPolicyClient {
        SecurityPolicyClient::with_base_url(&self.policy_base_url, &self.session_id, app_uid)
    }
}

/// Inspect `content_data` with the policy service and enforce the verdict.
/// Hooks have no interactive dialog capability, so escalations deny.
pub async fn inspect_and_enforce(
    ctx: &HookContext,
    tool_name: &str,
    content_data: Value,
    is_request: bool,
    current_files: Vec<String>,
) -> Result<PolicyVerdict, McpowerErr> {
    let app_uid = ctx.app_uid();
    let policy = Arc::new(ctx.policy_client(&app_uid));

    let verdict = if is_request {
        let request = PolicyRequest {
            event_id: ctx.event_id.clone(),
            server: ctx.server_ref(),
            tool: PolicyTool {
                name: tool_name.to_string(),
                method: tool_name.to_string(),
            },
            agent_context: AgentContext::default(),
            env_context: ctx.env_context(current_files),
            arguments: content_data.clone(),
        };
        policy
            .inspect_policy_request(&request, Some(&ctx.prompt_id))
            .await
    } else {
        let response = PolicyResponse {
            event_id: ctx.event_id.clone(),
            server: ctx.server_ref(),
            tool: PolicyTool {
                name: tool_name.to_string(),
                method: tool_name.to_string(),
            },
            agent_context: AgentContext::default(),
            env_context: ctx.env_context(current_files),
            response_content: content_data.to_string(),
        };
        policy
            .inspect_policy_response(&response, Some(&ctx.prompt_id))
            .await
    };

    let handler = DecisionHandler::new(policy, ctx.audit.clone(), Arc::new(DenyAllDialog));
    handler
        .enforce(
            &verdict,
            &EnforcementContext {
                is_request,
                event_id: &ctx.event_id,
                tool_name,
                content_data,
                operation_type: "tool",
                prompt_id: Some(&ctx.prompt_id),
                server_name: ctx.config.server_name,
            },
        )
        .await?;
    Ok(verdict)
}

/// Short preview for log lines.
pub(crate) fn truncate_at(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    }
}
