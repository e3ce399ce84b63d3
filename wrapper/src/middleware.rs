//! Security middleware: the request → inspect → forward → inspect → return
//! pipeline around every interesting MCP operation, plus the `tools/list`
//! special path (debounced `/init` registration and schema augmentation).

use std::path::Path;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;
use std::time::Instant;

use mcp_types::ListToolsResult;
use mcp_types::Tool;
use percent_encoding::percent_decode_str;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use mcpower_core::McpowerErr;
use mcpower_core::audit::AuditTrailLogger;
use mcpower_core::confirm::ConfirmationDialog;
use mcpower_core::decision::DecisionHandler;
use mcpower_core::decision::EnforcementContext;
use mcpower_core::ids::generate_event_id;
use mcpower_core::ids::read_app_uid;
use mcpower_core::policy_client::SecurityPolicyClient;
use mcpower_core::policy_types::EnvironmentContext;
use mcpower_core::policy_types::InitRequest;
use mcpower_core::policy_types::PolicyRequest;
use mcpower_core::policy_types::PolicyResponse;
use mcpower_core::policy_types::PolicyTool;
use mcpower_core::policy_types::ServerRef;
use mcpower_core::policy_types::ToolRef;
use mcpower_core::policy_types::WorkspaceContext;
use mcpower_core::redaction::redact;
use mcpower_core::redaction::redact_text;
use mcpower_core::schema::WRAPPER_USER_PROMPT;
use mcpower_core::schema::WRAPPER_USER_PROMPT_ID;
use mcpower_core::schema::agent_context_from_wrapper_args;
use mcpower_core::schema::current_files_from_wrapper_args;
use mcpower_core::schema::merge_input_schema;
use mcpower_core::schema::split_wrapper_arguments;

const TOOLS_INIT_DEBOUNCE: Duration = Duration::from_secs(60);

/// One MCP operation about to flow through the pipeline.
pub struct Operation {
    pub method: String,
    pub operation_type: &'static str,
    pub params: Option<Value>,
}

pub struct SecurityMiddleware {
    wrapper_server_name: String,
    wrapper_server_version: String,
    wrapped_server_name: String,
    wrapped_server_transport: String,
    session_id: String,
    policy_base_url: String,
    audit: AuditTrailLogger,
    dialog: Arc<dyn ConfirmationDialog>,
    app_uid: OnceLock<String>,
    last_tools_init: Mutex<Option<Instant>>,
}

impl SecurityMiddleware {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wrapper_server_name: String,
        wrapper_server_version: String,
        wrapped_server_name: String,
        wrapped_server_transport: String,
        session_id: String,
        policy_base_url: String,
        audit: AuditTrailLogger,
        dialog: Arc<dyn ConfirmationDialog>,
    ) -> Self {
        info!(
            "security middleware initialized: wrapper={wrapper_server_name} \
             wrapped={wrapped_server_name} transport={wrapped_server_transport} \
             session_id={session_id}"
        );
        Self {
            wrapper_server_name,
            wrapper_server_version,
            wrapped_server_name,
            wrapped_server_transport,
            session_id,
            policy_base_url,
            audit,
            dialog,
            app_uid: OnceLock::new(),
            last_tools_init: Mutex::new(None),
        }
    }

    /// Resolve (and persist on first use) the app uid from the first
    /// workspace root, falling back to the home directory store.
    pub fn ensure_app_uid(&self, workspace_roots: &[String]) -> String {
        if let Some(uid) = self.app_uid.get() {
            return uid.clone();
        }
        let root = workspace_roots.first().map(Path::new);
        let uid = read_app_uid(root).unwrap_or_else(|e| {
            warn!("could not read app uid: {e}; using an ephemeral one");
            Uuid::new_v4().to_string()
        });
        if self.app_uid.set(uid.clone()).is_ok() {
            self.audit.set_app_uid(&uid);
        }
        uid
    }

    fn policy_client(&self, app_uid: &str) -> SecurityPolicyClient {
        SecurityPolicyClient::with_base_url(&self.policy_base_url, &self.session_id, app_uid)
    }

    fn env_context(&self, roots: &[String], current_files: Vec<String>) -> EnvironmentContext {
        EnvironmentContext {
            session_id: self.session_id.clone(),
            workspace: WorkspaceContext {
                roots: roots.to_vec(),
                current_files,
            },
            client: self.wrapper_server_name.clone(),
            client_version: self.wrapper_server_version.clone(),
        }
    }

    fn server_ref(&self) -> ServerRef {
        ServerRef {
            name: self.wrapped_server_name.clone(),
            transport: self.wrapped_server_transport.clone(),
            version: None,
        }
    }

    /// Run the full two-phase pipeline for `op`. `forward` receives the
    /// cleaned params (wrapper advisory arguments stripped) and performs the
    /// actual call; it is only invoked when the request inspection allowed
    /// the operation.
    pub async fn handle_operation<F, Fut>(
        &self,
        op: Operation,
        workspace_roots: Vec<String>,
        forward: F,
    ) -> Result<Value, McpowerErr>
    where
        F: FnOnce(Option<Value>) -> Fut,
        Fut: Future<Output = Result<Value, McpowerErr>>,
    {
        let event_id = generate_event_id();
        let app_uid = self.ensure_app_uid(&workspace_roots);
        let (wrapper_args, tool_args, cleaned_params) = split_operation_params(&op);
        let tool_name = extract_tool_name(&op.method, op.params.as_ref());
        let prompt_id = wrapper_args
            .get(WRAPPER_USER_PROMPT_ID)
            .and_then(Value::as_str)
            .map(str::to_string);
        let user_prompt = wrapper_args
            .get(WRAPPER_USER_PROMPT)
            .and_then(Value::as_str)
            .map(redact_text);

        let redacted_args = redact(&Value::Object(tool_args.clone()));
        self.audit.log_event(
            "agent_request",
            json!({
                "server": self.wrapped_server_name,
                "tool": tool_name,
                "params": redacted_args,
            }),
            &event_id,
            prompt_id.as_deref(),
            user_prompt.as_deref(),
        );

        let policy = Arc::new(self.policy_client(&app_uid));
        let handler = DecisionHandler::new(policy.clone(), self.audit.clone(), self.dialog.clone());

        let policy_request = PolicyRequest {
            event_id: event_id.clone(),
            server: self.server_ref(),
            tool: PolicyTool {
                name: tool_name.clone(),
                method: op.method.clone(),
            },
            agent_context: agent_context_from_wrapper_args(&wrapper_args),
            env_context: self
                .env_context(&workspace_roots, current_files_from_wrapper_args(&wrapper_args)),
            arguments: Value::Object(tool_args.clone()),
        };
        let verdict = policy
            .inspect_policy_request(&policy_request, prompt_id.as_deref())
            .await;
        handler
            .enforce(
                &verdict,
                &EnforcementContext {
                    is_request: true,
                    event_id: &event_id,
                    tool_name: &tool_name,
                    content_data: redacted_args.clone(),
                    operation_type: op.operation_type,
                    prompt_id: prompt_id.as_deref(),
                    server_name: &self.wrapped_server_name,
                },
            )
            .await?;

        self.audit.log_event(
            "agent_request_forwarded",
            json!({
                "server": self.wrapped_server_name,
                "tool": tool_name,
                "params": redacted_args,
            }),
            &event_id,
            prompt_id.as_deref(),
            None,
        );

        let result = forward(cleaned_params).await?;

        let redacted_result = redact(&result);
        self.audit.log_event(
            "mcp_response",
            json!({
                "server": self.wrapped_server_name,
                "tool": tool_name,
                "response": redacted_result,
            }),
            &event_id,
            prompt_id.as_deref(),
            None,
        );

        let policy_response = PolicyResponse {
            event_id: event_id.clone(),
            server: self.server_ref(),
            tool: PolicyTool {
                name: tool_name.clone(),
                method: op.method.clone(),
            },
            agent_context: agent_context_from_wrapper_args(&wrapper_args),
            env_context: self
                .env_context(&workspace_roots, current_files_from_wrapper_args(&wrapper_args)),
            response_content: serde_json::to_string(&result).unwrap_or_default(),
        };
        let verdict = policy
            .inspect_policy_response(&policy_response, prompt_id.as_deref())
            .await;
        handler
            .enforce(
                &verdict,
                &EnforcementContext {
                    is_request: false,
                    event_id: &event_id,
                    tool_name: &tool_name,
                    content_data: redacted_result.clone(),
                    operation_type: op.operation_type,
                    prompt_id: prompt_id.as_deref(),
                    server_name: &self.wrapped_server_name,
                },
            )
            .await?;

        self.audit.log_event(
            "mcp_response_forwarded",
            json!({
                "server": self.wrapped_server_name,
                "tool": tool_name,
                "response": redacted_result,
            }),
            &event_id,
            prompt_id.as_deref(),
            None,
        );

        Ok(result)
    }

    /// One-directional pipeline for notifications (log messages): inspect
    /// the payload, forward when allowed, drop otherwise. There is no
    /// response phase because nothing comes back.
    pub async fn handle_notification<F, Fut>(
        &self,
        op: Operation,
        workspace_roots: Vec<String>,
        forward: F,
    ) -> Result<(), McpowerErr>
    where
        F: FnOnce(Option<Value>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let event_id = generate_event_id();
        let app_uid = self.ensure_app_uid(&workspace_roots);
        let (wrapper_args, tool_args, cleaned_params) = split_operation_params(&op);
        let tool_name = extract_tool_name(&op.method, op.params.as_ref());

        let redacted_args = redact(&Value::Object(tool_args.clone()));
        self.audit.log_event(
            "agent_request",
            json!({
                "server": self.wrapped_server_name,
                "tool": tool_name,
                "params": redacted_args,
            }),
            &event_id,
            None,
            None,
        );

        let policy = Arc::new(self.policy_client(&app_uid));
        let handler = DecisionHandler::new(policy.clone(), self.audit.clone(), self.dialog.clone());
        let policy_request = PolicyRequest {
            event_id: event_id.clone(),
            server: self.server_ref(),
            tool: PolicyTool {
                name: tool_name.clone(),
                method: op.method.clone(),
            },
            agent_context: agent_context_from_wrapper_args(&wrapper_args),
            env_context: self.env_context(&workspace_roots, Vec::new()),
            arguments: Value::Object(tool_args),
        };
        let verdict = policy.inspect_policy_request(&policy_request, None).await;
        handler
            .enforce(
                &verdict,
                &EnforcementContext {
                    is_request: true,
                    event_id: &event_id,
                    tool_name: &tool_name,
                    content_data: redacted_args.clone(),
                    operation_type: op.operation_type,
                    prompt_id: None,
                    server_name: &self.wrapped_server_name,
                },
            )
            .await?;

        self.audit.log_event(
            "agent_request_forwarded",
            json!({
                "server": self.wrapped_server_name,
                "tool": tool_name,
                "params": redacted_args,
            }),
            &event_id,
            None,
            None,
        );

        forward(cleaned_params).await;
        Ok(())
    }

    /// `tools/list` special path: register the catalog with the policy
    /// service (debounced to once per minute) and inject the advisory
    /// properties into every tool schema.
    pub async fn augment_tools_list(
        &self,
        result: ListToolsResult,
        workspace_roots: Vec<String>,
    ) -> ListToolsResult {
        let app_uid = self.ensure_app_uid(&workspace_roots);

        if self.claim_tools_init().await {
            let init = InitRequest {
                environment: self.env_context(&workspace_roots, Vec::new()),
                server: ServerRef {
                    name: self.wrapped_server_name.clone(),
                    transport: self.wrapped_server_transport.clone(),
                    version: Some("1.0.0".to_string()),
                },
                tools: result
                    .tools
                    .iter()
                    .map(|tool| ToolRef {
                        name: tool.name.clone(),
                        description: tool.description.clone().unwrap_or_default(),
                        version: None,
                    })
                    .collect(),
            };
            self.policy_client(&app_uid)
                .init_tools(&init, &generate_event_id(), None)
                .await;
        }

        ListToolsResult {
            tools: result
                .tools
                .into_iter()
                .map(|tool| Tool {
                    input_schema: merge_input_schema(&tool.input_schema),
                    ..tool
                })
                .collect(),
            next_cursor: result.next_cursor,
        }
    }

    /// Atomic check-and-set for the init debounce window.
    async fn claim_tools_init(&self) -> bool {
        let mut last = self.last_tools_init.lock().await;
        match *last {
            Some(at) if at.elapsed() < TOOLS_INIT_DEBOUNCE => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

/// Split the operation params into wrapper advisory args, the policy-facing
/// argument map, and the cleaned params to forward.
fn split_operation_params(op: &Operation) -> (Map<String, Value>, Map<String, Value>, Option<Value>) {
    if op.method == "tools/call" {
        let arguments = op.params.as_ref().and_then(|p| p.get("arguments"));
        let (wrapper_args, tool_args) = split_wrapper_arguments(arguments);
        let cleaned = op.params.as_ref().map(|params| {
            let mut cleaned = params.clone();
            if let Some(object) = cleaned.as_object_mut() {
                object.insert("arguments".to_string(), Value::Object(tool_args.clone()));
            }
            cleaned
        });
        (wrapper_args, tool_args, cleaned)
    } else {
        let (wrapper_args, tool_args) = split_wrapper_arguments(op.params.as_ref());
        let cleaned = match &op.params {
            Some(Value::Object(_)) => Some(Value::Object(tool_args.clone())),
            other => other.clone(),
        };
        (wrapper_args, tool_args, cleaned)
    }
}

fn extract_tool_name(method: &str, params: Option<&Value>) -> String {
    if method == "tools/call" {
        if let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) {
            return name.to_string();
        }
    }
    method.rsplit('/').next().unwrap_or(method).to_string()
}

/// Decode `roots/list` results into absolute filesystem paths.
pub fn decode_workspace_roots(result: &Value) -> Vec<String> {
    let Some(roots) = result.get("roots").and_then(Value::as_array) else {
        return Vec::new();
    };
    roots
        .iter()
        .filter_map(|root| root.get("uri").and_then(Value::as_str))
        .filter_map(|uri| {
            let path = uri.strip_prefix("file://")?;
            let decoded = percent_decode_str(path).decode_utf8().ok()?.to_string();
            let resolved = std::fs::canonicalize(&decoded)
                .map(|p| p.display().to_string())
                .unwrap_or(decoded);
            Some(resolved)
        })
        .collect()
}
