//! Routing of every MCP message through the proxy.
//!
//! Client requests are dispatched by method: `tools/call`,
//! `resources/read` and `prompts/get` run the full pipeline; `tools/list`
//! takes the augmentation path; the `*/list` family and anything unknown is
//! forwarded untouched. Server-initiated traffic (sampling, elicitation,
//! log notifications) flows through the pipeline in the other direction.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use mcp_types::ClientRequest;
use mcp_types::InitializeResult;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::RequestId;
use serde_json::Value;
use serde_json::json;
use tracing::info;
use tracing::warn;

use mcpower_core::McpowerErr;
use mcpower_mcp_client::McpClient;
use mcpower_mcp_client::ServerMessage;

use crate::middleware::Operation;
use crate::middleware::SecurityMiddleware;
use crate::middleware::decode_workspace_roots;
use crate::outgoing_message::OutgoingMessageSender;

/// Timeout for the `tools/list` request against the wrapped server.
const LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for asking the client about its workspace roots.
const ROOTS_TIMEOUT: Duration = Duration::from_secs(5);

const INVALID_REQUEST: i64 = -32600;
const INTERNAL_ERROR: i64 = -32603;
/// Policy denials, user blocks, and need-more-info all surface with this
/// code; the message text distinguishes them.
const POLICY_ERROR: i64 = -32000;

pub(crate) struct MessageProcessor {
    outgoing: Arc<OutgoingMessageSender>,
    client: Arc<McpClient>,
    middleware: Arc<SecurityMiddleware>,
    wrapper_name: String,
    wrapper_version: String,
    initialized: AtomicBool,
}

impl MessageProcessor {
    pub(crate) fn new(
        outgoing: Arc<OutgoingMessageSender>,
        client: Arc<McpClient>,
        middleware: Arc<SecurityMiddleware>,
        wrapper_name: String,
        wrapper_version: String,
    ) -> Self {
        Self {
            outgoing,
            client,
            middleware,
            wrapper_name,
            wrapper_version,
            initialized: AtomicBool::new(false),
        }
    }

    pub(crate) fn process_request(self: &Arc<Self>, request: JSONRPCRequest) {
        let request_id = request.id.clone();
        let raw_params = request.params.clone();
        let client_request = match ClientRequest::try_from(request) {
            Ok(client_request) => client_request,
            Err(e) => {
                warn!("failed to convert request: {e}");
                let this = self.clone();
                tokio::spawn(async move {
                    this.outgoing
                        .send_error(
                            request_id,
                            JSONRPCErrorError {
                                code: INVALID_REQUEST,
                                message: e.to_string(),
                                data: None,
                            },
                        )
                        .await;
                });
                return;
            }
        };

        let this = self.clone();
        tokio::spawn(async move {
            match client_request {
                ClientRequest::Initialize(params) => {
                    this.handle_initialize(request_id, params).await;
                }
                ClientRequest::Ping(_) => {
                    this.outgoing.send_response(request_id, json!({})).await;
                }
                ClientRequest::ListTools(params) => {
                    this.handle_list_tools(request_id, params).await;
                }
                ClientRequest::CallTool(_) => {
                    this.handle_inspected(request_id, "tools/call", "tool", raw_params)
                        .await;
                }
                ClientRequest::ReadResource(_) => {
                    this.handle_inspected(request_id, "resources/read", "resource", raw_params)
                        .await;
                }
                ClientRequest::GetPrompt(_) => {
                    this.handle_inspected(request_id, "prompts/get", "prompt", raw_params)
                        .await;
                }
                ClientRequest::ListResources(_) => {
                    this.forward_untouched(request_id, "resources/list", raw_params)
                        .await;
                }
                ClientRequest::ListResourceTemplates(_) => {
                    this.forward_untouched(request_id, "resources/templates/list", raw_params)
                        .await;
                }
                ClientRequest::ListPrompts(_) => {
                    this.forward_untouched(request_id, "prompts/list", raw_params)
                        .await;
                }
                ClientRequest::Other { method, params } => {
                    this.forward_untouched(request_id, &method, params).await;
                }
            }
        });
    }

    /// A standalone response from the client answers a request the wrapper
    /// (or the wrapped server, relayed) sent earlier.
    pub(crate) fn process_response(self: &Arc<Self>, response: JSONRPCResponse) {
        let this = self.clone();
        tokio::spawn(async move {
            this.outgoing
                .notify_client_response(response.id, response.result)
                .await;
        });
    }

    /// Notifications from the client are forwarded to the wrapped server.
    /// `notifications/initialized` is dropped here because the client
    /// handshake already delivered it when the child was spawned.
    pub(crate) fn process_notification(self: &Arc<Self>, notification: JSONRPCNotification) {
        if notification.method == "notifications/initialized" {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.client
                .notify(&notification.method, notification.params)
                .await;
        });
    }

    /// Traffic initiated by the wrapped server.
    pub(crate) fn process_server_message(self: &Arc<Self>, message: ServerMessage) {
        let this = self.clone();
        tokio::spawn(async move {
            match message {
                ServerMessage::Request(request) => this.handle_server_request(request).await,
                ServerMessage::Notification(notification) => {
                    this.handle_server_notification(notification).await;
                }
            }
        });
    }

    async fn handle_initialize(
        &self,
        id: RequestId,
        params: mcp_types::InitializeRequestParams,
    ) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            self.outgoing
                .send_error(
                    id,
                    JSONRPCErrorError {
                        code: INVALID_REQUEST,
                        message: "initialize called more than once".to_string(),
                        data: None,
                    },
                )
                .await;
            return;
        }

        match self.client.initialize(params, None).await {
            Ok(result) => {
                // Same capabilities as the wrapped server; only the identity
                // is ours.
                let result = InitializeResult {
                    server_info: mcp_types::Implementation {
                        name: self.wrapper_name.clone(),
                        version: self.wrapper_version.clone(),
                    },
                    ..result
                };
                match serde_json::to_value(&result) {
                    Ok(value) => self.outgoing.send_response(id, value).await,
                    Err(e) => self.send_internal_error(id, &e.to_string()).await,
                }
            }
            Err(e) => self.send_internal_error(id, &e.to_string()).await,
        }
    }

    async fn handle_list_tools(
        &self,
        id: RequestId,
        params: Option<mcp_types::ListToolsRequestParams>,
    ) {
        let roots = self.workspace_roots().await;
        match self.client.list_tools(params, Some(LIST_TOOLS_TIMEOUT)).await {
            Ok(result) => {
                let augmented = self.middleware.augment_tools_list(result, roots).await;
                match serde_json::to_value(&augmented) {
                    Ok(value) => self.outgoing.send_response(id, value).await,
                    Err(e) => self.send_internal_error(id, &e.to_string()).await,
                }
            }
            Err(e) => self.send_internal_error(id, &e.to_string()).await,
        }
    }

    /// The full two-phase pipeline, forwarding to the wrapped server.
    async fn handle_inspected(
        &self,
        id: RequestId,
        method: &'static str,
        operation_type: &'static str,
        params: Option<Value>,
    ) {
        let roots = self.workspace_roots().await;
        let client = self.client.clone();
        let op = Operation {
            method: method.to_string(),
            operation_type,
            params,
        };
        let outcome = self
            .middleware
            .handle_operation(op, roots, |cleaned| async move {
                client
                    .send_raw_request(method, cleaned, None)
                    .await
                    .map_err(|e| McpowerErr::WrappedServer(e.to_string()))
            })
            .await;

        match outcome {
            Ok(result) => self.outgoing.send_response(id, result).await,
            Err(e) => self.outgoing.send_error(id, error_to_jsonrpc(&e)).await,
        }
    }

    async fn forward_untouched(&self, id: RequestId, method: &str, params: Option<Value>) {
        match self.client.send_raw_request(method, params, None).await {
            Ok(result) => self.outgoing.send_response(id, result).await,
            Err(e) => self.send_internal_error(id, &e.to_string()).await,
        }
    }

    async fn handle_server_request(&self, request: JSONRPCRequest) {
        let JSONRPCRequest {
            id, method, params, ..
        } = request;
        let operation_type = match method.as_str() {
            "sampling/createMessage" => Some("sampling"),
            "elicitation/create" => Some("elicitation"),
            _ => None,
        };

        match operation_type {
            Some(operation_type) => {
                let roots = self.workspace_roots().await;
                let outgoing = self.outgoing.clone();
                let relayed_method = method.clone();
                let op = Operation {
                    method: method.clone(),
                    operation_type,
                    params,
                };
                let outcome = self
                    .middleware
                    .handle_operation(op, roots, |cleaned| async move {
                        let rx = outgoing.send_request(&relayed_method, cleaned).await;
                        rx.await
                            .map_err(|_| McpowerErr::WrappedServer("client went away".to_string()))
                    })
                    .await;
                match outcome {
                    Ok(result) => self.client.respond(id, result).await,
                    Err(e) => self.client.respond_error(id, error_to_jsonrpc(&e)).await,
                }
            }
            None => {
                // roots/list and anything else the client should answer.
                let rx = self.outgoing.send_request(&method, params).await;
                match rx.await {
                    Ok(result) => self.client.respond(id, result).await,
                    Err(_) => {
                        self.client
                            .respond_error(
                                id,
                                JSONRPCErrorError {
                                    code: INTERNAL_ERROR,
                                    message: "client did not answer".to_string(),
                                    data: None,
                                },
                            )
                            .await;
                    }
                }
            }
        }
    }

    async fn handle_server_notification(&self, notification: JSONRPCNotification) {
        let JSONRPCNotification { method, params, .. } = notification;
        match method.as_str() {
            // Progress is pass-through.
            "notifications/progress" => {
                self.outgoing.send_notification(&method, params).await;
            }
            // Log messages are inspected before they reach the client.
            "notifications/message" => {
                let roots = self.workspace_roots().await;
                let outgoing = self.outgoing.clone();
                let relayed_method = method.clone();
                let op = Operation {
                    method: method.clone(),
                    operation_type: "logging",
                    params,
                };
                let outcome = self
                    .middleware
                    .handle_notification(op, roots, |cleaned| async move {
                        outgoing.send_notification(&relayed_method, cleaned).await;
                    })
                    .await;
                if let Err(e) = outcome {
                    info!("log notification suppressed: {e}");
                }
            }
            _ => {
                self.outgoing.send_notification(&method, params).await;
            }
        }
    }

    /// Ask the client for its workspace roots. Clients without the roots
    /// capability simply never answer; the timeout turns that into "no
    /// workspace".
    async fn workspace_roots(&self) -> Vec<String> {
        let rx = self.outgoing.send_request("roots/list", None).await;
        match tokio::time::timeout(ROOTS_TIMEOUT, rx).await {
            Ok(Ok(result)) => decode_workspace_roots(&result),
            _ => Vec::new(),
        }
    }

    async fn send_internal_error(&self, id: RequestId, message: &str) {
        self.outgoing
            .send_error(
                id,
                JSONRPCErrorError {
                    code: INTERNAL_ERROR,
                    message: message.to_string(),
                    data: None,
                },
            )
            .await;
    }
}

fn error_to_jsonrpc(error: &McpowerErr) -> JSONRPCErrorError {
    let code = match error {
        McpowerErr::PolicyDenied(_) | McpowerErr::UserBlocked | McpowerErr::NeedMoreInfo(_) => {
            POLICY_ERROR
        }
        _ => INTERNAL_ERROR,
    };
    JSONRPCErrorError {
        code,
        message: error.to_string(),
        data: None,
    }
}
