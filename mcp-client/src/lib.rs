//! Async client for a Model Context Protocol server speaking JSON-RPC over
//! stdio.
//!
//! The client owns the child process. A reader task routes responses back to
//! pending callers; requests and notifications *initiated by the server*
//! (sampling, elicitation, `roots/list`, log messages) are surfaced on a
//! channel so the embedding proxy can inspect and relay them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use mcp_types::CallToolRequest;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::InitializeRequest;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializeResult;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::ListToolsRequest;
use mcp_types::ListToolsRequestParams;
use mcp_types::ListToolsResult;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::RequestId;
use serde::de::DeserializeOwned;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::error;
use tracing::warn;

/// A request or notification the *server* sent to us.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Request(JSONRPCRequest),
    Notification(JSONRPCNotification),
}

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<Result<serde_json::Value>>>>>;

pub struct McpClient {
    outgoing_tx: mpsc::Sender<JSONRPCMessage>,
    pending: PendingMap,
    next_id: AtomicI64,
    /// Kept alive so the child is reaped when the client drops.
    _child: Child,
}

impl McpClient {
    /// Spawn `program` and connect over its stdio. Returns the client plus
    /// the stream of server-initiated messages.
    pub async fn new_stdio_client(
        program: String,
        args: Vec<String>,
        env: Option<HashMap<String, String>>,
    ) -> std::io::Result<(Self, mpsc::Receiver<ServerMessage>)> {
        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(env) = env {
            command.envs(env);
        }
        let mut child = command.spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            std::io::Error::other("failed to capture child stdin")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::other("failed to capture child stdout")
        })?;

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<JSONRPCMessage>(128);
        let (server_tx, server_rx) = mpsc::channel::<ServerMessage>(128);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        // Writer task: serialize outgoing messages, one per line.
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(message) = outgoing_rx.recv().await {
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if stdin.write_all(json.as_bytes()).await.is_err()
                            || stdin.write_all(b"\n").await.is_err()
                            || stdin.flush().await.is_err()
                        {
                            error!("failed to write to wrapped server stdin");
                            break;
                        }
                    }
                    Err(e) => error!("failed to serialize outgoing message: {e}"),
                }
            }
            debug!("mcp-client writer task exited");
        });

        // Reader task: dispatch responses to pending callers, surface
        // everything the server initiates.
        let reader_pending = pending.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let message = match serde_json::from_str::<JSONRPCMessage>(&line) {
                    Ok(message) => message,
                    Err(e) => {
                        error!("failed to deserialize message from wrapped server: {e}");
                        continue;
                    }
                };
                match message {
                    JSONRPCMessage::Response(JSONRPCResponse { id, result, .. }) => {
                        Self::complete(&reader_pending, &id, Ok(result)).await;
                    }
                    JSONRPCMessage::Error(JSONRPCError { id, error, .. }) => {
                        Self::complete(
                            &reader_pending,
                            &id,
                            Err(anyhow!("server error {}: {}", error.code, error.message)),
                        )
                        .await;
                    }
                    JSONRPCMessage::Request(request) => {
                        if server_tx.send(ServerMessage::Request(request)).await.is_err() {
                            break;
                        }
                    }
                    JSONRPCMessage::Notification(notification) => {
                        if server_tx
                            .send(ServerMessage::Notification(notification))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            debug!("mcp-client reader task exited (EOF)");
        });

        Ok((
            Self {
                outgoing_tx,
                pending,
                next_id: AtomicI64::new(0),
                _child: child,
            },
            server_rx,
        ))
    }

    async fn complete(pending: &PendingMap, id: &RequestId, result: Result<serde_json::Value>) {
        let RequestId::Integer(id) = id else {
            warn!("wrapped server answered with a non-integer request id: {id:?}");
            return;
        };
        let sender = pending.lock().await.remove(id);
        match sender {
            Some(sender) => {
                let _ = sender.send(result);
            }
            None => warn!("no pending request for id {id}"),
        }
    }

    /// Send a typed request and await its typed result.
    pub async fn send_request<R>(
        &self,
        params: R::Params,
        timeout: Option<Duration>,
    ) -> Result<R::Result>
    where
        R: ModelContextProtocolRequest,
        R::Result: DeserializeOwned,
    {
        let params = serde_json::to_value(params).ok().filter(|v| !v.is_null());
        let value = self.send_raw_request(R::METHOD, params, timeout).await?;
        serde_json::from_value(value).with_context(|| format!("invalid `{}` result", R::METHOD))
    }

    /// Send an untyped request; the proxy uses this to forward methods it
    /// does not interpret.
    pub async fn send_raw_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id: RequestId::Integer(id),
            method: method.to_string(),
            params,
        });
        if self.outgoing_tx.send(request).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(anyhow!("wrapped server connection closed"));
        }

        let answer = match timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| {
                    let pending = self.pending.clone();
                    tokio::spawn(async move {
                        pending.lock().await.remove(&id);
                    });
                    anyhow!("request `{method}` timed out")
                })?,
            None => rx.await,
        };
        answer.map_err(|_| anyhow!("wrapped server dropped the request"))?
    }

    /// Answer a server-initiated request.
    pub async fn respond(&self, id: RequestId, result: serde_json::Value) {
        let message = JSONRPCMessage::Response(JSONRPCResponse {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result,
        });
        if self.outgoing_tx.send(message).await.is_err() {
            error!("failed to send response to wrapped server");
        }
    }

    /// Answer a server-initiated request with an error.
    pub async fn respond_error(&self, id: RequestId, error: JSONRPCErrorError) {
        let message = JSONRPCMessage::Error(JSONRPCError {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            error,
        });
        if self.outgoing_tx.send(message).await.is_err() {
            error!("failed to send error to wrapped server");
        }
    }

    /// Forward a notification to the server.
    pub async fn notify(&self, method: &str, params: Option<serde_json::Value>) {
        let message = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.to_string(),
            params,
        });
        if self.outgoing_tx.send(message).await.is_err() {
            error!("failed to send notification to wrapped server");
        }
    }

    pub async fn initialize(
        &self,
        params: InitializeRequestParams,
        timeout: Option<Duration>,
    ) -> Result<InitializeResult> {
        let result = self.send_request::<InitializeRequest>(params, timeout).await?;
        self.notify("notifications/initialized", None).await;
        Ok(result)
    }

    pub async fn list_tools(
        &self,
        params: Option<ListToolsRequestParams>,
        timeout: Option<Duration>,
    ) -> Result<ListToolsResult> {
        self.send_request::<ListToolsRequest>(params, timeout).await
    }

    pub async fn call_tool(
        &self,
        name: String,
        arguments: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<CallToolResult> {
        self.send_request::<CallToolRequest>(CallToolRequestParams { name, arguments }, timeout)
            .await
    }
}
