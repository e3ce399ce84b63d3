//! Outbound half of the client-facing connection.
//!
//! Everything the wrapper says to its MCP client flows through
//! [`OutgoingMessageSender`]: responses to client requests, errors, relayed
//! notifications, and requests the wrapper itself initiates against the
//! client (`roots/list`, relayed sampling/elicitation). Responses to those
//! are matched back to the waiting caller by request id.

use std::collections::HashMap;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::RequestId;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::warn;

pub(crate) struct OutgoingMessageSender {
    next_request_id: AtomicI64,
    sender: mpsc::Sender<JSONRPCMessage>,
    request_id_to_callback: Mutex<HashMap<RequestId, oneshot::Sender<mcp_types::Result>>>,
}

impl OutgoingMessageSender {
    pub(crate) fn new(sender: mpsc::Sender<JSONRPCMessage>) -> Self {
        Self {
            next_request_id: AtomicI64::new(0),
            sender,
            request_id_to_callback: Mutex::new(HashMap::new()),
        }
    }

    /// Send a request to the client; the returned receiver resolves when the
    /// client answers.
    pub(crate) async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> oneshot::Receiver<mcp_types::Result> {
        let id = RequestId::Integer(self.next_request_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        {
            let mut callbacks = self.request_id_to_callback.lock().await;
            callbacks.insert(id.clone(), tx);
        }

        let message = JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method: method.to_string(),
            params,
        });
        let _ = self.sender.send(message).await;
        rx
    }

    /// Route a response from the client back to whoever sent the request.
    pub(crate) async fn notify_client_response(&self, id: RequestId, result: mcp_types::Result) {
        let entry = {
            let mut callbacks = self.request_id_to_callback.lock().await;
            callbacks.remove_entry(&id)
        };
        match entry {
            Some((id, sender)) => {
                if sender.send(result).is_err() {
                    warn!("caller for {id:?} went away before the client answered");
                }
            }
            None => {
                warn!("no pending callback for client response {id:?}");
            }
        }
    }

    pub(crate) async fn send_response(&self, id: RequestId, result: mcp_types::Result) {
        let message = JSONRPCMessage::Response(JSONRPCResponse {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result,
        });
        let _ = self.sender.send(message).await;
    }

    pub(crate) async fn send_error(&self, id: RequestId, error: JSONRPCErrorError) {
        let message = JSONRPCMessage::Error(JSONRPCError {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            error,
        });
        let _ = self.sender.send(message).await;
    }

    pub(crate) async fn send_notification(&self, method: &str, params: Option<serde_json::Value>) {
        let message = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.to_string(),
            params,
        });
        let _ = self.sender.send(message).await;
    }
}
