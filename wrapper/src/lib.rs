//! Transparent security proxy in front of a wrapped MCP server.
//!
//! Speaks MCP over stdio to the client, spawns the wrapped server as a
//! child process, and routes every message through the security middleware.

use std::io::Result as IoResult;
use std::sync::Arc;

use mcp_types::JSONRPCMessage;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::{self};
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;

pub mod middleware;
mod message_processor;
mod outgoing_message;
pub mod wrapped_config;

use mcpower_core::audit::AuditTrailLogger;
use mcpower_core::audit::JsonlSink;
use mcpower_core::confirm::DenyAllDialog;
use mcpower_core::flags;
use mcpower_core::ids::mcpower_dir;
use mcpower_core::ids::session_id;
use mcpower_mcp_client::McpClient;

use crate::message_processor::MessageProcessor;
use crate::middleware::SecurityMiddleware;
use crate::outgoing_message::OutgoingMessageSender;
use crate::wrapped_config::parse_wrapped_config;

/// Size of the bounded channels between the stdio tasks. 128 messages is
/// plenty for an interactive session.
const CHANNEL_CAPACITY: usize = 128;

pub struct WrapperArgs {
    /// JSON config of the server to wrap (see [`wrapped_config`]).
    pub wrapped_config: String,
    /// Name this proxy advertises to the client.
    pub name: String,
}

pub async fn run_main(args: WrapperArgs) -> IoResult<()> {
    let wrapped = parse_wrapped_config(&args.wrapped_config)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let (client, mut server_rx) = McpClient::new_stdio_client(
        wrapped.launch.command.clone(),
        wrapped.launch.args.clone(),
        wrapped.launch.env.clone(),
    )
    .await?;
    let client = Arc::new(client);
    info!(
        "wrapped server '{}' spawned ({} {:?})",
        wrapped.name, wrapped.launch.command, wrapped.launch.args
    );

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);
    let outgoing = Arc::new(OutgoingMessageSender::new(outgoing_tx));

    let audit = AuditTrailLogger::new(Arc::new(JsonlSink::new(mcpower_dir(None))));
    let middleware = Arc::new(SecurityMiddleware::new(
        args.name.clone(),
        env!("CARGO_PKG_VERSION").to_string(),
        wrapped.name.clone(),
        wrapped.transport.clone(),
        session_id().to_string(),
        flags::MCPOWER_API_BASE.to_string(),
        audit,
        Arc::new(DenyAllDialog),
    ));

    let processor = Arc::new(MessageProcessor::new(
        outgoing.clone(),
        client.clone(),
        middleware,
        args.name,
        env!("CARGO_PKG_VERSION").to_string(),
    ));

    // Task: read client messages from stdin.
    let stdin_processor = processor.clone();
    let stdin_reader_handle = tokio::spawn(async move {
        let stdin = io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            match serde_json::from_str::<JSONRPCMessage>(&line) {
                Ok(JSONRPCMessage::Request(request)) => {
                    stdin_processor.process_request(request);
                }
                Ok(JSONRPCMessage::Response(response)) => {
                    stdin_processor.process_response(response);
                }
                Ok(JSONRPCMessage::Notification(notification)) => {
                    stdin_processor.process_notification(notification);
                }
                Ok(JSONRPCMessage::Error(e)) => {
                    error!("client sent an error object: {e:?}");
                }
                Err(e) => error!("failed to deserialize JSONRPCMessage: {e}"),
            }
        }

        debug!("stdin reader finished (EOF)");
    });

    // Task: surface traffic the wrapped server initiates.
    let server_processor = processor.clone();
    let server_handle = tokio::spawn(async move {
        while let Some(message) = server_rx.recv().await {
            server_processor.process_server_message(message);
        }
        debug!("wrapped server message stream closed");
    });

    // Task: write outgoing messages to stdout.
    let stdout_writer_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(message) = outgoing_rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if stdout.write_all(json.as_bytes()).await.is_err()
                        || stdout.write_all(b"\n").await.is_err()
                        || stdout.flush().await.is_err()
                    {
                        error!("failed to write to stdout");
                        break;
                    }
                }
                Err(e) => error!("failed to serialize JSONRPCMessage: {e}"),
            }
        }

        info!("stdout writer exited (channel closed)");
    });

    // The typical exit path is the stdin reader hitting EOF, which drops the
    // processor senders and lets the remaining tasks drain.
    let _ = tokio::join!(stdin_reader_handle, server_handle, stdout_writer_handle);

    Ok(())
}

/// Install the stderr tracing subscriber shared by the wrapper and hook
/// binaries. Stdout stays reserved for the protocol.
pub fn init_tracing() {
    let default_filter = if *flags::MCPOWER_DEBUG { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
