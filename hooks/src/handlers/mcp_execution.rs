//! MCP-execution hook: request-direction inspection of an MCP tool call
//! issued by the IDE's own agent (Cursor `beforeMCPExecution`).

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::info;
use tracing::warn;

use mcpower_core::McpowerErr;
use mcpower_core::redaction::redact;
use mcpower_core::redaction::redact_text;

use crate::handlers::HookContext;
use crate::handlers::inspect_and_enforce;
use crate::handlers::truncate_at;
use crate::output::HookKind;
use crate::output::HookOutcome;
use crate::output::error_outcome;
use crate::output::verdict;

#[derive(Debug, Deserialize)]
struct McpExecutionInput {
    tool_name: String,
    tool_input: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    command: Option<String>,
}

pub async fn handle_mcp_execution(ctx: &HookContext, tool_name: &str, input: &Value) -> HookOutcome {
    let parsed: McpExecutionInput = match serde_json::from_value(input.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("mcp execution input validation failed: {e}");
            return error_outcome(
                ctx.config.format,
                HookKind::Permission,
                &format!("invalid input: {e}"),
            );
        }
    };

    info!(
        "{tool_name}: mcp tool '{}', input '{}'",
        parsed.tool_name,
        truncate_at(&parsed.tool_input, 200)
    );

    let redacted_input = match serde_json::from_str::<Value>(&parsed.tool_input) {
        Ok(value) => redact(&value),
        Err(e) => {
            return error_outcome(
                ctx.config.format,
                HookKind::Permission,
                &format!("invalid input: tool_input is not valid JSON: {e}"),
            );
        }
    };

    let mut content_data = json!({
        "tool_name": parsed.tool_name,
        "tool_input": redacted_input,
    });
    if let Some(url) = &parsed.url {
        content_data["url"] = json!(redact_text(url));
    }
    if let Some(command) = &parsed.command {
        content_data["command"] = json!(redact_text(command));
    }

    ctx.audit.log_event(
        "agent_request",
        json!({
            "server": ctx.config.server_name,
            "tool": tool_name,
            "params": content_data,
        }),
        &ctx.event_id,
        Some(&ctx.prompt_id),
        None,
    );

    match inspect_and_enforce(ctx, tool_name, content_data, true, Vec::new()).await {
        Ok(decision) => {
            ctx.audit.log_event(
                "agent_request_forwarded",
                json!({
                    "server": ctx.config.server_name,
                    "tool": tool_name,
                    "params": {"mcp_tool_name": parsed.tool_name},
                }),
                &ctx.event_id,
                Some(&ctx.prompt_id),
                None,
            );
            let user_message = format!("MCP tool '{}' approved", parsed.tool_name);
            let agent_message = if decision.reasons.is_empty() {
                user_message.clone()
            } else {
                format!("{user_message}: {}", decision.reasons.join("; "))
            };
            verdict(
                ctx.config.format,
                HookKind::Permission,
                true,
                Some(&user_message),
                Some(&agent_message),
            )
        }
        Err(e) if e.is_policy_outcome() => {
            let user_message = if matches!(e, McpowerErr::UserBlocked) {
                format!("MCP tool '{}' blocked by user", parsed.tool_name)
            } else {
                format!("MCP tool '{}' blocked by security policy", parsed.tool_name)
            };
            verdict(
                ctx.config.format,
                HookKind::Permission,
                false,
                Some(&user_message),
                Some(&e.to_string()),
            )
        }
        Err(e) => error_outcome(ctx.config.format, HookKind::Permission, &e.to_string()),
    }
}
