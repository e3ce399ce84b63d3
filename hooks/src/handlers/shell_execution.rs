//! Shell-execution hooks: parse the command into sub-commands, input files
//! and package targets, then let the policy service rule on it. The `after`
//! variant inspects the command's output as the response direction.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::info;
use tracing::warn;

use mcpower_core::McpowerErr;
use mcpower_core::redaction::redact_str;
use mcpower_core::redaction::redact_text;
use mcpower_core::shell::parse_shell_command;
use mcpower_core::shell::parse_shell_command_in;

use crate::handlers::HookContext;
use crate::handlers::inspect_and_enforce;
use crate::handlers::truncate_at;
use crate::output::HookKind;
use crate::output::HookOutcome;
use crate::output::error_outcome;
use crate::output::verdict;

#[derive(Debug, Deserialize)]
struct ShellExecutionInput {
    command: String,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

pub async fn handle_shell_execution(
    ctx: &HookContext,
    tool_name: &str,
    input: &Value,
    is_request: bool,
) -> HookOutcome {
    let parsed: ShellExecutionInput = match serde_json::from_value(input.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("shell execution input validation failed: {e}");
            return error_outcome(
                ctx.config.format,
                HookKind::Permission,
                &format!("invalid input: {e}"),
            );
        }
    };
    if is_request && parsed.cwd.is_none() {
        return error_outcome(
            ctx.config.format,
            HookKind::Permission,
            "invalid input: missing field `cwd`",
        );
    }

    info!(
        "{tool_name} handler started (command: '{}')",
        truncate_at(&parsed.command, 200)
    );

    let redacted_command = redact_text(&parsed.command);
    let content_data = if is_request {
        // File extraction uses the on-disk heuristic only when the IDE told
        // us where the command will run.
        let analysis = match parsed.cwd.as_deref() {
            Some(cwd) => parse_shell_command_in(&parsed.command, Some(Path::new(cwd))),
            None => parse_shell_command(&parsed.command),
        };
        json!({
            "command": redacted_command,
            "sub_commands": analysis.sub_commands,
            "input_files": analysis.input_files,
            "packages": analysis.packages,
        })
    } else {
        json!({
            "command": redacted_command,
            "output": parsed.output.as_deref().map(redact_str),
        })
    };

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

    match inspect_and_enforce(ctx, tool_name, content_data, is_request, Vec::new()).await {
        Ok(decision) => {
            ctx.audit.log_event(
                "agent_request_forwarded",
                json!({
                    "server": ctx.config.server_name,
                    "tool": tool_name,
                    "params": {"command": redacted_command},
                }),
                &ctx.event_id,
                Some(&ctx.prompt_id),
                None,
            );
            let agent_message = if decision.reasons.is_empty() {
                "Shell command approved".to_string()
            } else {
                format!("Shell command approved: {}", decision.reasons.join("; "))
            };
            verdict(
                ctx.config.format,
                HookKind::Permission,
                true,
                Some("Shell command approved"),
                Some(&agent_message),
            )
        }
        Err(e) if e.is_policy_outcome() => {
            let user_message = if matches!(e, McpowerErr::UserBlocked) {
                "Shell command blocked by user"
            } else {
                "Shell command blocked by security policy"
            };
            warn!("{tool_name} blocked: {e}");
            verdict(
                ctx.config.format,
                HookKind::Permission,
                false,
                Some(user_message),
                Some(&e.to_string()),
            )
        }
        Err(e) => error_outcome(ctx.config.format, HookKind::Permission, &e.to_string()),
    }
}
