//! Cursor hook router.

use serde_json::Value;
use tracing::error;
use tracing::info;
use uuid::Uuid;

use crate::HookRuntime;
use crate::handlers::CURSOR_CONFIG;
use crate::handlers::HookContext;
use crate::handlers::init::CURSOR_HOOKS;
use crate::handlers::init::handle_init;
use crate::handlers::mcp_execution::handle_mcp_execution;
use crate::handlers::prompt_submit::handle_prompt_submit;
use crate::handlers::read_file::handle_read_file;
use crate::handlers::shell_execution::handle_shell_execution;
use crate::output::HookKind;
use crate::output::HookOutcome;
use crate::output::error_outcome;

use mcpower_core::ids::session_id;

pub async fn route_cursor(runtime: &HookRuntime, stdin_input: &str) -> HookOutcome {
    let input: Value = match serde_json::from_str(stdin_input) {
        Ok(input) => input,
        Err(e) => {
            error!("failed to parse input JSON: {e}");
            return error_outcome(
                CURSOR_CONFIG.format,
                HookKind::Permission,
                &format!("invalid input: {e}"),
            );
        }
    };

    let Some(hook_event_name) = input.get("hook_event_name").and_then(Value::as_str) else {
        error!("missing required field 'hook_event_name' in input");
        return error_outcome(
            CURSOR_CONFIG.format,
            HookKind::Permission,
            "invalid input: missing field `hook_event_name`",
        );
    };
    let Some(conversation_id) = input.get("conversation_id").and_then(Value::as_str) else {
        error!("missing required field 'conversation_id' in input");
        return error_outcome(
            CURSOR_CONFIG.format,
            HookKind::Permission,
            "invalid input: missing field `conversation_id`",
        );
    };

    let event_id = input
        .get("generation_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string()[..8].to_string());
    let workspace_roots: Vec<String> = input
        .get("workspace_roots")
        .and_then(Value::as_array)
        .map(|roots| {
            roots
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let cwd = input.get("cwd").and_then(Value::as_str).map(Into::into);

    info!(
        "cursor router: routing to {hook_event_name} handler \
         (prompt_id={conversation_id}, event_id={event_id})"
    );

    let ctx = HookContext {
        config: CURSOR_CONFIG,
        audit: runtime.audit.clone(),
        policy_base_url: runtime.policy_base_url.clone(),
        session_id: session_id().to_string(),
        prompt_id: conversation_id.to_string(),
        event_id,
        cwd,
        workspace_roots,
    };

    match hook_event_name {
        "init" => handle_init(&ctx, CURSOR_HOOKS).await,
        "beforeSubmitPrompt" => handle_prompt_submit(&ctx, "beforeSubmitPrompt", &input).await,
        "beforeReadFile" => handle_read_file(&ctx, "beforeReadFile", &input).await,
        "beforeShellExecution" => {
            handle_shell_execution(&ctx, "beforeShellExecution", &input, true).await
        }
        "afterShellExecution" => {
            handle_shell_execution(&ctx, "afterShellExecution", &input, false).await
        }
        "beforeMCPExecution" => handle_mcp_execution(&ctx, "beforeMCPExecution", &input).await,
        other => {
            error!("unknown hook_event_name: {other}");
            error_outcome(
                CURSOR_CONFIG.format,
                HookKind::Permission,
                &format!("unknown hook: {other}"),
            )
        }
    }
}
