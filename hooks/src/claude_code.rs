//! Claude Code hook router: normalizes the Claude Code envelope and
//! dispatches to the shared handlers.

use serde_json::Value;
use serde_json::json;
use tracing::error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::HookRuntime;
use crate::handlers::CLAUDE_CODE_CONFIG;
use crate::handlers::HookContext;
use crate::handlers::init::CLAUDE_CODE_HOOKS;
use crate::handlers::init::handle_init;
use crate::handlers::prompt_submit::handle_prompt_submit;
use crate::handlers::read_file::handle_read_file;
use crate::handlers::shell_execution::handle_shell_execution;
use crate::output::HookOutcome;

/// Silent failure: no verdict body, exit 1. Claude Code treats this as an
/// internal hook error.
fn fail() -> HookOutcome {
    HookOutcome {
        body: Value::Null,
        exit_code: 1,
    }
}

pub async fn route_claude_code(runtime: &HookRuntime, stdin_input: &str) -> HookOutcome {
    let input: Value = match serde_json::from_str(stdin_input) {
        Ok(input) => input,
        Err(e) => {
            error!("failed to parse input JSON: {e}");
            return fail();
        }
    };

    let Some(hook_event_name) = input.get("hook_event_name").and_then(Value::as_str) else {
        error!("missing required field 'hook_event_name' in input");
        return fail();
    };
    let Some(session_id) = input.get("session_id").and_then(Value::as_str) else {
        error!("missing required field 'session_id' in input");
        return fail();
    };
    let Some(cwd) = input.get("cwd").and_then(Value::as_str) else {
        error!("missing required field 'cwd' in input");
        return fail();
    };

    let prompt_id: String = session_id.chars().take(8).collect();
    let event_id: String = Uuid::new_v4().simple().to_string()[..8].to_string();
    info!(
        "claude code router: routing to {hook_event_name} handler \
         (prompt_id={prompt_id}, event_id={event_id}, cwd={cwd})"
    );

    let ctx = HookContext {
        config: CLAUDE_CODE_CONFIG,
        audit: runtime.audit.clone(),
        policy_base_url: runtime.policy_base_url.clone(),
        session_id: session_id.to_string(),
        prompt_id,
        event_id,
        cwd: Some(cwd.into()),
        workspace_roots: Vec::new(),
    };

    match hook_event_name {
        "SessionStart" => handle_init(&ctx, CLAUDE_CODE_HOOKS).await,
        "UserPromptSubmit" => handle_prompt_submit(&ctx, "UserPromptSubmit", &input).await,
        "PreToolUse" => {
            let tool_name = input
                .get("tool_name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let tool_input = input.get("tool_input").cloned().unwrap_or(json!({}));
            match tool_name {
                "Read" | "Grep" => {
                    // Claude Code provides no attachments, only the file
                    // itself.
                    let unwrapped = json!({
                        "file_path": tool_input.get("file_path"),
                        "content": tool_input.get("content"),
                    });
                    handle_read_file(&ctx, &format!("PreToolUse({tool_name})"), &unwrapped).await
                }
                "Bash" => {
                    let unwrapped = json!({
                        "command": tool_input.get("command"),
                        "cwd": cwd,
                    });
                    handle_shell_execution(
                        &ctx,
                        &format!("PreToolUse({tool_name})"),
                        &unwrapped,
                        true,
                    )
                    .await
                }
                other => {
                    warn!("unknown tool_name in PreToolUse: {other}, allowing by default");
                    HookOutcome::ok(json!({"permissionDecision": "allow"}))
                }
            }
        }
        other => {
            error!("unknown hook_event_name: {other}");
            fail()
        }
    }
}
