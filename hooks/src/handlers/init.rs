//! Session-start / init hook: registers the IDE's hook surface with the
//! policy service as virtual tools. Registration is best-effort; a session
//! never fails to start because the API was down.

use serde_json::json;

use mcpower_core::policy_types::InitRequest;
use mcpower_core::policy_types::ToolRef;

use crate::handlers::HookContext;
use crate::output::HookOutcome;

/// Hook catalog entries: (name, description).
pub type HookCatalog = &'static [(&'static str, &'static str)];

pub const CLAUDE_CODE_HOOKS: HookCatalog = &[
    (
        "UserPromptSubmit",
        "Runs when the user submits a prompt, before the agent processes it; \
         can validate or block prompts.",
    ),
    (
        "PreToolUse(Read)",
        "Triggered before the agent reads a file; allows inspection and \
         potential blocking of file read operations.",
    ),
    (
        "PreToolUse(Grep)",
        "Triggered before the agent searches file contents; allows inspection \
         and potential blocking of file search operations.",
    ),
    (
        "PreToolUse(Bash)",
        "Triggered before a shell command is executed by the agent; allows \
         inspection and potential blocking of shell commands.",
    ),
];

pub const CURSOR_HOOKS: HookCatalog = &[
    ("beforeSubmitPrompt", "Validates a user prompt before submission."),
    ("beforeReadFile", "Inspects file content before the agent reads it."),
    ("beforeShellExecution", "Inspects a shell command before execution."),
    ("afterShellExecution", "Inspects shell output after execution."),
    ("beforeMCPExecution", "Inspects an MCP tool call before execution."),
];

pub async fn handle_init(ctx: &HookContext, catalog: HookCatalog) -> HookOutcome {
    let app_uid = ctx.app_uid();

    ctx.audit.log_event(
        "agent_request",
        json!({
            "server": ctx.config.server_name,
            "tool": "init",
            "params": {"hooks": catalog.len()},
        }),
        &ctx.event_id,
        Some(&ctx.prompt_id),
        None,
    );

    let init = InitRequest {
        environment: ctx.env_context(Vec::new()),
        server: ctx.server_ref(),
        tools: catalog
            .iter()
            .map(|(name, description)| ToolRef {
                name: (*name).to_string(),
                description: (*description).to_string(),
                version: Some("1.0.0".to_string()),
            })
            .collect(),
    };
    ctx.policy_client(&app_uid)
        .init_tools(&init, &ctx.event_id, Some(&ctx.prompt_id))
        .await;

    HookOutcome::ok(json!({
        "success": true,
        "message": format!("{} hooks registered", catalog.len()),
    }))
}
