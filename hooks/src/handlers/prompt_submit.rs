//! Prompt-submit hook: redact the prompt, let the policy service veto it.

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::info;
use tracing::warn;

use mcpower_core::redaction::redact_text;

use crate::handlers::HookContext;
use crate::handlers::inspect_and_enforce;
use crate::handlers::truncate_at;
use crate::output::HookKind;
use crate::output::HookOutcome;
use crate::output::error_outcome;
use crate::output::verdict;

#[derive(Debug, Deserialize)]
struct PromptSubmitInput {
    prompt: String,
    #[serde(default)]
    attachments: Vec<Value>,
}

pub async fn handle_prompt_submit(ctx: &HookContext, tool_name: &str, input: &Value) -> HookOutcome {
    let parsed: PromptSubmitInput = match serde_json::from_value(input.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("prompt submit input validation failed: {e}");
            return error_outcome(ctx.config.format, HookKind::Continue, &format!("invalid input: {e}"));
        }
    };

    info!(
        "{tool_name} handler started (prompt: '{}')",
        truncate_at(&parsed.prompt, 120)
    );

    let redacted_prompt = redact_text(&parsed.prompt);
    let current_files: Vec<String> = parsed
        .attachments
        .iter()
        .filter_map(|a| a.get("file_path").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    ctx.audit.log_event(
        "agent_request",
        json!({
            "server": ctx.config.server_name,
            "tool": tool_name,
            "params": {"prompt": redacted_prompt, "attachments_count": parsed.attachments.len()},
        }),
        &ctx.event_id,
        Some(&ctx.prompt_id),
        Some(&redacted_prompt),
    );

    let content_data = json!({"prompt": redacted_prompt});
    match inspect_and_enforce(ctx, tool_name, content_data, true, current_files).await {
        Ok(_) => {
            ctx.audit.log_event(
                "agent_request_forwarded",
                json!({
                    "server": ctx.config.server_name,
                    "tool": tool_name,
                }),
                &ctx.event_id,
                Some(&ctx.prompt_id),
                None,
            );
            verdict(ctx.config.format, HookKind::Continue, true, None, None)
        }
        Err(e) if e.is_policy_outcome() => {
            warn!("{tool_name} blocked: {e}");
            verdict(
                ctx.config.format,
                HookKind::Continue,
                false,
                Some("Prompt blocked by security policy"),
                Some(&e.to_string()),
            )
        }
        Err(e) => error_outcome(ctx.config.format, HookKind::Continue, &e.to_string()),
    }
}
