//! IDE-specific verdict shapes and exit codes.
//!
//! Claude Code reads structured JSON and always gets exit 0 for a produced
//! verdict; Cursor uses `permission`/`continue` bodies and a non-zero exit
//! for validation failures. Either way, a hook that cannot decide emits a
//! deny-shaped body.

use serde_json::Value;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeFormat {
    ClaudeCode,
    Cursor,
}

/// Permission hooks gate one operation; continue hooks gate the prompt
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Permission,
    Continue,
}

/// What the hook prints and how it exits.
#[derive(Debug, Clone, PartialEq)]
pub struct HookOutcome {
    pub body: Value,
    pub exit_code: i32,
}

impl HookOutcome {
    pub fn ok(body: Value) -> Self {
        Self { body, exit_code: 0 }
    }
}

pub fn verdict(
    format: IdeFormat,
    kind: HookKind,
    allowed: bool,
    user_message: Option<&str>,
    agent_message: Option<&str>,
) -> HookOutcome {
    let body = match (format, kind) {
        (IdeFormat::ClaudeCode, HookKind::Permission) => {
            let mut body = json!({
                "permissionDecision": if allowed { "allow" } else { "deny" },
            });
            if let Some(reason) = agent_message.or(user_message) {
                body["permissionDecisionReason"] = json!(reason);
            }
            body
        }
        (IdeFormat::ClaudeCode, HookKind::Continue) => {
            if allowed {
                json!({})
            } else {
                json!({
                    "decision": "block",
                    "reason": agent_message
                        .or(user_message)
                        .unwrap_or("Blocked by security policy"),
                })
            }
        }
        (IdeFormat::Cursor, HookKind::Permission) => json!({
            "permission": if allowed { "allow" } else { "deny" },
            "user_message": user_message,
            "agent_message": agent_message,
        }),
        (IdeFormat::Cursor, HookKind::Continue) => json!({"continue": allowed}),
    };
    HookOutcome::ok(body)
}

/// Validation failure or unexpected internal error: a deny-shaped body with
/// the error exit code.
pub fn error_outcome(format: IdeFormat, kind: HookKind, message: &str) -> HookOutcome {
    let mut outcome = verdict(format, kind, false, Some(message), Some(message));
    outcome.exit_code = 1;
    outcome
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn claude_permission_shapes() {
        let allow = verdict(IdeFormat::ClaudeCode, HookKind::Permission, true, None, None);
        assert_eq!(allow.body, json!({"permissionDecision": "allow"}));
        assert_eq!(allow.exit_code, 0);

        let deny = verdict(
            IdeFormat::ClaudeCode,
            HookKind::Permission,
            false,
            Some("blocked"),
            Some("policy said no"),
        );
        assert_eq!(
            deny.body,
            json!({"permissionDecision": "deny", "permissionDecisionReason": "policy said no"})
        );
        assert_eq!(deny.exit_code, 0);
    }

    #[test]
    fn claude_prompt_submit_shapes() {
        let allow = verdict(IdeFormat::ClaudeCode, HookKind::Continue, true, None, None);
        assert_eq!(allow.body, json!({}));

        let block = verdict(
            IdeFormat::ClaudeCode,
            HookKind::Continue,
            false,
            None,
            Some("nope"),
        );
        assert_eq!(block.body, json!({"decision": "block", "reason": "nope"}));
    }

    #[test]
    fn cursor_shapes() {
        let deny = verdict(
            IdeFormat::Cursor,
            HookKind::Permission,
            false,
            Some("blocked by policy"),
            Some("reason"),
        );
        assert_eq!(
            deny.body,
            json!({"permission": "deny", "user_message": "blocked by policy", "agent_message": "reason"})
        );

        let go_on = verdict(IdeFormat::Cursor, HookKind::Continue, true, None, None);
        assert_eq!(go_on.body, json!({"continue": true}));
    }

    #[test]
    fn error_outcome_is_deny_shaped_with_exit_one() {
        let outcome = error_outcome(IdeFormat::Cursor, HookKind::Permission, "bad input");
        assert_eq!(outcome.body["permission"], "deny");
        assert_eq!(outcome.exit_code, 1);
    }
}
