//! Decision enforcement: turns a policy verdict into allow / deny / dialog.
//!
//! Two env-backed knobs shape `block` handling, both read per call:
//! `MIN_BLOCK_SEVERITY` downgrades blocks below the threshold to auto-allow
//! (critical always enforces), and `ALLOW_BLOCK_OVERRIDE` decides whether an
//! enforced block shows an override dialog or denies outright.

use std::sync::Arc;
use std::sync::LazyLock;

use serde_json::json;
use tracing::info;
use tracing::warn;

use crate::audit::AuditTrailLogger;
use crate::confirm::ConfirmationDialog;
use crate::confirm::ConfirmationRequest;
use crate::confirm::DialogOptions;
use crate::error::McpowerErr;
use crate::error::Result;
use crate::flags;
use crate::policy_client::SecurityPolicyClient;
use crate::policy_types::Decision;
use crate::policy_types::Direction;
use crate::policy_types::PolicyVerdict;
use crate::policy_types::Severity;
use crate::policy_types::UserConfirmation;
use crate::policy_types::UserDecision;

/// Server-side dotted context paths, translated to the wrapper advisory
/// argument the agent must populate. Extending the advisory set means
/// extending this table and the schema augmenter together.
const NEED_FIELD_MAPPING: &[(&str, &str)] = &[
    ("context.agent.intent", "__wrapper_modelIntent"),
    ("context.agent.plan", "__wrapper_modelPlan"),
    ("context.agent.expectedOutputs", "__wrapper_modelExpectedOutputs"),
    ("context.agent.user_prompt", "__wrapper_userPrompt"),
    ("context.agent.user_prompt_id", "__wrapper_userPromptId"),
    ("context.agent.context_summary", "__wrapper_contextSummary"),
    ("context.workspace.current_files", "__wrapper_currentFiles"),
];

/// Dialogs present one at a time per process; concurrent escalations queue
/// here.
static DIALOG_GATE: LazyLock<tokio::sync::Mutex<()>> =
    LazyLock::new(|| tokio::sync::Mutex::new(()));

/// Everything enforcement needs to know about the operation under review.
pub struct EnforcementContext<'a> {
    pub is_request: bool,
    pub event_id: &'a str,
    pub tool_name: &'a str,
    /// Redacted operation content, shown to the user in dialogs.
    pub content_data: serde_json::Value,
    pub operation_type: &'a str,
    pub prompt_id: Option<&'a str>,
    pub server_name: &'a str,
}

pub struct DecisionHandler {
    policy: Arc<SecurityPolicyClient>,
    audit: AuditTrailLogger,
    dialog: Arc<dyn ConfirmationDialog>,
}

impl DecisionHandler {
    pub fn new(
        policy: Arc<SecurityPolicyClient>,
        audit: AuditTrailLogger,
        dialog: Arc<dyn ConfirmationDialog>,
    ) -> Self {
        Self {
            policy,
            audit,
            dialog,
        }
    }

    /// Apply `verdict` to the operation in `ctx`. `Ok(())` lets the pipeline
    /// continue; any `Err` aborts it.
    pub async fn enforce(
        &self,
        verdict: &PolicyVerdict,
        ctx: &EnforcementContext<'_>,
    ) -> Result<()> {
        match verdict.decision {
            Decision::Allow => Ok(()),
            Decision::Block => self.enforce_block(verdict, ctx).await,
            Decision::RequiredExplicitUserConfirmation => {
                self.enforce_confirmation(verdict, ctx).await
            }
            Decision::NeedMoreInfo => Err(McpowerErr::NeedMoreInfo(need_more_info_message(
                ctx.is_request,
                &verdict.reasons,
                &verdict.need_fields,
            ))),
        }
    }

    async fn enforce_block(
        &self,
        verdict: &PolicyVerdict,
        ctx: &EnforcementContext<'_>,
    ) -> Result<()> {
        let severity = verdict.severity;
        let min = Severity::parse(&flags::min_block_severity());
        let enforced = severity == Severity::Critical || severity.rank() >= min.rank();

        if !enforced {
            info!(
                "block verdict for '{}' auto-allowed: severity {} below threshold {}",
                ctx.tool_name,
                severity.as_str(),
                min.as_str()
            );
            self.record(ctx, UserDecision::Allow, verdict.call_type.as_deref())
                .await;
            return Ok(());
        }

        if !flags::allow_block_override() {
            self.record(ctx, UserDecision::Block, verdict.call_type.as_deref())
                .await;
            return Err(McpowerErr::UserBlocked);
        }

        let request = self.confirmation_request(verdict, ctx);
        self.audit_dialog_event("user_confirmation_request", &request, ctx);
        let decision = {
            let _gate = DIALOG_GATE.lock().await;
            self.dialog
                .request_blocking_confirmation(&request, ctx.prompt_id, verdict.call_type.as_deref())
                .await
        };
        self.audit_dialog_response(&request, ctx, decision);

        match decision {
            UserDecision::Allow | UserDecision::AllowAlways => {
                info!(
                    "user overrode blocked {} operation for tool '{}' (event: {})",
                    ctx.operation_type, ctx.tool_name, ctx.event_id
                );
                self.record(ctx, decision, verdict.call_type.as_deref()).await;
                Ok(())
            }
            UserDecision::Block => {
                warn!(
                    "user upheld block for tool '{}' (event: {})",
                    ctx.tool_name, ctx.event_id
                );
                self.record(ctx, UserDecision::Block, verdict.call_type.as_deref())
                    .await;
                Err(McpowerErr::UserBlocked)
            }
        }
    }

    async fn enforce_confirmation(
        &self,
        verdict: &PolicyVerdict,
        ctx: &EnforcementContext<'_>,
    ) -> Result<()> {
        let request = self.confirmation_request(verdict, ctx);
        let options = DialogOptions {
            // "Always Allow" only makes sense when the policy classified the
            // call, otherwise there is nothing stable to remember.
            show_always_allow: verdict.call_type.is_some(),
            show_always_block: false,
        };

        self.audit_dialog_event("user_confirmation_request", &request, ctx);
        let decision = {
            let _gate = DIALOG_GATE.lock().await;
            self.dialog
                .request_confirmation(&request, ctx.prompt_id, verdict.call_type.as_deref(), options)
                .await
        };
        self.audit_dialog_response(&request, ctx, decision);

        match decision {
            UserDecision::Allow | UserDecision::AllowAlways => {
                info!(
                    "user {} {} operation for tool '{}' (event: {})",
                    decision.as_str(),
                    ctx.operation_type,
                    ctx.tool_name,
                    ctx.event_id
                );
                self.record(ctx, decision, verdict.call_type.as_deref()).await;
                Ok(())
            }
            UserDecision::Block => {
                self.record(ctx, UserDecision::Block, verdict.call_type.as_deref())
                    .await;
                Err(McpowerErr::UserBlocked)
            }
        }
    }

    fn confirmation_request(
        &self,
        verdict: &PolicyVerdict,
        ctx: &EnforcementContext<'_>,
    ) -> ConfirmationRequest {
        let policy_reasons = if verdict.reasons.is_empty() {
            vec!["Policy violation".to_string()]
        } else {
            verdict.reasons.clone()
        };
        ConfirmationRequest {
            is_request: ctx.is_request,
            tool_name: ctx.tool_name.to_string(),
            policy_reasons,
            content_data: ctx.content_data.clone(),
            severity: verdict.severity,
            event_id: ctx.event_id.to_string(),
            operation_type: ctx.operation_type.to_string(),
            server_name: ctx.server_name.to_string(),
            timeout: *flags::MCPOWER_DIALOG_TIMEOUT_MS,
        }
    }

    fn audit_dialog_event(
        &self,
        event_type: &str,
        request: &ConfirmationRequest,
        ctx: &EnforcementContext<'_>,
    ) {
        self.audit.log_event(
            event_type,
            json!({
                "server": ctx.server_name,
                "tool": ctx.tool_name,
                "reasons": request.policy_reasons,
                "severity": request.severity.as_str(),
            }),
            ctx.event_id,
            ctx.prompt_id,
            None,
        );
    }

    fn audit_dialog_response(
        &self,
        request: &ConfirmationRequest,
        ctx: &EnforcementContext<'_>,
        decision: UserDecision,
    ) {
        self.audit.log_event(
            "user_confirmation_response",
            json!({
                "server": ctx.server_name,
                "tool": ctx.tool_name,
                "severity": request.severity.as_str(),
                "user_decision": decision.as_str(),
            }),
            ctx.event_id,
            ctx.prompt_id,
            None,
        );
    }

    async fn record(
        &self,
        ctx: &EnforcementContext<'_>,
        decision: UserDecision,
        call_type: Option<&str>,
    ) {
        let confirmation = UserConfirmation {
            event_id: ctx.event_id.to_string(),
            direction: if ctx.is_request {
                Direction::Request
            } else {
                Direction::Response
            },
            user_decision: decision,
            call_type: call_type.map(str::to_string),
        };
        self.policy
            .record_user_confirmation(&confirmation, ctx.prompt_id)
            .await;
    }
}

/// The actionable retry message for `need_more_info` verdicts.
pub fn need_more_info_message(is_request: bool, reasons: &[String], need_fields: &[String]) -> String {
    let stage = if is_request {
        "CLIENT REQUEST"
    } else {
        "TOOL RESPONSE"
    };

    let mut parts = vec![
        format!("SECURITY POLICY NEEDS MORE INFORMATION FOR REVIEWING {stage}:"),
        reasons.join("\n"),
        String::new(),
    ];

    if !need_fields.is_empty() {
        parts.push("AFFECTED FIELDS:".to_string());
        for field in need_fields {
            let translated = NEED_FIELD_MAPPING
                .iter()
                .find(|(server_path, _)| server_path == field)
                .map_or(field.as_str(), |(_, wrapper)| wrapper);
            parts.push(translated.to_string());
        }
    }

    parts.push("\nMANDATORY ACTIONS:".to_string());
    parts.push("1. Add/Edit ALL affected fields according to the required information".to_string());
    parts.push("2. Retry the tool call".to_string());
    parts.join("\n")
}
