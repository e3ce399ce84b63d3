//! Abstract confirmation-dialog capability.
//!
//! The proxy never renders UI itself; it asks an injected
//! [`ConfirmationDialog`] and acts on the returned [`UserDecision`].
//! Headless deployments get [`DenyAllDialog`], which answers `BLOCK` for
//! everything, matching the dialog-timeout behavior.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::policy_types::Severity;
use crate::policy_types::UserDecision;

/// Everything a dialog needs to render one decision for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationRequest {
    pub is_request: bool,
    pub tool_name: String,
    pub policy_reasons: Vec<String>,
    pub content_data: serde_json::Value,
    pub severity: Severity,
    pub event_id: String,
    pub operation_type: String,
    pub server_name: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialogOptions {
    /// Offer "Always Allow". Only meaningful when the verdict carried a
    /// `call_type`.
    pub show_always_allow: bool,
    pub show_always_block: bool,
}

#[async_trait]
pub trait ConfirmationDialog: Send + Sync {
    /// Three-way (or two-way, per `options`) confirmation for
    /// `required_explicit_user_confirmation` verdicts. Blocks until the user
    /// answers or the request times out; timeout means `BLOCK`.
    async fn request_confirmation(
        &self,
        request: &ConfirmationRequest,
        prompt_id: Option<&str>,
        call_type: Option<&str>,
        options: DialogOptions,
    ) -> UserDecision;

    /// Two-button override dialog for enforced `block` verdicts, `BLOCK`
    /// being the default.
    async fn request_blocking_confirmation(
        &self,
        request: &ConfirmationRequest,
        prompt_id: Option<&str>,
        call_type: Option<&str>,
    ) -> UserDecision;
}

/// Fallback when no dialog capability is wired: every escalation is denied.
pub struct DenyAllDialog;

#[async_trait]
impl ConfirmationDialog for DenyAllDialog {
    async fn request_confirmation(
        &self,
        _request: &ConfirmationRequest,
        _prompt_id: Option<&str>,
        _call_type: Option<&str>,
        _options: DialogOptions,
    ) -> UserDecision {
        UserDecision::Block
    }

    async fn request_blocking_confirmation(
        &self,
        _request: &ConfirmationRequest,
        _prompt_id: Option<&str>,
        _call_type: Option<&str>,
    ) -> UserDecision {
        UserDecision::Block
    }
}

/// Test double that answers from a scripted queue (last answer repeats) and
/// records every request it was shown.
pub struct ScriptedDialog {
    answers: Mutex<Vec<UserDecision>>,
    seen: Mutex<Vec<(ConfirmationRequest, DialogOptions)>>,
}

impl ScriptedDialog {
    pub fn answering(answers: Vec<UserDecision>) -> Self {
        Self {
            answers: Mutex::new(answers),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(ConfirmationRequest, DialogOptions)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn next_answer(&self) -> UserDecision {
        let mut answers = match self.answers.lock() {
            Ok(answers) => answers,
            Err(_) => return UserDecision::Block,
        };
        if answers.len() > 1 {
            answers.remove(0)
        } else {
            answers.first().copied().unwrap_or(UserDecision::Block)
        }
    }

    fn record(&self, request: &ConfirmationRequest, options: DialogOptions) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((request.clone(), options));
        }
    }
}

#[async_trait]
impl ConfirmationDialog for ScriptedDialog {
    async fn request_confirmation(
        &self,
        request: &ConfirmationRequest,
        _prompt_id: Option<&str>,
        _call_type: Option<&str>,
        options: DialogOptions,
    ) -> UserDecision {
        self.record(request, options);
        self.next_answer()
    }

    async fn request_blocking_confirmation(
        &self,
        request: &ConfirmationRequest,
        _prompt_id: Option<&str>,
        _call_type: Option<&str>,
    ) -> UserDecision {
        self.record(request, DialogOptions::default());
        self.next_answer()
    }
}
