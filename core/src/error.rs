use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, McpowerErr>;

#[derive(Error, Debug)]
pub enum McpowerErr {
    /// The policy service rejected the operation outright.
    #[error("{0}")]
    PolicyDenied(String),

    /// The user declined the operation in a confirmation dialog (or the
    /// dialog timed out). The message is part of the wire contract.
    #[error("Security Violation. User blocked the operation")]
    UserBlocked,

    /// The policy service needs additional agent context before it can rule.
    /// The message is the full actionable text handed back to the agent.
    #[error("{0}")]
    NeedMoreInfo(String),

    /// Malformed hook input or a missing required field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The wrapped server configuration could not be understood.
    #[error("invalid wrapped server config: {0}")]
    InvalidConfig(String),

    /// The wrapped server failed or misbehaved while handling a forwarded
    /// operation.
    #[error("wrapped server error: {0}")]
    WrappedServer(String),

    // -----------------------------------------------------------------
    // Automatic conversions for common external error types
    // -----------------------------------------------------------------
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl McpowerErr {
    /// True for the error kinds a hook maps to a `deny` verdict with exit
    /// code 0 (the policy spoke) rather than exit code 1 (we failed).
    pub fn is_policy_outcome(&self) -> bool {
        matches!(
            self,
            McpowerErr::PolicyDenied(_) | McpowerErr::UserBlocked | McpowerErr::NeedMoreInfo(_)
        )
    }
}
