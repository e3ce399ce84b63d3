//! Core security machinery shared by the MCP wrapper and the IDE hooks:
//! redaction, shell-command analysis, the policy-service client, decision
//! enforcement, audit logging and per-workspace identity.

pub mod audit;
pub mod confirm;
pub mod decision;
pub mod error;
pub mod flags;
pub mod ids;
pub mod policy_client;
pub mod policy_types;
pub mod redaction;
pub mod schema;
pub mod shell;

pub use error::McpowerErr;
pub use error::Result;
