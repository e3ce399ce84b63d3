//! Short-lived IDE hook handlers.
//!
//! One process per hook invocation: JSON in on stdin, an IDE-shaped verdict
//! out on stdout, and an exit code per the hook contract. All policy and
//! redaction machinery comes from `mcpower-core`.

use std::sync::Arc;

mod claude_code;
mod cursor;
pub mod handlers;
pub mod output;

pub use claude_code::route_claude_code;
pub use cursor::route_cursor;

use mcpower_core::audit::AuditTrailLogger;
use mcpower_core::audit::JsonlSink;
use mcpower_core::flags;
use mcpower_core::ids::mcpower_dir;

/// Process-level wiring shared by both routers. Tests swap in a local
/// policy URL and an in-memory audit sink.
pub struct HookRuntime {
    pub policy_base_url: String,
    pub audit: AuditTrailLogger,
}

impl HookRuntime {
    pub fn from_env() -> Self {
        Self {
            policy_base_url: flags::MCPOWER_API_BASE.to_string(),
            audit: AuditTrailLogger::new(Arc::new(JsonlSink::new(mcpower_dir(None)))),
        }
    }
}
