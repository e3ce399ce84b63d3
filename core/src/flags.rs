use std::time::Duration;

use env_flags::env_flags;

env_flags! {
    /// Verbose logging to stderr when set to a truthy value.
    pub MCPOWER_DEBUG: bool = false, |value| {
        Ok::<_, std::convert::Infallible>(matches!(value.as_str(), "1" | "true" | "yes"))
    };

    /// Base URL of the security policy service.
    pub MCPOWER_API_BASE: &str = "https://api.mcpower.ai";

    /// Bearer token for the policy service, if the deployment requires one.
    pub MCPOWER_API_KEY: Option<&str> = None;

    pub MCPOWER_API_TIMEOUT_MS: Duration = Duration::from_millis(15_000), |value| {
        value.parse().map(Duration::from_millis)
    };

    pub MCPOWER_DIALOG_TIMEOUT_MS: Duration = Duration::from_millis(60_000), |value| {
        value.parse().map(Duration::from_millis)
    };
}

/// Minimum severity a `block` verdict needs to be enforced. Read per call so
/// tests (and users) can flip it without restarting the process.
pub fn min_block_severity() -> String {
    std::env::var("MIN_BLOCK_SEVERITY").unwrap_or_else(|_| "low".to_string())
}

/// Whether an enforced `block` shows an override dialog (`true`) or denies
/// immediately (`false`).
pub fn allow_block_override() -> bool {
    match std::env::var("ALLOW_BLOCK_OVERRIDE") {
        Ok(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "0"),
        Err(_) => true,
    }
}
