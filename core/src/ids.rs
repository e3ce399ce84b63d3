//! Event, session and app identity.
//!
//! The session id is allocated once per process. The app uid is a UUID
//! persisted under `<workspace>/.mcpower/app_uid` (or `~/.mcpower/app_uid`
//! when there is no workspace) so the policy service can correlate events
//! from the same project across sessions.

use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

static SESSION_ID: LazyLock<String> = LazyLock::new(|| Uuid::new_v4().to_string());

/// Process-wide session id. Stable for the lifetime of the process.
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Unique id for one inspected MCP operation: `<unix-millis>-<8 hex>`.
pub fn generate_event_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let unique = Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &unique[..8])
}

/// Prompt id derived from a session id when the IDE did not supply one.
pub fn prompt_id_from_session(session_id: &str) -> String {
    session_id.chars().take(8).collect()
}

fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value.trim()).is_ok()
}

/// Directory that holds per-project state for `project_root`, or the home
/// fallback when no workspace root is known.
pub fn mcpower_dir(project_root: Option<&Path>) -> PathBuf {
    match project_root {
        Some(root) => root.join(".mcpower"),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mcpower"),
    }
}

/// Read the app uid for `project_root`, creating it on first use.
///
/// An existing file whose content is not a valid UUID is overwritten with a
/// fresh one; a valid file is never rewritten.
pub fn read_app_uid(project_root: Option<&Path>) -> Result<String> {
    let dir = mcpower_dir(project_root);
    read_app_uid_at(&dir)
}

/// Same as [`read_app_uid`] but takes the `.mcpower` directory directly.
pub fn read_app_uid_at(dir: &Path) -> Result<String> {
    let uid_path = dir.join("app_uid");
    std::fs::create_dir_all(dir)?;

    if uid_path.exists() {
        let existing = std::fs::read_to_string(&uid_path)?;
        let existing = existing.trim();
        if is_valid_uuid(existing) {
            return Ok(existing.to_string());
        }
        warn!("invalid UUID in {}, generating a new one", uid_path.display());
    }

    let new_uid = Uuid::new_v4().to_string();
    std::fs::write(&uid_path, &new_uid)?;
    info!("generated app uid {new_uid}");
    Ok(new_uid)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn session_id_is_stable() {
        assert_eq!(session_id(), session_id());
        assert!(is_valid_uuid(session_id()));
    }

    #[test]
    fn event_ids_are_unique_and_shaped() {
        let a = generate_event_id();
        let b = generate_event_id();
        assert_ne!(a, b);
        let (millis, suffix) = a.split_once('-').unwrap();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn app_uid_created_then_stable() {
        let dir = TempDir::new().unwrap();
        let first = read_app_uid(Some(dir.path())).unwrap();
        assert!(is_valid_uuid(&first));
        let second = read_app_uid(Some(dir.path())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_app_uid_is_replaced() {
        let dir = TempDir::new().unwrap();
        let mcpower = dir.path().join(".mcpower");
        std::fs::create_dir_all(&mcpower).unwrap();
        std::fs::write(mcpower.join("app_uid"), "not-a-uuid").unwrap();

        let fresh = read_app_uid(Some(dir.path())).unwrap();
        assert!(is_valid_uuid(&fresh));
        let on_disk = std::fs::read_to_string(mcpower.join("app_uid")).unwrap();
        assert_eq!(on_disk, fresh);
    }

    #[test]
    fn prompt_id_is_first_eight_chars() {
        assert_eq!(
            prompt_id_from_session("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0"),
            "0f1e2d3c"
        );
    }
}
