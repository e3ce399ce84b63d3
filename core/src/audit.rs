//! Append-only audit trail.
//!
//! Every inspected operation emits a small, fixed vocabulary of events
//! (`agent_request`, `agent_request_forwarded`, `mcp_response`,
//! `mcp_response_forwarded`, plus the dialog pair). The sink is a trait so
//! tests capture events in memory; the default sink appends JSONL to the
//! per-project `.mcpower` directory. Audit failures never propagate to the
//! operation being audited.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_uid: Option<String>,
    pub data: serde_json::Value,
    /// Only present on the first request of a prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}

pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord);
}

/// One JSON object per line, appended to `<dir>/audit.log`.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(mcpower_dir: PathBuf) -> Self {
        Self {
            path: mcpower_dir.join("audit.log"),
        }
    }
}

impl AuditSink for JsonlSink {
    fn append(&self, record: &AuditRecord) {
        let Ok(line) = serde_json::to_string(record) else {
            warn!("audit record failed to serialize");
            return;
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| {
                use std::io::Write;
                writeln!(file, "{line}")
            });
        if let Err(e) = result {
            warn!("audit append failed: {e}");
        }
    }
}

/// In-memory sink for tests and for hook processes that only need the
/// ordering guarantees.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|r| r.event_type)
            .collect()
    }
}

impl AuditSink for MemorySink {
    fn append(&self, record: &AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

#[derive(Clone)]
pub struct AuditTrailLogger {
    sink: Arc<dyn AuditSink>,
    app_uid: Arc<Mutex<Option<String>>>,
}

impl AuditTrailLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            app_uid: Arc::new(Mutex::new(None)),
        }
    }

    /// App uid becomes known only after workspace-root discovery; events
    /// logged before that simply omit it.
    pub fn set_app_uid(&self, app_uid: &str) {
        if let Ok(mut slot) = self.app_uid.lock() {
            *slot = Some(app_uid.to_string());
        }
    }

    pub fn log_event(
        &self,
        event_type: &str,
        data: serde_json::Value,
        event_id: &str,
        prompt_id: Option<&str>,
        user_prompt: Option<&str>,
    ) {
        let record = AuditRecord {
            ts: Utc::now(),
            event_type: event_type.to_string(),
            event_id: event_id.to_string(),
            prompt_id: prompt_id.map(str::to_string),
            app_uid: self.app_uid.lock().ok().and_then(|g| g.clone()),
            data,
            user_prompt: user_prompt.map(str::to_string),
        };
        self.sink.append(&record);
    }
}
