//! Append-only, in-memory audit trail for guarded gateway actions.
//! Entries are kept newest-first for the lifetime of the process. Nothing is
//! persisted across restarts and an appended entry is never retracted, even
//! when a later step of the same request fails.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Convert,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Failed,
}

/// One recorded action attempt. `id` and `timestamp` are assigned by the
/// store; everything else comes from the caller via [`AuditEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: AuditAction,
    pub file: String,
    #[serde(rename = "fromTo", default, skip_serializing_if = "Option::is_none")]
    pub from_to: Option<String>,
    pub status: AuditStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Caller-supplied portion of an audit entry.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub user: String,
    pub action: AuditAction,
    pub file: String,
    pub from_to: Option<String>,
    pub status: AuditStatus,
    pub message: Option<String>,
}

/// Process-lifetime audit store. Owned by the server state and injected into
/// handlers; the lock keeps appends atomic on the multi-threaded runtime.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self { Self::default() }

    /// Stamp the event with a unique id and the current time, then insert it
    /// at the head of the trail.
    pub fn record(&self, event: AuditEvent) {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user: event.user,
            action: event.action,
            file: event.file,
            from_to: event.from_to,
            status: event.status,
            message: event.message,
        };
        self.entries.write().push_front(entry);
    }

    /// Full snapshot, newest first. No pagination, filtering or size cap.
    pub fn list(&self) -> Vec<AuditEntry> {
        self.entries.read().iter().cloned().collect()
    }
}
