// Audit log entries and the state transitions that produce them

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    SeedStarted,
    SeedFailed,
    SeedSkipped,
    SeedExtended,
    SeedPaused,
    SeedResumed,
    TaskDone,
    TaskSkipped,
    TaskFailed,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::SeedStarted => "seed_started",
            AuditEvent::SeedFailed => "seed_failed",
            AuditEvent::SeedSkipped => "seed_skipped",
            AuditEvent::SeedExtended => "seed_extended",
            AuditEvent::SeedPaused => "seed_paused",
            AuditEvent::SeedResumed => "seed_resumed",
            AuditEvent::TaskDone => "seed_task_done",
            AuditEvent::TaskSkipped => "seed_task_skipped",
            AuditEvent::TaskFailed => "seed_task_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub created_at: i64,
    pub kind: String,
    pub message: String,
}
