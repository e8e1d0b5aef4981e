// Per-invocation scheduler report

use serde::{Deserialize, Serialize};

/// Representative messages kept per report.
pub const MAX_REPORT_MESSAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    Completed,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    pub processed: u32,
    pub done: u32,
    pub skipped: u32,
    pub failed: u32,
    /// Tasks yielded back to the queue with an advanced cursor.
    pub running: u32,
    pub messages: Vec<String>,
}

impl BatchReport {
    pub fn completed() -> Self {
        Self {
            outcome: BatchOutcome::Completed,
            processed: 0,
            done: 0,
            skipped: 0,
            failed: 0,
            running: 0,
            messages: Vec::new(),
        }
    }

    pub fn paused() -> Self {
        Self {
            outcome: BatchOutcome::Paused,
            ..Self::completed()
        }
    }

    pub fn push_message(&mut self, message: String) {
        if self.messages.len() < MAX_REPORT_MESSAGES {
            self.messages.push(message);
        }
    }
}
