// Seed task: one (symbol, timeframe) backfill unit with its resumption cursor

use serde::{Deserialize, Serialize};

/// Task lifecycle; stored as lowercase text in `seed_tasks.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
        }
    }

    /// Parse from the stored column value; unknown values are treated as done so they are never claimed.
    pub fn from_db(s: &str) -> Self {
        match s {
            "pending" => TaskStatus::Pending,
            "running" => TaskStatus::Running,
            _ => TaskStatus::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedTask {
    pub id: i64,
    pub symbol: String,
    pub timeframe: String,
    pub status: TaskStatus,
    /// Backfill cursor (epoch seconds): candles newer than this are already stored and the next
    /// window ends here. Each stored window moves it below its oldest candle. Ignored until
    /// `progressed` is set; the first window ends at the run's `to_time`.
    pub last_to_time: i64,
    pub failed_attempts: u32,
    /// True once the cursor has been advanced by at least one successful iteration.
    pub progressed: bool,
    pub last_error: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds; claim ordering only, not a lock.
    pub updated_at: i64,
}

impl SeedTask {
    pub fn label(&self) -> String {
        format!("{} {}", self.symbol, self.timeframe)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusCounts {
    pub pending: u64,
    pub running: u64,
    pub done: u64,
}

impl TaskStatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.running + self.done
    }
}
