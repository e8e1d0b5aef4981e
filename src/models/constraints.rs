// Seed constraints: the global backfill window for the current seed run

use serde::{Deserialize, Serialize};

use crate::timeframe::interval_seconds;

/// Lower bound used by `full` mode (effectively unbounded history).
pub const FULL_HISTORY_FROM: i64 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMode {
    #[default]
    Full,
    DateRange,
    Sessions,
}

/// Resolved window, persisted once per seed start and read by every task iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedConstraints {
    pub mode: RangeMode,
    pub from_time: i64,
    pub to_time: i64,
    /// Trailing session count; only meaningful in `sessions` mode.
    pub session_count: u32,
}

impl SeedConstraints {
    /// Effective lower bound for a task on `timeframe`.
    /// In `sessions` mode the bound depends on the timeframe, so it is derived per task from `to_time`.
    pub fn min_from_for(&self, timeframe: &str) -> i64 {
        match self.mode {
            RangeMode::Full | RangeMode::DateRange => self.from_time,
            RangeMode::Sessions => {
                let span = interval_seconds(timeframe).saturating_mul(self.session_count as i64);
                self.to_time.saturating_sub(span).max(FULL_HISTORY_FROM)
            }
        }
    }
}

/// Optional overrides supplied when a seed run is started; missing fields fall back to
/// previously persisted values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedConstraints {
    #[serde(default)]
    pub mode: Option<RangeMode>,
    #[serde(default)]
    pub from_time: Option<i64>,
    #[serde(default)]
    pub to_time: Option<i64>,
    #[serde(default)]
    pub session_count: Option<u32>,
}
