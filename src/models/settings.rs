// Runtime seed settings and the explicit scheduler state passed to each invocation

use serde::{Deserialize, Serialize};

use super::SeedConstraints;
use crate::config::SeedConfig;

/// Budgets and limits read on every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSettings {
    pub tasks_per_run: u32,
    pub batch_requests_per_run: u32,
    pub max_failed_attempts: u32,
    pub rate_limit_microseconds: u64,
    pub request_limit: u32,
    pub timeframes: Vec<String>,
    pub session_count: u32,
    pub run_stale_secs: u64,
    pub max_run_secs: Option<u64>,
}

impl From<&SeedConfig> for SeedSettings {
    fn from(c: &SeedConfig) -> Self {
        Self {
            tasks_per_run: c.tasks_per_run,
            batch_requests_per_run: c.batch_requests_per_run,
            max_failed_attempts: c.max_failed_attempts,
            rate_limit_microseconds: c.rate_limit_microseconds,
            request_limit: c.request_limit,
            timeframes: c.timeframes.clone(),
            session_count: c.session_count,
            run_stale_secs: c.run_stale_secs,
            max_run_secs: c.max_run_secs,
        }
    }
}

/// Partial update of the persisted settings; `None` leaves a value unchanged.
/// Zero budgets are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub tasks_per_run: Option<u32>,
    #[serde(default)]
    pub batch_requests_per_run: Option<u32>,
    #[serde(default)]
    pub max_failed_attempts: Option<u32>,
    #[serde(default)]
    pub rate_limit_microseconds: Option<u64>,
    #[serde(default)]
    pub request_limit: Option<u32>,
    #[serde(default)]
    pub timeframes: Option<Vec<String>>,
}

/// Pause flag plus the constraints resolved at seed start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    pub paused: bool,
    pub constraints: Option<SeedConstraints>,
}
