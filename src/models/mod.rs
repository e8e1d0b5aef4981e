// Domain models: seed tasks, constraints, candles, settings, reports

mod audit;
mod candle;
mod constraints;
mod report;
mod settings;
mod task;

pub use audit::{AuditEntry, AuditEvent};
pub use candle::{CandleRow, RawCandle};
pub use constraints::{FULL_HISTORY_FROM, RangeMode, RequestedConstraints, SeedConstraints};
pub use report::{BatchOutcome, BatchReport, MAX_REPORT_MESSAGES};
pub use settings::{SchedulerState, SeedSettings, SettingsPatch};
pub use task::{SeedTask, TaskStatus, TaskStatusCounts};
