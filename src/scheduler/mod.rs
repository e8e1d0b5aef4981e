// Batch scheduler: one invocation claims up to `tasks_per_run` tasks and advances each by up to
// `batch_requests_per_run` fetch iterations, writing the cursor after every successful one.
// Per-task errors become state transitions plus an audit entry; only store failures abort a run.

pub mod trigger;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::FetchError;
use crate::fetcher::TimeWindowFetcher;
use crate::models::{
    AuditEvent, BatchReport, FULL_HISTORY_FROM, RangeMode, SchedulerState, SeedConstraints,
    SeedSettings, SeedTask,
};
use crate::source::CandleSource;
use crate::store::{AuditLog, CandleSink, RunTicket, SeedStore};

/// How one task's turn in an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Window exhausted or lower bound reached.
    Done,
    /// Ended without finishing: non-retryable error or failure budget used up.
    Skipped { message: String },
    /// Transient failure; retried by a later invocation from the same cursor.
    Failed { attempts: u32, message: String },
    /// Request budget (or deadline) used up; cursor saved, task pending again.
    Yielded { next_to: i64 },
    /// The task row disappeared mid-run (a new seed run replaced the queue).
    Removed,
}

pub struct BatchScheduler {
    store: Arc<SeedStore>,
    fetcher: TimeWindowFetcher,
    sink: Arc<dyn CandleSink>,
    audit: Arc<dyn AuditLog>,
}

impl BatchScheduler {
    pub fn new(
        store: Arc<SeedStore>,
        source: Arc<dyn CandleSource>,
        sink: Arc<dyn CandleSink>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            fetcher: TimeWindowFetcher::new(source),
            sink,
            audit,
        }
    }

    /// Runs one invocation against an explicit state snapshot and settings.
    #[instrument(skip_all, fields(tasks_per_run = settings.tasks_per_run, batch_requests_per_run = settings.batch_requests_per_run))]
    pub async fn run_batch(
        &self,
        state: &SchedulerState,
        settings: &SeedSettings,
    ) -> anyhow::Result<BatchReport> {
        if state.paused {
            debug!("seed paused; batch skipped");
            return Ok(BatchReport::paused());
        }
        let constraints = match state.constraints {
            Some(c) => c,
            None => SeedConstraints {
                mode: RangeMode::Full,
                from_time: FULL_HISTORY_FROM,
                to_time: crate::clock::unix_secs()?,
                session_count: settings.session_count,
            },
        };

        let ticket = self.store.begin_run().await?;
        let result = self.drain(&ticket, &constraints, settings).await;
        if let Err(e) = self.store.finish_run(&ticket).await {
            warn!(error = %e, run_id = ticket.run_id, "failed to close run");
        }
        result
    }

    async fn drain(
        &self,
        ticket: &RunTicket,
        constraints: &SeedConstraints,
        settings: &SeedSettings,
    ) -> anyhow::Result<BatchReport> {
        let deadline = settings
            .max_run_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let stale_after_ms = i64::try_from(settings.run_stale_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let mut report = BatchReport::completed();

        while report.processed < settings.tasks_per_run {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(run_id = ticket.run_id, "run deadline reached");
                break;
            }
            let Some(task) = self.store.claim_next(ticket, stale_after_ms).await? else {
                break;
            };
            report.processed += 1;

            match self.advance_task(&task, constraints, settings, deadline).await? {
                TaskOutcome::Done => report.done += 1,
                TaskOutcome::Skipped { message } => {
                    report.skipped += 1;
                    report.push_message(format!("{}: {}", task.label(), message));
                }
                TaskOutcome::Failed { message, .. } => {
                    report.failed += 1;
                    report.push_message(format!("{}: {}", task.label(), message));
                }
                TaskOutcome::Yielded { .. } => report.running += 1,
                TaskOutcome::Removed => {
                    warn!(task_id = task.id, task = %task.label(), "task no longer active; moving on");
                }
            }
        }

        if report.processed > 0 {
            info!(
                run_id = ticket.run_id,
                processed = report.processed,
                done = report.done,
                skipped = report.skipped,
                failed = report.failed,
                running = report.running,
                "seed batch finished"
            );
        }
        Ok(report)
    }

    /// Advances one claimed task by up to `batch_requests_per_run` iterations.
    #[instrument(skip(self, task, constraints, settings, deadline), fields(task_id = task.id, symbol = %task.symbol, timeframe = %task.timeframe))]
    pub async fn advance_task(
        &self,
        task: &SeedTask,
        constraints: &SeedConstraints,
        settings: &SeedSettings,
        deadline: Option<Instant>,
    ) -> anyhow::Result<TaskOutcome> {
        let min_from = constraints.min_from_for(&task.timeframe);
        let mut to = if task.progressed {
            task.last_to_time
        } else {
            constraints.to_time
        };
        let rate_limit = Duration::from_micros(settings.rate_limit_microseconds);

        for iteration in 0..settings.batch_requests_per_run {
            if to <= min_from {
                return self
                    .finish_task(task, format!("lower bound {} reached at to={}", min_from, to))
                    .await;
            }

            let outcome = match self
                .fetcher
                .fetch(&task.symbol, &task.timeframe, to, settings.request_limit, min_from)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => return self.handle_fetch_error(task, to, e, settings).await,
            };

            let oldest = outcome.oldest_event_time;
            if outcome.rows.is_empty() || oldest <= 0 || oldest >= to {
                return self
                    .finish_task(task, format!("history exhausted at to={}", to))
                    .await;
            }

            let rows: Vec<_> = outcome
                .rows
                .into_iter()
                .filter(|r| r.event_time >= min_from)
                .collect();
            if let Err(e) = self.sink.upsert_rows(&rows).await {
                let error = FetchError::transient(format!("upsert failed: {}", e));
                return self.handle_fetch_error(task, to, error, settings).await;
            }
            debug!(
                from = outcome.from,
                to,
                oldest,
                rows = rows.len(),
                "window stored"
            );

            let next_to = oldest - 1;
            if next_to <= min_from {
                return self
                    .finish_task(task, format!("lower bound {} reached at to={}", min_from, next_to))
                    .await;
            }
            if !self.store.update_progress(task.id, next_to).await? {
                return Ok(TaskOutcome::Removed);
            }
            to = next_to;

            let last_iteration = iteration + 1 >= settings.batch_requests_per_run;
            if last_iteration || deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            if !rate_limit.is_zero() {
                tokio::time::sleep(rate_limit).await;
            }
        }

        Ok(TaskOutcome::Yielded { next_to: to })
    }

    async fn finish_task(&self, task: &SeedTask, reason: String) -> anyhow::Result<TaskOutcome> {
        self.store.mark_done(task.id).await?;
        self.audit
            .log(
                AuditEvent::TaskDone.as_str(),
                &format!("{}: done, {}", task.label(), reason),
            )
            .await;
        Ok(TaskOutcome::Done)
    }

    /// Non-retryable errors end the task without touching the failure counter; transient ones
    /// count against `max_failed_attempts` and end the task once the budget is used up.
    async fn handle_fetch_error(
        &self,
        task: &SeedTask,
        to: i64,
        error: FetchError,
        settings: &SeedSettings,
    ) -> anyhow::Result<TaskOutcome> {
        if !error.retryable {
            self.store.mark_done(task.id).await?;
            let message = format!("skipped, non-retryable: {}", error.message);
            self.audit
                .log(
                    AuditEvent::TaskSkipped.as_str(),
                    &format!("{}: {}", task.label(), message),
                )
                .await;
            return Ok(TaskOutcome::Skipped { message });
        }

        let Some(attempts) = self
            .store
            .mark_failed(task.id, to, &error.message)
            .await?
        else {
            return Ok(TaskOutcome::Removed);
        };
        if attempts >= settings.max_failed_attempts {
            self.store.mark_done(task.id).await?;
            let message = format!("skipped after {} failures: {}", attempts, error.message);
            self.audit
                .log(
                    AuditEvent::TaskSkipped.as_str(),
                    &format!("{}: {}", task.label(), message),
                )
                .await;
            return Ok(TaskOutcome::Skipped { message });
        }

        let message = format!(
            "attempt {}/{} failed: {}",
            attempts, settings.max_failed_attempts, error.message
        );
        warn!(task_id = task.id, attempts, error = %error, "seed fetch failed");
        self.audit
            .log(
                AuditEvent::TaskFailed.as_str(),
                &format!("{}: {}", task.label(), message),
            )
            .await;
        Ok(TaskOutcome::Failed { attempts, message })
    }
}
