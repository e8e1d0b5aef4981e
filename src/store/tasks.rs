// Durable task queue: bulk creation, atomic claim, progress and terminal marking.
// Each scheduler invocation opens a run ticket; claims are scoped by it (see claim_next).

use std::collections::BTreeSet;

use sqlx::Row;
use sqlx::SqlitePool;
use tracing::{instrument, warn};

use super::SeedStore;
use super::settings::write_seed_start;
use crate::clock::{unix_millis, unix_secs};
use crate::error::SeedError;
use crate::models::{SeedConstraints, SeedTask, TaskStatus, TaskStatusCounts};

/// Finished runs older than this are deleted when a run closes.
const FINISHED_RUN_RETENTION_MS: i64 = 24 * 60 * 60 * 1000;

const TASK_COLUMNS: &str = "id, symbol, timeframe, status, last_to_time, failed_attempts, progressed, last_error, created_at, updated_at";

/// Handle for one scheduler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    pub run_id: i64,
    /// Highest task id that existed when the run started; newer tasks are left alone.
    pub max_task_id: i64,
    pub started_at: i64,
}

pub(super) async fn init_task_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS seed_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL,
            timeframe TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            last_to_time INTEGER NOT NULL,
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            progressed INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            claimed_run INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (symbol, timeframe)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_seed_tasks_status_updated ON seed_tasks(status, updated_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS seed_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at INTEGER NOT NULL,
            finished_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

impl SeedStore {
    /// Discards every task and creates one pending task per (symbol, timeframe) with the cursor at now.
    /// Empty `symbols` is a configuration error; empty `timeframes` creates nothing and keeps existing tasks.
    #[instrument(skip(self, symbols, timeframes), fields(repo = "seed", operation = "reset_and_create", symbols_count = symbols.len(), timeframes_count = timeframes.len()))]
    pub async fn reset_and_create(
        &self,
        symbols: &[String],
        timeframes: &[String],
    ) -> Result<u64, SeedError> {
        self.replace_tasks(symbols, timeframes, None).await
    }

    /// Starts a seed run in one transaction: replaces every task, stores `constraints`, stores the
    /// timeframe list when `store_timeframes` is set and clears the pause flag.
    /// Nothing is written when no task would be created.
    #[instrument(skip(self, symbols, timeframes, constraints), fields(repo = "seed", operation = "start_seed_run", symbols_count = symbols.len(), timeframes_count = timeframes.len()))]
    pub async fn start_seed_run(
        &self,
        symbols: &[String],
        timeframes: &[String],
        constraints: &SeedConstraints,
        store_timeframes: bool,
    ) -> Result<u64, SeedError> {
        self.replace_tasks(symbols, timeframes, Some((constraints, store_timeframes)))
            .await
    }

    async fn replace_tasks(
        &self,
        symbols: &[String],
        timeframes: &[String],
        start: Option<(&SeedConstraints, bool)>,
    ) -> Result<u64, SeedError> {
        let symbols = normalized(symbols);
        if symbols.is_empty() {
            return Err(SeedError::Configuration("no symbols to seed".into()));
        }
        let timeframes = normalized(timeframes);
        if timeframes.is_empty() {
            warn!("no timeframes configured; skipping task creation");
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM seed_tasks")
            .execute(&mut *tx)
            .await?;
        let created = insert_tasks(&mut tx, &symbols, &timeframes).await?;
        if let Some((constraints, store_timeframes)) = start {
            let stored = store_timeframes.then_some(timeframes.as_slice());
            write_seed_start(&mut *tx, constraints, stored).await?;
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Adds pending tasks for pairs that have no task yet, leaving existing tasks untouched.
    #[instrument(skip(self, symbols, timeframes), fields(repo = "seed", operation = "add_tasks"))]
    pub async fn add_tasks(&self, symbols: &[String], timeframes: &[String]) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let created = insert_tasks(&mut tx, &normalized(symbols), &normalized(timeframes)).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Registers a new scheduler invocation.
    #[instrument(skip(self), fields(repo = "seed", operation = "begin_run"))]
    pub async fn begin_run(&self) -> anyhow::Result<RunTicket> {
        let now_ms = unix_millis()?;
        let mut tx = self.pool.begin().await?;
        let run_id: i64 = sqlx::query_scalar("INSERT INTO seed_runs (started_at) VALUES ($1) RETURNING id")
            .bind(now_ms)
            .fetch_one(&mut *tx)
            .await?;
        let max_task_id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM seed_tasks")
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(RunTicket {
            run_id,
            max_task_id,
            started_at: now_ms,
        })
    }

    /// Closes a run so its running tasks become claimable by later runs.
    #[instrument(skip(self), fields(repo = "seed", operation = "finish_run", run_id = ticket.run_id))]
    pub async fn finish_run(&self, ticket: &RunTicket) -> anyhow::Result<()> {
        let now_ms = unix_millis()?;
        sqlx::query("UPDATE seed_runs SET finished_at = $1 WHERE id = $2")
            .bind(now_ms)
            .bind(ticket.run_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM seed_runs WHERE finished_at IS NOT NULL AND finished_at < $1")
            .bind(now_ms - FINISHED_RUN_RETENTION_MS)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Atomically claims the next task for `ticket` and marks it running.
    ///
    /// Candidates are pending tasks, or running tasks not held by another live run
    /// (unfinished and started within `stale_after_ms`). Tasks already claimed by this run
    /// and tasks created after it started are skipped. Running tasks come first, then the
    /// least recently updated. The select and the update are one statement, so two
    /// overlapping runs can never claim the same row.
    #[instrument(skip(self), fields(repo = "seed", operation = "claim_next", run_id = ticket.run_id))]
    pub async fn claim_next(
        &self,
        ticket: &RunTicket,
        stale_after_ms: i64,
    ) -> anyhow::Result<Option<SeedTask>> {
        let now_ms = unix_millis()?;
        let live_since = now_ms.saturating_sub(stale_after_ms);
        let sql = format!(
            r#"
            UPDATE seed_tasks
            SET status = 'running', claimed_run = $1, updated_at = $2
            WHERE id = (
                SELECT t.id FROM seed_tasks t
                WHERE t.id <= $3
                  AND (t.claimed_run IS NULL OR t.claimed_run <> $1)
                  AND (
                      t.status = 'pending'
                      OR (t.status = 'running' AND NOT EXISTS (
                          SELECT 1 FROM seed_runs r
                          WHERE r.id = t.claimed_run
                            AND r.finished_at IS NULL
                            AND r.started_at > $4
                      ))
                  )
                ORDER BY CASE t.status WHEN 'running' THEN 0 ELSE 1 END, t.updated_at ASC, t.id ASC
                LIMIT 1
            )
            AND status IN ('pending', 'running')
            RETURNING {TASK_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(ticket.run_id)
            .bind(now_ms)
            .bind(ticket.max_task_id)
            .bind(live_since)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_task_row).transpose()
    }

    /// Records a new cursor and hands the task back to the queue as pending.
    /// Returns false when the task is gone or already done.
    #[instrument(skip(self), fields(repo = "seed", operation = "update_progress"))]
    pub async fn update_progress(&self, task_id: i64, new_to_time: i64) -> anyhow::Result<bool> {
        let now_ms = unix_millis()?;
        let r = sqlx::query(
            "UPDATE seed_tasks SET status = 'pending', last_to_time = $1, progressed = 1, updated_at = $2 WHERE id = $3 AND status <> 'done'",
        )
        .bind(new_to_time)
        .bind(now_ms)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    /// Terminal. Marking an already-done task is a no-op.
    #[instrument(skip(self), fields(repo = "seed", operation = "mark_done"))]
    pub async fn mark_done(&self, task_id: i64) -> anyhow::Result<()> {
        let now_ms = unix_millis()?;
        sqlx::query(
            "UPDATE seed_tasks SET status = 'done', updated_at = $1 WHERE id = $2 AND status <> 'done'",
        )
        .bind(now_ms)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Increments and returns the failure counter, or `None` when the task no longer exists.
    /// Status is left as is so the task stays claimable.
    #[instrument(skip(self, error), fields(repo = "seed", operation = "mark_failed"))]
    pub async fn mark_failed(
        &self,
        task_id: i64,
        attempted_to_time: i64,
        error: &str,
    ) -> anyhow::Result<Option<u32>> {
        let now_ms = unix_millis()?;
        let attempts: Option<i64> = sqlx::query_scalar(
            "UPDATE seed_tasks SET failed_attempts = failed_attempts + 1, last_error = $1, updated_at = $2 WHERE id = $3 RETURNING failed_attempts",
        )
        .bind(format!("{} (to={})", error, attempted_to_time))
        .bind(now_ms)
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempts.map(|n| n.max(0) as u32))
    }

    pub async fn get_task(&self, task_id: i64) -> anyhow::Result<Option<SeedTask>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM seed_tasks WHERE id = $1"))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_task_row).transpose()
    }

    pub async fn find_task(&self, symbol: &str, timeframe: &str) -> anyhow::Result<Option<SeedTask>> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM seed_tasks WHERE symbol = $1 AND timeframe = $2"
        ))
        .bind(symbol)
        .bind(timeframe)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_task_row).transpose()
    }

    /// All tasks in creation order.
    pub async fn list_tasks(&self) -> anyhow::Result<Vec<SeedTask>> {
        let rows = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM seed_tasks ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_task_row).collect()
    }

    pub async fn task_status_counts(&self) -> anyhow::Result<TaskStatusCounts> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM seed_tasks GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        let mut counts = TaskStatusCounts::default();
        for row in rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            match TaskStatus::from_db(&status) {
                TaskStatus::Pending => counts.pending += n as u64,
                TaskStatus::Running => counts.running += n as u64,
                TaskStatus::Done => counts.done += n as u64,
            }
        }
        Ok(counts)
    }
}

async fn insert_tasks(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    symbols: &[String],
    timeframes: &[String],
) -> anyhow::Result<u64> {
    let now_secs = unix_secs()?;
    let now_ms = unix_millis()?;
    let mut created = 0u64;
    for symbol in symbols {
        for timeframe in timeframes {
            let r = sqlx::query(
                "INSERT OR IGNORE INTO seed_tasks (symbol, timeframe, status, last_to_time, created_at, updated_at) VALUES ($1, $2, 'pending', $3, $4, $4)",
            )
            .bind(symbol)
            .bind(timeframe)
            .bind(now_secs)
            .bind(now_ms)
            .execute(&mut **tx)
            .await?;
            created += r.rows_affected();
        }
    }
    Ok(created)
}

/// Trimmed, non-empty, de-duplicated (order preserved).
fn normalized(values: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}

fn parse_task_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<SeedTask> {
    let status: String = row.try_get("status")?;
    let failed_attempts: i64 = row.try_get("failed_attempts")?;
    let progressed: i64 = row.try_get("progressed")?;
    Ok(SeedTask {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        timeframe: row.try_get("timeframe")?,
        status: TaskStatus::from_db(&status),
        last_to_time: row.try_get("last_to_time")?,
        failed_attempts: failed_attempts.max(0) as u32,
        progressed: progressed != 0,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
