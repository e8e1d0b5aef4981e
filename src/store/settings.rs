// Key/value settings store (JSON values). Holds budgets, timeframes, constraints and the pause flag.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::instrument;

use super::SeedStore;
use crate::clock::unix_millis;
use crate::config::SeedConfig;
use crate::models::{SchedulerState, SeedConstraints, SeedSettings, SettingsPatch};

const KEY_TASKS_PER_RUN: &str = "tasks_per_run";
const KEY_BATCH_REQUESTS_PER_RUN: &str = "batch_requests_per_run";
const KEY_MAX_FAILED_ATTEMPTS: &str = "max_failed_attempts";
const KEY_RATE_LIMIT_MICROSECONDS: &str = "rate_limit_microseconds";
const KEY_REQUEST_LIMIT: &str = "request_limit";
const KEY_SEED_TIMEFRAMES: &str = "seed_timeframes";
const KEY_SEED_CONSTRAINTS: &str = "seed_constraints";
const KEY_SEED_PAUSED: &str = "seed_paused";

pub(super) async fn init_settings_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS seed_settings (key TEXT PRIMARY KEY, value TEXT NOT NULL, updated_at INTEGER NOT NULL)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn put_setting<'e, E, T>(executor: E, key: &str, value: &T) -> anyhow::Result<()>
where
    E: sqlx::SqliteExecutor<'e>,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    sqlx::query(
        "INSERT INTO seed_settings (key, value, updated_at) VALUES ($1, $2, $3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(raw)
    .bind(unix_millis()?)
    .execute(executor)
    .await?;
    Ok(())
}

/// State of a freshly started seed run, written in the same transaction as the task reset.
pub(super) async fn write_seed_start(
    conn: &mut SqliteConnection,
    constraints: &SeedConstraints,
    timeframes: Option<&[String]>,
) -> anyhow::Result<()> {
    put_setting(&mut *conn, KEY_SEED_CONSTRAINTS, constraints).await?;
    if let Some(timeframes) = timeframes {
        put_setting(&mut *conn, KEY_SEED_TIMEFRAMES, timeframes).await?;
    }
    put_setting(&mut *conn, KEY_SEED_PAUSED, &false).await
}

impl SeedStore {
    /// Stored value for `key`; a value that no longer decodes is treated as absent.
    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM seed_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(key, error = %e, "undecodable setting, using default");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), fields(repo = "seed", operation = "set_setting"))]
    pub async fn set_setting<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        put_setting(&self.pool, key, value).await
    }

    /// Effective settings: stored values over the configured defaults.
    pub async fn load_settings(&self, defaults: &SeedConfig) -> anyhow::Result<SeedSettings> {
        let mut settings = SeedSettings::from(defaults);
        if let Some(v) = self.get_setting::<u32>(KEY_TASKS_PER_RUN).await?
            && v > 0
        {
            settings.tasks_per_run = v;
        }
        if let Some(v) = self.get_setting::<u32>(KEY_BATCH_REQUESTS_PER_RUN).await?
            && v > 0
        {
            settings.batch_requests_per_run = v;
        }
        if let Some(v) = self.get_setting::<u32>(KEY_MAX_FAILED_ATTEMPTS).await?
            && v > 0
        {
            settings.max_failed_attempts = v;
        }
        if let Some(v) = self.get_setting::<u64>(KEY_RATE_LIMIT_MICROSECONDS).await? {
            settings.rate_limit_microseconds = v;
        }
        if let Some(v) = self.get_setting::<u32>(KEY_REQUEST_LIMIT).await?
            && v > 0
        {
            settings.request_limit = v;
        }
        if let Some(v) = self.get_setting::<Vec<String>>(KEY_SEED_TIMEFRAMES).await? {
            settings.timeframes = v;
        }
        Ok(settings)
    }

    /// Persists the fields present in `patch`.
    #[instrument(skip(self, patch), fields(repo = "seed", operation = "apply_settings_patch"))]
    pub async fn apply_settings_patch(&self, patch: &SettingsPatch) -> anyhow::Result<()> {
        if let Some(v) = patch.tasks_per_run.filter(|v| *v > 0) {
            self.set_setting(KEY_TASKS_PER_RUN, &v).await?;
        }
        if let Some(v) = patch.batch_requests_per_run.filter(|v| *v > 0) {
            self.set_setting(KEY_BATCH_REQUESTS_PER_RUN, &v).await?;
        }
        if let Some(v) = patch.max_failed_attempts.filter(|v| *v > 0) {
            self.set_setting(KEY_MAX_FAILED_ATTEMPTS, &v).await?;
        }
        if let Some(v) = patch.rate_limit_microseconds {
            self.set_setting(KEY_RATE_LIMIT_MICROSECONDS, &v).await?;
        }
        if let Some(v) = patch.request_limit.filter(|v| *v > 0) {
            self.set_setting(KEY_REQUEST_LIMIT, &v).await?;
        }
        if let Some(ref v) = patch.timeframes {
            self.set_setting(KEY_SEED_TIMEFRAMES, v).await?;
        }
        Ok(())
    }

    pub async fn load_constraints(&self) -> anyhow::Result<Option<SeedConstraints>> {
        self.get_setting(KEY_SEED_CONSTRAINTS).await
    }

    pub async fn is_paused(&self) -> anyhow::Result<bool> {
        Ok(self.get_setting(KEY_SEED_PAUSED).await?.unwrap_or(false))
    }

    pub async fn set_paused(&self, paused: bool) -> anyhow::Result<()> {
        self.set_setting(KEY_SEED_PAUSED, &paused).await
    }

    /// Snapshot of the shared state an invocation runs against.
    pub async fn load_scheduler_state(&self) -> anyhow::Result<SchedulerState> {
        Ok(SchedulerState {
            paused: self.is_paused().await?,
            constraints: self.load_constraints().await?,
        })
    }
}
