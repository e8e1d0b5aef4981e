// Seed control: start / pause / resume / status, and the "run one batch" entry point shared by
// the periodic trigger and the admin API.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::config::SeedConfig;
use crate::error::SeedError;
use crate::models::{
    AuditEvent, BatchReport, RequestedConstraints, SeedConstraints, SeedSettings, SettingsPatch,
    TaskStatusCounts,
};
use crate::clock::unix_secs;
use crate::resolver;
use crate::scheduler::BatchScheduler;
use crate::store::{AuditLog, SeedStore, SymbolRegistry};

/// Body of a seed start request: constraint overrides plus an optional timeframe list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRequest {
    #[serde(flatten)]
    pub constraints: RequestedConstraints,
    #[serde(default)]
    pub timeframes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStarted {
    pub tasks_created: u64,
    pub constraints: SeedConstraints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolsAdded {
    pub symbols_registered: u64,
    pub tasks_created: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatus {
    pub paused: bool,
    pub constraints: Option<SeedConstraints>,
    pub tasks: TaskStatusCounts,
    pub settings: SeedSettings,
}

pub struct SeedService {
    store: Arc<SeedStore>,
    scheduler: BatchScheduler,
    registry: Arc<dyn SymbolRegistry>,
    audit: Arc<dyn AuditLog>,
    defaults: SeedConfig,
}

impl SeedService {
    pub fn new(
        store: Arc<SeedStore>,
        scheduler: BatchScheduler,
        registry: Arc<dyn SymbolRegistry>,
        audit: Arc<dyn AuditLog>,
        defaults: SeedConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            registry,
            audit,
            defaults,
        }
    }

    /// Starts a new seed run: resolves the window, recreates every task and clears the pause flag.
    /// Constraints and the requested timeframes are stored together with the new tasks, so a start
    /// that fails or creates nothing leaves the previous run untouched.
    /// Fails with a configuration error when no symbols are registered.
    #[instrument(skip(self, request), fields(operation = "start_seed"))]
    pub async fn start_seed(&self, request: &SeedRequest) -> Result<SeedStarted, SeedError> {
        let symbols = self.registry.get_all_symbols().await?;
        if symbols.is_empty() {
            self.audit
                .log(AuditEvent::SeedFailed.as_str(), "no symbols registered")
                .await;
            return Err(SeedError::Configuration("no symbols registered".into()));
        }

        let settings = self.store.load_settings(&self.defaults).await?;
        let timeframes = request.timeframes.as_ref().unwrap_or(&settings.timeframes);
        let previous = self.store.load_constraints().await?;
        let constraints = resolver::resolve(
            &request.constraints,
            previous.as_ref(),
            settings.session_count,
            unix_secs()?,
        );

        let created = match self
            .store
            .start_seed_run(&symbols, timeframes, &constraints, request.timeframes.is_some())
            .await
        {
            Ok(n) => n,
            Err(e) => {
                if let SeedError::Configuration(ref msg) = e {
                    self.audit.log(AuditEvent::SeedFailed.as_str(), msg).await;
                }
                return Err(e);
            }
        };
        if created == 0 {
            self.audit
                .log(
                    AuditEvent::SeedSkipped.as_str(),
                    "no timeframes configured; nothing to seed",
                )
                .await;
            return Ok(SeedStarted {
                tasks_created: 0,
                constraints: previous.unwrap_or(constraints),
            });
        }

        self.audit
            .log(
                AuditEvent::SeedStarted.as_str(),
                &format!(
                    "{} tasks ({} symbols x [{}]), mode={:?}, from={}, to={}",
                    created,
                    symbols.len(),
                    timeframes.join(", "),
                    constraints.mode,
                    constraints.from_time,
                    constraints.to_time
                ),
            )
            .await;
        Ok(SeedStarted {
            tasks_created: created,
            constraints,
        })
    }

    /// Registers `symbols` and queues a pending task for each of them per configured timeframe.
    /// Tasks that already exist keep their progress; nothing else in the current run changes.
    #[instrument(skip(self, symbols), fields(operation = "add_symbols", symbols_count = symbols.len()))]
    pub async fn add_symbols(&self, symbols: &[String]) -> Result<SymbolsAdded, SeedError> {
        if symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(SeedError::Configuration("no symbols given".into()));
        }
        let registered = self.store.register_symbols(symbols).await?;
        let settings = self.store.load_settings(&self.defaults).await?;
        let tasks_created = self.store.add_tasks(symbols, &settings.timeframes).await?;
        if tasks_created > 0 {
            self.audit
                .log(
                    AuditEvent::SeedExtended.as_str(),
                    &format!(
                        "{} tasks added for {} new symbols",
                        tasks_created, registered
                    ),
                )
                .await;
        }
        Ok(SymbolsAdded {
            symbols_registered: registered,
            tasks_created,
        })
    }

    pub async fn pause(&self) -> anyhow::Result<()> {
        self.store.set_paused(true).await?;
        self.audit
            .log(AuditEvent::SeedPaused.as_str(), "seed paused")
            .await;
        Ok(())
    }

    pub async fn resume(&self) -> anyhow::Result<()> {
        self.store.set_paused(false).await?;
        self.audit
            .log(AuditEvent::SeedResumed.as_str(), "seed resumed")
            .await;
        Ok(())
    }

    pub async fn update_settings(&self, patch: &SettingsPatch) -> anyhow::Result<SeedSettings> {
        self.store.apply_settings_patch(patch).await?;
        self.store.load_settings(&self.defaults).await
    }

    pub async fn status(&self) -> anyhow::Result<SeedStatus> {
        let state = self.store.load_scheduler_state().await?;
        Ok(SeedStatus {
            paused: state.paused,
            constraints: state.constraints,
            tasks: self.store.task_status_counts().await?,
            settings: self.store.load_settings(&self.defaults).await?,
        })
    }

    /// Loads the current state and settings and runs one scheduler invocation.
    pub async fn run_once(&self) -> anyhow::Result<BatchReport> {
        let state = self.store.load_scheduler_state().await?;
        let settings = self.store.load_settings(&self.defaults).await?;
        self.scheduler.run_batch(&state, &settings).await
    }
}
