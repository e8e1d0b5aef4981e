// Shared test helpers: temp store, scripted candle source, failing sink
#![allow(dead_code)]

use async_trait::async_trait;
use candle_seeder::error::FetchError;
use candle_seeder::models::{CandleRow, RangeMode, RawCandle, SchedulerState, SeedConstraints, SeedSettings};
use candle_seeder::scheduler::BatchScheduler;
use candle_seeder::source::CandleSource;
use candle_seeder::store::{CandleSink, SeedStore};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const DAY: i64 = 86_400;
pub const HOUR: i64 = 3_600;

/// Fresh, initialized store in a temp dir. Keep the `TempDir` alive for the test's duration.
pub async fn temp_store() -> (TempDir, Arc<SeedStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("seed.db");
    let store = SeedStore::connect(path.to_str().expect("utf-8 path"), 2)
        .await
        .expect("connect");
    store.init().await.expect("init");
    (dir, Arc::new(store))
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn candle(time: i64) -> RawCandle {
    candle_with_close(time, 100.0)
}

pub fn candle_with_close(time: i64, close: f64) -> RawCandle {
    RawCandle {
        time,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10.0,
    }
}

/// Settings with no rate-limit delay so tests run quickly.
pub fn test_settings() -> SeedSettings {
    SeedSettings {
        tasks_per_run: 10,
        batch_requests_per_run: 1,
        max_failed_attempts: 3,
        rate_limit_microseconds: 0,
        request_limit: 5000,
        timeframes: strings(&["1D"]),
        session_count: 300,
        run_stale_secs: 3600,
        max_run_secs: None,
    }
}

pub fn active_state(constraints: SeedConstraints) -> SchedulerState {
    SchedulerState {
        paused: false,
        constraints: Some(constraints),
    }
}

pub fn full_to(to_time: i64) -> SeedConstraints {
    SeedConstraints {
        mode: RangeMode::Full,
        from_time: 1,
        to_time,
        session_count: 300,
    }
}

pub fn date_range(from_time: i64, to_time: i64) -> SeedConstraints {
    SeedConstraints {
        mode: RangeMode::DateRange,
        from_time,
        to_time,
        session_count: 300,
    }
}

pub fn scheduler_for(store: &Arc<SeedStore>, source: Arc<dyn CandleSource>) -> BatchScheduler {
    BatchScheduler::new(store.clone(), source, store.clone(), store.clone())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCall {
    pub symbol: String,
    pub timeframe: String,
    pub from: i64,
    pub to: i64,
}

/// What a [`ScriptedSource`] returns once its queue is drained.
#[derive(Debug, Clone)]
pub enum Fallback {
    /// No rows: the task's history is exhausted.
    Empty,
    /// One bar every `step` seconds inside the requested window.
    Grid { step: i64 },
    Error(FetchError),
}

/// Candle source that replays queued responses, then answers with its fallback. Records every call.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<RawCandle>, FetchError>>>,
    fallback: Fallback,
    calls: Mutex<Vec<SourceCall>>,
}

impl ScriptedSource {
    pub fn new(fallback: Fallback) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Fallback::Empty)
    }

    pub fn grid(step: i64) -> Self {
        Self::new(Fallback::Grid { step })
    }

    pub fn failing(error: FetchError) -> Self {
        Self::new(Fallback::Error(error))
    }

    pub fn push_ok(&self, candles: Vec<RawCandle>) {
        self.responses.lock().unwrap().push_back(Ok(candles));
    }

    pub fn push_err(&self, error: FetchError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<SourceCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.symbol == symbol)
            .collect()
    }
}

/// Bars on multiples of `step` within `[from, to]`.
pub fn grid_candles(step: i64, from: i64, to: i64) -> Vec<RawCandle> {
    let first = (from + step - 1).div_euclid(step) * step;
    (0..)
        .map(|k| first + k * step)
        .take_while(|t| *t <= to)
        .map(candle)
        .collect()
}

#[async_trait]
impl CandleSource for ScriptedSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<RawCandle>, FetchError> {
        self.calls.lock().unwrap().push(SourceCall {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            from,
            to,
        });
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Fallback::Empty => Ok(Vec::new()),
            Fallback::Grid { step } => Ok(grid_candles(*step, from, to)),
            Fallback::Error(e) => Err(e.clone()),
        }
    }
}

/// Sink whose writes always fail.
pub struct FailingSink;

#[async_trait]
impl CandleSink for FailingSink {
    async fn upsert_rows(&self, _rows: &[CandleRow]) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}
