use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the market-data API; candles are fetched from `{base_url}/candles`.
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Periodic batch trigger. `schedule` (cron, local time) wins over `interval_secs` when set.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_trigger_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub run_on_startup: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_trigger_interval_secs(),
            schedule: None,
            run_on_startup: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_trigger_interval_secs() -> u64 {
    60
}

/// Defaults for the seed settings. Values stored in the settings table take precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_tasks_per_run")]
    pub tasks_per_run: u32,
    #[serde(default = "default_batch_requests_per_run")]
    pub batch_requests_per_run: u32,
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    #[serde(default = "default_rate_limit_microseconds")]
    pub rate_limit_microseconds: u64,
    /// Rows requested per fetch.
    #[serde(default = "default_request_limit")]
    pub request_limit: u32,
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<String>,
    #[serde(default = "default_session_count")]
    pub session_count: u32,
    /// A run that has not finished after this long no longer holds its running tasks.
    #[serde(default = "default_run_stale_secs")]
    pub run_stale_secs: u64,
    /// Optional wall-clock budget per invocation, checked between iterations.
    #[serde(default)]
    pub max_run_secs: Option<u64>,
    /// Symbols registered at startup (merged into the symbol registry).
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            tasks_per_run: default_tasks_per_run(),
            batch_requests_per_run: default_batch_requests_per_run(),
            max_failed_attempts: default_max_failed_attempts(),
            rate_limit_microseconds: default_rate_limit_microseconds(),
            request_limit: default_request_limit(),
            timeframes: default_timeframes(),
            session_count: default_session_count(),
            run_stale_secs: default_run_stale_secs(),
            max_run_secs: None,
            symbols: Vec::new(),
        }
    }
}

fn default_tasks_per_run() -> u32 {
    10
}

fn default_batch_requests_per_run() -> u32 {
    5
}

fn default_max_failed_attempts() -> u32 {
    3
}

fn default_rate_limit_microseconds() -> u64 {
    300_000
}

fn default_request_limit() -> u32 {
    5000
}

fn default_timeframes() -> Vec<String> {
    vec!["1D".to_string()]
}

fn default_session_count() -> u32 {
    300
}

fn default_run_stale_secs() -> u64 {
    3600
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            !self.api.base_url.trim().is_empty(),
            "api.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.api.request_timeout_secs > 0,
            "api.request_timeout_secs must be > 0, got {}",
            self.api.request_timeout_secs
        );
        anyhow::ensure!(
            self.trigger.interval_secs > 0,
            "trigger.interval_secs must be > 0, got {}",
            self.trigger.interval_secs
        );
        if let Some(ref schedule) = self.trigger.schedule {
            anyhow::ensure!(
                <cron::Schedule as std::str::FromStr>::from_str(schedule).is_ok(),
                "trigger.schedule is not a valid cron expression: {}",
                schedule
            );
        }
        anyhow::ensure!(
            self.seed.tasks_per_run > 0,
            "seed.tasks_per_run must be > 0, got {}",
            self.seed.tasks_per_run
        );
        anyhow::ensure!(
            self.seed.batch_requests_per_run > 0,
            "seed.batch_requests_per_run must be > 0, got {}",
            self.seed.batch_requests_per_run
        );
        anyhow::ensure!(
            self.seed.max_failed_attempts > 0,
            "seed.max_failed_attempts must be > 0, got {}",
            self.seed.max_failed_attempts
        );
        anyhow::ensure!(
            self.seed.request_limit > 0,
            "seed.request_limit must be > 0, got {}",
            self.seed.request_limit
        );
        anyhow::ensure!(
            self.seed.session_count > 0,
            "seed.session_count must be > 0, got {}",
            self.seed.session_count
        );
        anyhow::ensure!(
            self.seed.run_stale_secs > 0,
            "seed.run_stale_secs must be > 0, got {}",
            self.seed.run_stale_secs
        );
        anyhow::ensure!(
            self.seed.max_run_secs != Some(0),
            "seed.max_run_secs must be > 0 when set"
        );
        Ok(())
    }
}
