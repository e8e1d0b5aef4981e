// SQLite seed store: task queue, run tickets, settings, candles, symbols, audit log.

mod audit;
mod candles;
mod settings;
mod symbols;
mod tasks;

pub use audit::AuditLog;
pub use candles::CandleSink;
pub use symbols::SymbolRegistry;
pub use tasks::RunTicket;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

pub struct SeedStore {
    pool: SqlitePool,
}

impl SeedStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    /// Creates all tables and indexes. Safe to call repeatedly.
    pub async fn init(&self) -> anyhow::Result<()> {
        tasks::init_task_tables(&self.pool).await?;
        settings::init_settings_table(&self.pool).await?;
        candles::init_candles_table(&self.pool).await?;
        symbols::init_symbols_table(&self.pool).await?;
        audit::init_audit_table(&self.pool).await?;
        Ok(())
    }
}
