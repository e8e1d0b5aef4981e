// Symbol registry backed by the symbols table.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

use super::SeedStore;
use crate::clock::unix_millis;

#[async_trait]
pub trait SymbolRegistry: Send + Sync {
    async fn get_all_symbols(&self) -> anyhow::Result<Vec<String>>;
}

pub(super) async fn init_symbols_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS symbols (symbol TEXT PRIMARY KEY, created_at INTEGER NOT NULL)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl SymbolRegistry for SeedStore {
    async fn get_all_symbols(&self) -> anyhow::Result<Vec<String>> {
        let symbols: Vec<String> = sqlx::query_scalar("SELECT symbol FROM symbols ORDER BY symbol ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(symbols)
    }
}

impl SeedStore {
    /// Adds symbols that are not registered yet. Returns how many were new.
    #[instrument(skip(self, symbols), fields(repo = "seed", operation = "register_symbols", symbols_count = symbols.len()))]
    pub async fn register_symbols(&self, symbols: &[String]) -> anyhow::Result<u64> {
        let now_ms = unix_millis()?;
        let mut tx = self.pool.begin().await?;
        let mut added = 0u64;
        for symbol in symbols.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let r = sqlx::query("INSERT OR IGNORE INTO symbols (symbol, created_at) VALUES ($1, $2)")
                .bind(symbol)
                .bind(now_ms)
                .execute(&mut *tx)
                .await?;
            added += r.rows_affected();
        }
        tx.commit().await?;
        Ok(added)
    }
}
