// Candle table: idempotent upsert keyed by (symbol, timeframe, event_time).

use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::instrument;

use super::SeedStore;
use crate::clock::unix_millis;
use crate::models::CandleRow;

/// Rows per INSERT statement (9 binds each, below SQLite's parameter limit).
const UPSERT_CHUNK: usize = 100;

/// Row writer used by the scheduler. Writing the same rows twice must leave the same stored set.
#[async_trait]
pub trait CandleSink: Send + Sync {
    async fn upsert_rows(&self, rows: &[CandleRow]) -> anyhow::Result<()>;
}

pub(super) async fn init_candles_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candles (
            symbol TEXT NOT NULL,
            timeframe TEXT NOT NULL,
            event_time INTEGER NOT NULL,
            open REAL NOT NULL,
            high REAL NOT NULL,
            low REAL NOT NULL,
            close REAL NOT NULL,
            volume REAL NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (symbol, timeframe, event_time)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl CandleSink for SeedStore {
    #[instrument(skip(self, rows), fields(repo = "seed", operation = "upsert_rows", rows_count = rows.len()))]
    async fn upsert_rows(&self, rows: &[CandleRow]) -> anyhow::Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let now_ms = unix_millis()?;
        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(UPSERT_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO candles (symbol, timeframe, event_time, open, high, low, close, volume, updated_at) ",
            );
            qb.push_values(chunk, |mut b, row| {
                b.push_bind(row.symbol.clone())
                    .push_bind(row.timeframe.clone())
                    .push_bind(row.event_time)
                    .push_bind(row.open)
                    .push_bind(row.high)
                    .push_bind(row.low)
                    .push_bind(row.close)
                    .push_bind(row.volume)
                    .push_bind(now_ms);
            });
            qb.push(
                " ON CONFLICT (symbol, timeframe, event_time) DO UPDATE SET \
                 open = excluded.open, \
                 high = excluded.high, \
                 low = excluded.low, \
                 close = excluded.close, \
                 volume = excluded.volume, \
                 updated_at = excluded.updated_at",
            );
            qb.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl SeedStore {
    pub async fn candle_count(&self, symbol: &str, timeframe: &str) -> anyhow::Result<i64> {
        let n: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM candles WHERE symbol = $1 AND timeframe = $2")
                .bind(symbol)
                .bind(timeframe)
                .fetch_one(&self.pool)
                .await?;
        Ok(n)
    }

    /// Stored rows for one series, ascending by event time.
    pub async fn get_candles(&self, symbol: &str, timeframe: &str) -> anyhow::Result<Vec<CandleRow>> {
        let rows = sqlx::query(
            "SELECT symbol, timeframe, event_time, open, high, low, close, volume
             FROM candles WHERE symbol = $1 AND timeframe = $2 ORDER BY event_time ASC",
        )
        .bind(symbol)
        .bind(timeframe)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(CandleRow {
                symbol: row.try_get("symbol")?,
                timeframe: row.try_get("timeframe")?,
                event_time: row.try_get("event_time")?,
                open: row.try_get("open")?,
                high: row.try_get("high")?,
                low: row.try_get("low")?,
                close: row.try_get("close")?,
                volume: row.try_get("volume")?,
            });
        }
        Ok(out)
    }
}
