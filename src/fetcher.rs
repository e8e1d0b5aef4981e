// Time-window fetcher: one bounded request ending at the task cursor.

use std::sync::Arc;
use tracing::instrument;

use crate::error::FetchError;
use crate::models::CandleRow;
use crate::source::CandleSource;
use crate::timeframe::interval_seconds;

/// Result of one window fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Lower bound actually requested.
    pub from: i64,
    pub rows: Vec<CandleRow>,
    /// Oldest event time in `(0, to]`, or 0 when no row had a usable timestamp.
    pub oldest_event_time: i64,
}

/// Start of the window ending at `to` that covers at most `limit` candles, never below `min_from`.
pub fn window_from(to: i64, timeframe: &str, limit: u32, min_from: i64) -> i64 {
    let span = interval_seconds(timeframe).saturating_mul(limit as i64);
    min_from.max(to.saturating_sub(span))
}

pub struct TimeWindowFetcher {
    source: Arc<dyn CandleSource>,
}

impl TimeWindowFetcher {
    pub fn new(source: Arc<dyn CandleSource>) -> Self {
        Self { source }
    }

    /// Fetches `[window_from(..), to]`. Rows with non-positive timestamps are dropped; rows
    /// after `to` are returned but do not count towards `oldest_event_time`.
    #[instrument(skip(self), fields(operation = "fetch_window"))]
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: &str,
        to: i64,
        limit: u32,
        min_from: i64,
    ) -> Result<FetchOutcome, FetchError> {
        let from = window_from(to, timeframe, limit, min_from);
        let raw = self
            .source
            .fetch_candles(symbol, timeframe, from, to)
            .await?;

        let oldest_event_time = raw
            .iter()
            .map(|c| c.time)
            .filter(|t| *t > 0 && *t <= to)
            .min()
            .unwrap_or(0);
        if oldest_event_time == 0 {
            return Ok(FetchOutcome {
                from,
                rows: Vec::new(),
                oldest_event_time: 0,
            });
        }

        let rows = raw
            .iter()
            .filter(|c| c.time > 0)
            .map(|c| CandleRow::from_raw(symbol, timeframe, c))
            .collect();
        Ok(FetchOutcome {
            from,
            rows,
            oldest_event_time,
        })
    }
}
