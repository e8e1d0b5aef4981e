// Market-data API abstraction. The scheduler only sees this trait; `http` is the shipped client.

mod http;

pub use http::HttpCandleSource;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::RawCandle;

#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Bars for `symbol`/`timeframe` with event times in `[from, to]` (epoch seconds).
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<RawCandle>, FetchError>;
}
