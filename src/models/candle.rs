// Candle models: raw API bar and the persisted OHLCV row

use serde::{Deserialize, Serialize};

/// One bar as returned by the market-data API, before it is tied to a symbol/timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    /// Event timestamp, epoch seconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Row written through the idempotent upsert keyed by (symbol, timeframe, event_time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleRow {
    pub symbol: String,
    pub timeframe: String,
    pub event_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl CandleRow {
    pub fn from_raw(symbol: &str, timeframe: &str, raw: &RawCandle) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            event_time: raw.time,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
        }
    }
}
