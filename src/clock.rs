// Wall-clock helpers (epoch seconds / milliseconds)

use std::time::{SystemTime, UNIX_EPOCH};

pub fn unix_millis() -> anyhow::Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as i64)
}

pub fn unix_secs() -> anyhow::Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}
