// Timeframe tokens ("1D", "4H", "15m", "30") mapped to their duration in seconds

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Duration of one candle for `token`.
/// Bare integers are minutes; unit suffixes are case-insensitive (m/min, h/hr, d, w).
/// Anything unrecognized (including a zero amount) is one day.
pub fn interval_seconds(token: &str) -> i64 {
    let token = token.trim();
    let split = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let (digits, unit) = token.split_at(split);

    let amount: i64 = if digits.is_empty() {
        1
    } else {
        match digits.parse() {
            Ok(n) if n > 0 => n,
            _ => return SECONDS_PER_DAY,
        }
    };

    let unit_secs = match unit.to_ascii_lowercase().as_str() {
        "" if !digits.is_empty() => SECONDS_PER_MINUTE,
        "m" | "min" | "mins" | "minute" | "minutes" => SECONDS_PER_MINUTE,
        "h" | "hr" | "hour" | "hours" => SECONDS_PER_HOUR,
        "d" | "day" | "days" => SECONDS_PER_DAY,
        "w" | "wk" | "week" | "weeks" => SECONDS_PER_WEEK,
        _ => return SECONDS_PER_DAY,
    };

    amount.saturating_mul(unit_secs)
}
