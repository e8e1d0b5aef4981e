// Constraint resolver: turns a seed request into the global window of a seed run.

use crate::models::{FULL_HISTORY_FROM, RangeMode, RequestedConstraints, SeedConstraints};

/// Resolves `requested` against the previously persisted constraints. Never fails.
///
/// - Missing mode and session count fall back to `previous`, then to `full` / `default_sessions`.
/// - `date_range` bounds fall back to the previous range; a reversed range is swapped.
/// - `full` and `sessions` end at the requested `to_time` or `now`; the `sessions` lower
///   bound is left to each task (see [`SeedConstraints::min_from_for`]).
/// - Non-positive times count as missing.
pub fn resolve(
    requested: &RequestedConstraints,
    previous: Option<&SeedConstraints>,
    default_sessions: u32,
    now: i64,
) -> SeedConstraints {
    let mode = requested
        .mode
        .or(previous.map(|p| p.mode))
        .unwrap_or_default();
    let session_count = requested
        .session_count
        .filter(|n| *n > 0)
        .or(previous.map(|p| p.session_count).filter(|n| *n > 0))
        .unwrap_or(default_sessions)
        .max(1);
    let requested_to = requested.to_time.filter(|t| *t > 0);

    match mode {
        RangeMode::DateRange => {
            let previous_range = previous.filter(|p| p.mode == RangeMode::DateRange);
            let from = requested
                .from_time
                .filter(|t| *t > 0)
                .or(previous_range.map(|p| p.from_time))
                .unwrap_or(FULL_HISTORY_FROM);
            let to = requested_to
                .or(previous_range.map(|p| p.to_time))
                .unwrap_or(now);
            let (from_time, to_time) = if from > to { (to, from) } else { (from, to) };
            SeedConstraints {
                mode,
                from_time,
                to_time,
                session_count,
            }
        }
        RangeMode::Full | RangeMode::Sessions => SeedConstraints {
            mode,
            from_time: FULL_HISTORY_FROM,
            to_time: requested_to.unwrap_or(now),
            session_count,
        },
    }
}
