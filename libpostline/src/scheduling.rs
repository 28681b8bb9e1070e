//! Parsing of human-readable schedule strings
//!
//! The authoring CLI accepts "90m" style durations and "tomorrow 9am"
//! natural language; both resolve against a caller-supplied reference
//! time, so parsing is deterministic and testable.

use chrono::{DateTime, Duration, Utc};

use crate::{PostlineError, Result};

/// Resolve a schedule string against `reference`.
///
/// Durations ("30m", "2h", "1d") are offsets from the reference time;
/// anything else goes to the natural-language parser ("tomorrow",
/// "next friday 10am").
pub fn resolve_schedule(input: &str, reference: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PostlineError::InvalidInput(
            "Schedule string is empty".to_string(),
        ));
    }

    if let Ok(offset) = humantime::parse_duration(trimmed) {
        let offset = Duration::try_seconds(offset.as_secs() as i64).ok_or_else(|| {
            PostlineError::InvalidInput(format!("Duration out of range: {}", trimmed))
        })?;
        return Ok(reference + offset);
    }

    chrono_english::parse_date_string(trimmed, reference, chrono_english::Dialect::Us).map_err(
        |e| PostlineError::InvalidInput(format!("Unrecognized schedule \"{}\": {}", trimmed, e)),
    )
}

/// Resolve a schedule string and require the result to lie in the future.
///
/// This is the entry point for scheduling a post: a time at or before
/// `now` is rejected.
pub fn parse_future_schedule(input: &str, now: i64) -> Result<i64> {
    let reference = DateTime::from_timestamp(now, 0)
        .ok_or_else(|| PostlineError::InvalidInput(format!("Timestamp out of range: {}", now)))?;

    let scheduled = resolve_schedule(input, reference)?.timestamp();
    if scheduled <= now {
        return Err(PostlineError::InvalidInput(format!(
            "Scheduled time is not in the future: {}",
            input
        )));
    }
    Ok(scheduled)
}
