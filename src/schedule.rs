//! Timezone handling for the daily run: who is due, and which uploads count as "today".

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// Minimum gap between two digests for the same user.
pub const MIN_HOURS_BETWEEN_RUNS: i64 = 20;

pub const VIDEO_WINDOW_HOURS: i64 = 24;

pub fn resolve_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Whether a digest run is due for a user whose last run was `last_run`.
pub fn should_run(last_run: Option<DateTime<Utc>>, timezone: &str, now: DateTime<Utc>) -> bool {
    let Some(last_run) = last_run else {
        return true;
    };

    let elapsed = now.signed_duration_since(last_run);
    tracing::debug!(
        "Last digest {}h ago (user time {})",
        elapsed.num_hours(),
        format_user_time(timezone, now)
    );

    elapsed >= Duration::hours(MIN_HOURS_BETWEEN_RUNS)
}

/// Oldest publish time that still belongs in the digest.
///
/// "Now" is read as the user's local wall-clock time and 24 hours are taken
/// off it; the result is compared against UTC publish times. Unknown zones
/// fall back to a plain 24-hour UTC window.
pub fn video_time_window(timezone: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match timezone.and_then(resolve_timezone) {
        Some(tz) => {
            let local = now.with_timezone(&tz).naive_local();
            (local - Duration::hours(VIDEO_WINDOW_HOURS)).and_utc()
        }
        None => {
            if let Some(name) = timezone {
                tracing::warn!("Unknown timezone {:?}, using a UTC window", name);
            }
            now - Duration::hours(VIDEO_WINDOW_HOURS)
        }
    }
}

/// Local time for log lines, e.g. `5:30 PM IST`.
pub fn format_user_time(timezone: &str, now: DateTime<Utc>) -> String {
    match resolve_timezone(timezone) {
        Some(tz) => now.with_timezone(&tz).format("%-I:%M %p %Z").to_string(),
        None => now.to_rfc3339(),
    }
}
