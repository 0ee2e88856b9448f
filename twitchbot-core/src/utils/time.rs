// twitchbot-core/src/utils/time.rs

use chrono::Local;

/// `3723` -> `"1 hours, 2 minutes, 3 seconds"`. Zero parts are left out,
/// so `0` is the empty string.
pub fn seconds_to_readable(seconds: u64) -> String {
    let mut rest = seconds;
    let mut parts = Vec::new();
    for (n, unit) in [(60 * 60, "hours"), (60, "minutes"), (1, "seconds")] {
        if rest / n > 0 {
            parts.push(format!("{} {}", rest / n, unit));
        }
        rest %= n;
    }
    parts.join(", ")
}

/// `[HH:MM]` in local time, the prefix of every session log line.
pub fn dt_str() -> String {
    Local::now().format("[%H:%M]").to_string()
}

/// Today's date as `YYYY-MM-DD`, used to name the session log file.
pub fn today_str() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
