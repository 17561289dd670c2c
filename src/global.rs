use chrono::{ DateTime, Utc };
use once_cell::sync::Lazy;

// Startup timestamp to track when the bot started for uptime reporting
pub static STARTUP_TIME: Lazy<DateTime<Utc>> = Lazy::new(|| Utc::now());

/// Uptime since process start, formatted compactly.
pub fn uptime_string() -> String {
    crate::utils::format_duration_compact(*STARTUP_TIME, Utc::now())
}
