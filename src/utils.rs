use chrono::{ DateTime, Utc };
use tokio::sync::Notify;
use std::time::Duration;

/// Waits for either shutdown signal or delay. Returns true if shutdown was triggered.
pub async fn check_shutdown_or_delay(shutdown: &Notify, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.notified() => true,
    }
}

/// Waits for a delay or shutdown signal, whichever comes first.
pub async fn delay_with_shutdown(shutdown: &Notify, duration: Duration) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {},
        _ = shutdown.notified() => {},
    }
}

/// Helper function to format duration in a compact way
pub fn format_duration_compact(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let duration = end.signed_duration_since(start);
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        format!("{}m", total_seconds / 60)
    } else if total_seconds < 86400 {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes > 0 {
            format!("{}h{}m", hours, minutes)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = total_seconds / 86400;
        let hours = (total_seconds % 86400) / 3600;
        if hours > 0 {
            format!("{}d{}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Format a price with decimals appropriate for its magnitude.
///
/// Stocks and indices read fine at two decimals; option premiums and other
/// sub-dollar values need four to stay meaningful.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return "-".to_string();
    }
    if price.abs() >= 1.0 {
        format!("{:.2}", price)
    } else {
        format!("{:.4}", price)
    }
}

/// Percentage change from `from` to `to`. Returns 0.0 when `from` is not usable.
pub fn pct_change(from: f64, to: f64) -> f64 {
    if !from.is_finite() || !to.is_finite() || from == 0.0 {
        return 0.0;
    }
    ((to - from) / from) * 100.0
}

/// Truncate a string to `max_chars`, appending an ellipsis when cut.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = s.chars().take(keep).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_delay_without_shutdown_returns_false() {
        let shutdown = Notify::new();
        let triggered = check_shutdown_or_delay(&shutdown, Duration::from_millis(10)).await;
        assert!(!triggered);
    }

    #[tokio::test]
    async fn test_delay_interrupted_by_shutdown_returns_true() {
        let shutdown = std::sync::Arc::new(Notify::new());
        let notifier = shutdown.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            notifier.notify_waiters();
        });

        let triggered = check_shutdown_or_delay(&shutdown, Duration::from_secs(30)).await;
        assert!(triggered);
    }

    #[test]
    fn test_format_duration_compact() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(format_duration_compact(start, start + chrono::Duration::seconds(45)), "45s");
        assert_eq!(format_duration_compact(start, start + chrono::Duration::minutes(5)), "5m");
        assert_eq!(
            format_duration_compact(start, start + chrono::Duration::minutes(125)),
            "2h5m"
        );
        assert_eq!(format_duration_compact(start, start + chrono::Duration::hours(3)), "3h");
        assert_eq!(format_duration_compact(start, start + chrono::Duration::hours(50)), "2d2h");
        // End before start clamps to zero instead of going negative
        assert_eq!(format_duration_compact(start + chrono::Duration::seconds(10), start), "0s");
    }

    #[test]
    fn test_format_price_magnitudes() {
        assert_eq!(format_price(4532.1), "4532.10");
        assert_eq!(format_price(23.456), "23.46");
        assert_eq!(format_price(0.0525), "0.0525");
        assert_eq!(format_price(f64::NAN), "-");
    }

    #[test]
    fn test_pct_change() {
        assert!((pct_change(100.0, 110.0) - 10.0).abs() < 1e-9);
        assert!((pct_change(100.0, 90.0) + 10.0).abs() < 1e-9);
        assert_eq!(pct_change(0.0, 50.0), 0.0);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("SPY", 10), "SPY");
        assert_eq!(truncate_str("SPXW240621C05325000", 10), "SPXW24062…");
    }
}
