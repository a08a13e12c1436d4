//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch for a timestamp
pub fn epoch_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

/// Seconds elapsed since `since`, never negative
pub fn seconds_since(since: DateTime<Utc>) -> f64 {
    let elapsed = now().signed_duration_since(since);
    (elapsed.num_milliseconds().max(0) as f64) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_epoch_millis_matches_seconds() {
        let timestamp = now();
        assert_eq!(epoch_millis(timestamp) / 1000, timestamp.timestamp());
    }

    #[tokio::test]
    async fn test_seconds_since_advances() {
        let start = now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seconds_since(start) > 0.0);
    }

    #[test]
    fn test_seconds_since_future_is_zero() {
        let future = now() + chrono::Duration::seconds(60);
        assert_eq!(seconds_since(future), 0.0);
    }
}
