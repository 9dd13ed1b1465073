//! OHLCV data structures

pub mod candle;

pub use candle::*;

use chrono::Duration;

/// Parse a timeframe string ("1m", "5m", "1h", "4h", "1d", "1w") into a
/// candle sampling interval. Returns `None` for unknown formats.
pub fn timeframe_duration(timeframe: &str) -> Option<Duration> {
    let timeframe = timeframe.trim();
    if timeframe.len() < 2 {
        return None;
    }
    let (count, unit) = timeframe.split_at(timeframe.len() - 1);
    let count: i64 = count.parse().ok()?;
    if count <= 0 {
        return None;
    }
    match unit {
        "s" => Some(Duration::seconds(count)),
        "m" => Some(Duration::minutes(count)),
        "h" => Some(Duration::hours(count)),
        "d" => Some(Duration::days(count)),
        "w" => Some(Duration::weeks(count)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(timeframe_duration("1m"), Some(Duration::minutes(1)));
        assert_eq!(timeframe_duration("4h"), Some(Duration::hours(4)));
        assert_eq!(timeframe_duration("1d"), Some(Duration::days(1)));
        assert_eq!(timeframe_duration("xyz"), None);
        assert_eq!(timeframe_duration("0m"), None);
    }
}
