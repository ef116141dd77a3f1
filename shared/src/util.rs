/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current UTC timestamp in seconds (Stripe's time unit)
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Convert a Stripe unix timestamp (seconds) into a UTC datetime
pub fn from_unix_secs(secs: i64) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unix_secs() {
        let dt = from_unix_secs(1_700_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_now_units() {
        let secs = now_secs();
        let millis = now_millis();
        assert!((millis / 1000 - secs).abs() <= 1);
    }
}
