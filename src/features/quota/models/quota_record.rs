use chrono::{DateTime, Utc};

/// Attempts consumed by one client identity in its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRecord {
    /// Attempts consumed, always within `[0, limit]`
    pub count: u32,
    /// When the current window ends
    pub window_end: DateTime<Utc>,
}

impl QuotaRecord {
    pub fn new(window_end: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_end,
        }
    }

    /// The window is over once `now` is strictly past its end
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.window_end
    }

    /// Start a fresh window in place
    pub fn reset(&mut self, window_end: DateTime<Utc>) {
        self.count = 0;
        self.window_end = window_end;
    }

    pub fn remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_is_strict() {
        let end = Utc::now();
        let record = QuotaRecord::new(end);

        assert!(!record.is_expired(end));
        assert!(record.is_expired(end + Duration::milliseconds(1)));
    }

    #[test]
    fn test_reset_clears_count() {
        let now = Utc::now();
        let mut record = QuotaRecord {
            count: 3,
            window_end: now,
        };

        record.reset(now + Duration::hours(24));

        assert_eq!(record.count, 0);
        assert_eq!(record.window_end, now + Duration::hours(24));
        assert_eq!(record.remaining(3), 3);
    }
}
