use chrono::{DateTime, Utc};

/// Outcome of a quota check for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

impl QuotaDecision {
    pub fn allowed(remaining: u32, reset_time: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_time,
        }
    }

    pub fn denied(reset_time: DateTime<Utc>) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_time,
        }
    }
}
