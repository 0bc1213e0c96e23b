use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::quota::models::QuotaDecision;

/// Response DTO for the caller's quota status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotaStatusDto {
    /// Attempts left before hitting the limit
    pub remaining: u32,
    /// Maximum attempts allowed per window
    pub limit: u32,
    /// Whether another analysis would be accepted right now
    pub can_analyze: bool,
    /// When the current window resets
    pub reset_time: DateTime<Utc>,
}

impl QuotaStatusDto {
    pub fn from_decision(decision: QuotaDecision, limit: u32) -> Self {
        Self {
            remaining: decision.remaining,
            limit,
            can_analyze: decision.allowed,
            reset_time: decision.reset_time,
        }
    }
}
