use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::core::config::QuotaConfig;
use crate::features::quota::models::{QuotaDecision, QuotaRecord};
use crate::shared::clock::Clock;

/// Service for checking and enforcing per-client usage quotas
///
/// Each client identity gets `limit` attempts per rolling window. The window
/// starts with the first request and restarts with the first request after it
/// has ended. Attempts are charged when admitted, whatever happens downstream.
///
/// Records live in a sharded map; the read-modify-write for one identity runs
/// under that identity's shard lock, so concurrent requests from one client can
/// never be admitted more than `limit` times per window.
pub struct QuotaService {
    records: DashMap<String, QuotaRecord>,
    limit: u32,
    window: Duration,
    max_tracked_clients: usize,
    clock: Arc<dyn Clock>,
}

impl QuotaService {
    pub fn new(config: &QuotaConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            limit: config.limit,
            window: Duration::seconds(config.window_secs),
            max_tracked_clients: config.max_tracked_clients,
            clock,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Number of client identities currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    /// Consume one attempt for `client_id` if its quota allows it
    pub fn check(&self, client_id: &str) -> QuotaDecision {
        let now = self.clock.now();

        if !self.records.contains_key(client_id) && self.records.len() >= self.max_tracked_clients
        {
            self.make_room(now);
        }

        let mut record = self
            .records
            .entry(client_id.to_string())
            .or_insert_with(|| QuotaRecord::new(now + self.window));

        if record.is_expired(now) {
            tracing::debug!("Quota window for {} expired, starting a new one", client_id);
            record.reset(now + self.window);
        }

        if record.count >= self.limit {
            return QuotaDecision::denied(record.window_end);
        }

        record.count += 1;

        QuotaDecision::allowed(record.remaining(self.limit), record.window_end)
    }

    /// Report the quota for `client_id` without consuming anything
    pub fn status(&self, client_id: &str) -> QuotaDecision {
        let now = self.clock.now();

        let current = self
            .records
            .get(client_id)
            .map(|record| *record)
            .filter(|record| !record.is_expired(now));

        match current {
            Some(record) if record.count >= self.limit => QuotaDecision::denied(record.window_end),
            Some(record) => {
                QuotaDecision::allowed(record.remaining(self.limit), record.window_end)
            }
            None => QuotaDecision::allowed(self.limit, now + self.window),
        }
    }

    /// Drop records whose window has ended, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(self.clock.now())
    }

    fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        before.saturating_sub(self.records.len())
    }

    /// Free a slot for a new identity when the map is at capacity
    ///
    /// Expired records go first. If every record is still live, the one closest
    /// to the end of its window is dropped.
    fn make_room(&self, now: DateTime<Utc>) {
        let evicted = self.evict_expired_at(now);
        if evicted > 0 {
            tracing::debug!("Evicted {} expired quota records", evicted);
        }

        if self.records.len() < self.max_tracked_clients {
            return;
        }

        let oldest = self
            .records
            .iter()
            .min_by_key(|entry| entry.value().window_end)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            tracing::warn!(
                "Quota map full ({} clients), evicting live record for {}",
                self.max_tracked_clients,
                key
            );
            self.records.remove(&key);
        }
    }
}
