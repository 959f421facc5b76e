//! Relay statistics
//!
//! Process-lifetime counters. Observational only, the pipeline never reads them.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared relay counters
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Objects carrying the discriminator field
    processed: AtomicU64,
    /// Rejected for an empty name or a blocked prefix
    blocked: AtomicU64,
    /// Rejected by the allowlist
    not_allowed: AtomicU64,
    /// Successful transport calls
    sent: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn inc_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn blocked(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    pub fn inc_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn not_allowed(&self) -> u64 {
        self.not_allowed.load(Ordering::Relaxed)
    }

    pub fn inc_not_allowed(&self) {
        self.not_allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed(),
            blocked: self.blocked(),
            not_allowed: self.not_allowed(),
            sent: self.sent(),
        }
    }
}

/// Snapshot of relay counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub blocked: u64,
    pub not_allowed: u64,
    pub sent: u64,
}
