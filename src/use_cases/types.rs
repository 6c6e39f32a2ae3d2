// Use-case level outputs of the peer host loop.

use crate::domain::StoreError;
use crate::domain::systems::TickOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// What one peer tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// Not host; nothing written.
    Idle,
    /// The host seat was vacant and this peer proposed a candidate.
    Proposed { candidate: String, changed: bool },
    /// This peer was host and the simulation step committed.
    Simulated(TickOutcome),
    /// Transaction rejected; the next tick recomputes from fresh state.
    Failed(StoreError),
}

/// Per-lobby counters shared by every peer loop of the lobby.
#[derive(Debug, Default)]
pub struct TickMetrics {
    pub simulated: AtomicU64,
    pub elections: AtomicU64,
    pub finalized: AtomicU64,
    pub host_mismatch: AtomicU64,
    pub failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct TickMetricsSnapshot {
    pub simulated: u64,
    pub elections: u64,
    pub finalized: u64,
    pub host_mismatch: u64,
    pub failures: u64,
}

impl TickMetrics {
    pub fn snapshot(&self) -> TickMetricsSnapshot {
        TickMetricsSnapshot {
            simulated: self.simulated.load(Ordering::Relaxed),
            elections: self.elections.load(Ordering::Relaxed),
            finalized: self.finalized.load(Ordering::Relaxed),
            host_mismatch: self.host_mismatch.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
