use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::Clock;
use crate::domain::state::LobbyState;
use crate::interface_adapters::memory_store::MemoryLobbyDocument;

// Shared hand-driven time source for deterministic use-case tests.
#[derive(Clone)]
pub(crate) struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub(crate) fn starting_at(ms: i64) -> Self {
        Self(Arc::new(AtomicI64::new(ms)))
    }

    pub(crate) fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) type TestDocument = MemoryLobbyDocument<ManualClock>;

pub(crate) fn document_at(state: LobbyState, start_ms: i64) -> (Arc<TestDocument>, ManualClock) {
    let clock = ManualClock::starting_at(start_ms);
    let document = Arc::new(MemoryLobbyDocument::with_clock(state, clock.clone()));
    (document, clock)
}
