// In-process lobby document: state plus presence behind one async lock.

use crate::domain::state::{LobbyState, Presence, PresenceMap};
use crate::domain::{Clock, DocumentSnapshot, LobbyDocument, Precondition, StoreError};
use async_trait::async_trait;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, watch};

/// Process-wide monotonic server time: wall clock at startup plus elapsed `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
    origin_epoch_ms: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        let origin_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        Self {
            origin: Instant::now(),
            origin_epoch_ms,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> i64 {
        self.origin_epoch_ms + self.origin.elapsed().as_millis() as i64
    }
}

struct Inner {
    version: u64,
    state: LobbyState,
    presence: PresenceMap,
    closed: bool,
}

impl Inner {
    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            version: self.version,
            state: self.state.clone(),
            presence: self.presence.clone(),
        }
    }
}

pub struct MemoryLobbyDocument<C = SystemClock> {
    clock: C,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<DocumentSnapshot>,
}

impl MemoryLobbyDocument<SystemClock> {
    pub fn new(state: LobbyState) -> Self {
        Self::with_clock(state, SystemClock::new())
    }
}

impl<C: Clock> MemoryLobbyDocument<C> {
    pub fn with_clock(state: LobbyState, clock: C) -> Self {
        let inner = Inner {
            version: 0,
            state,
            presence: PresenceMap::new(),
            closed: false,
        };
        let (snapshots, _) = watch::channel(inner.snapshot());
        Self {
            clock,
            inner: Mutex::new(inner),
            snapshots,
        }
    }

    fn publish(&self, inner: &mut Inner) {
        inner.version += 1;
        self.snapshots.send_replace(inner.snapshot());
    }
}

fn check(precondition: &Precondition, state: &LobbyState) -> Result<(), StoreError> {
    match precondition {
        Precondition::Any => Ok(()),
        Precondition::HostIs(expected) if *expected == state.host_connection_id => Ok(()),
        Precondition::HostIs(expected) => Err(StoreError::HostMismatch {
            expected: expected.clone(),
            actual: state.host_connection_id.clone(),
        }),
    }
}

#[async_trait]
impl<C: Clock> LobbyDocument for MemoryLobbyDocument<C> {
    fn server_timestamp(&self) -> i64 {
        self.clock.now_epoch_millis()
    }

    async fn transact<F, R>(&self, precondition: Precondition, mutator: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut LobbyState, &mut PresenceMap) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        check(&precondition, &inner.state)?;

        // Mutate copies so a no-op transaction publishes nothing.
        let mut state = inner.state.clone();
        let mut presence = inner.presence.clone();
        let result = mutator(&mut state, &mut presence);

        if state != inner.state || presence != inner.presence {
            inner.state = state;
            inner.presence = presence;
            self.publish(&mut inner);
        }
        Ok(result)
    }

    async fn join(&self, conn_id: &str, presence: Presence) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        inner.presence.insert(conn_id.to_string(), presence);
        self.publish(&mut inner);
        Ok(())
    }

    async fn leave(&self, conn_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.presence.remove(conn_id).is_none() {
            return Err(StoreError::NotJoined(conn_id.to_string()));
        }
        self.publish(&mut inner);
        Ok(())
    }

    async fn snapshot(&self) -> DocumentSnapshot {
        self.inner.lock().await.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<DocumentSnapshot> {
        self.snapshots.subscribe()
    }

    async fn close(&self) {
        self.inner.lock().await.closed = true;
    }
}
