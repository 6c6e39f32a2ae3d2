use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::state::{LobbyState, Presence, PresenceMap};

// Port for the peer-agreed server time, epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> i64;
}

/// Guard checked atomically with a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    Any,
    /// Only commit if this connection still holds the host seat.
    HostIs(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("host seat moved: expected `{expected}`, document has `{actual}`")]
    HostMismatch { expected: String, actual: String },
    #[error("connection `{0}` is not joined to the lobby")]
    NotJoined(String),
    #[error("lobby document is closed")]
    Closed,
}

/// Committed view of the lobby after some transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Bumped on every committed change.
    pub version: u64,
    pub state: LobbyState,
    pub presence: PresenceMap,
}

// Port for one replicated lobby document plus its presence set.
#[async_trait]
pub trait LobbyDocument: Send + Sync {
    fn server_timestamp(&self) -> i64;

    /// Runs `mutator` atomically against the document and presence. Transactions
    /// against one document serialize; nothing is committed if the precondition fails.
    async fn transact<F, R>(&self, precondition: Precondition, mutator: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut LobbyState, &mut PresenceMap) -> R + Send + 'static,
        R: Send + 'static;

    async fn join(&self, conn_id: &str, presence: Presence) -> Result<(), StoreError>;
    async fn leave(&self, conn_id: &str) -> Result<(), StoreError>;
    async fn snapshot(&self) -> DocumentSnapshot;
    fn subscribe(&self) -> watch::Receiver<DocumentSnapshot>;

    /// Rejects all further transactions.
    async fn close(&self);
}
