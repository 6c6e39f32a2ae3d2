// Lobby orchestration: one replicated document per lobby plus a peer loop per connection.

use super::actions::PlayerSession;
use super::host::{HostController, run_peer_loop};
use super::join_code::{ValidationError, normalize_join_code};
use super::types::TickMetrics;
use crate::domain::state::{LobbyState, Presence};
use crate::domain::tuning::{LegendId, MissionId};
use crate::domain::{DocumentSnapshot, LobbyDocument, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Builds the backing document for a new lobby.
pub type DocumentFactory<D> = Arc<dyn Fn(LobbyState) -> D + Send + Sync>;

/// Shared configuration for every lobby of the registry.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Fixed interval of each connection's peer host loop.
    pub tick_interval: Duration,
    /// Countdown used when a client does not ask for one.
    pub countdown_secs: f64,
}

/// Errors returned by lobby registry operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LobbyError {
    #[error("lobby `{0}` already exists")]
    AlreadyExists(String),
    #[error("lobby `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    InvalidCode(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Scenario a new lobby starts with.
#[derive(Debug, Clone)]
pub struct LobbyOptions {
    pub legend: LegendId,
    pub mission: Option<MissionId>,
    /// Random when absent.
    pub seed: Option<u32>,
    /// Pinned lobbies survive their last disconnect.
    pub pinned: bool,
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self {
            legend: LegendId::OpenSea,
            mission: Some(MissionId::MaidenVoyage),
            seed: None,
            pinned: false,
        }
    }
}

/// Per-lobby document and connection bookkeeping.
pub struct LobbyHandle<D> {
    /// Normalized join code clients use to target this lobby.
    pub lobby_id: Arc<str>,
    pub document: Arc<D>,
    /// Counters shared by every peer loop of this lobby.
    pub metrics: Arc<TickMetrics>,
    /// Shutdown signal of each attached connection's peer loop.
    connections: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
    pinned: bool,
    created_at: Instant,
    attached_once: Arc<AtomicBool>,
}

impl<D> Clone for LobbyHandle<D> {
    fn clone(&self) -> Self {
        Self {
            lobby_id: self.lobby_id.clone(),
            document: self.document.clone(),
            metrics: self.metrics.clone(),
            connections: self.connections.clone(),
            pinned: self.pinned,
            created_at: self.created_at,
            attached_once: self.attached_once.clone(),
        }
    }
}

impl<D> LobbyHandle<D> {
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Unpinned, never attached and older than `grace`.
    async fn is_abandoned(&self, grace: Duration) -> bool {
        !self.pinned
            && !self.attached_once.load(Ordering::Acquire)
            && self.created_at.elapsed() >= grace
            && self.connections.lock().await.is_empty()
    }
}

/// What a connection gets back when it attaches to a lobby.
pub struct PeerAttachment<D> {
    pub lobby_id: Arc<str>,
    pub session: PlayerSession<D>,
    /// Subscribed before the join, so the join itself is observed.
    pub snapshots: watch::Receiver<DocumentSnapshot>,
}

/// Thread-safe registry for active lobbies.
pub struct LobbyRegistry<D> {
    settings: LobbySettings,
    factory: DocumentFactory<D>,
    lobbies: RwLock<HashMap<String, LobbyHandle<D>>>,
}

impl<D: LobbyDocument + 'static> LobbyRegistry<D> {
    pub fn new(settings: LobbySettings, factory: DocumentFactory<D>) -> Self {
        Self {
            settings,
            factory,
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    /// Validates the join code and creates a lobby document for it.
    pub async fn create_lobby(
        &self,
        join_code: &str,
        options: LobbyOptions,
    ) -> Result<LobbyHandle<D>, LobbyError> {
        let lobby_id = normalize_join_code(join_code)?;
        let mut lobbies = self.lobbies.write().await;
        if lobbies.contains_key(&lobby_id) {
            return Err(LobbyError::AlreadyExists(lobby_id));
        }

        let seed = options.seed.unwrap_or_else(rand::random);
        let state = LobbyState::new(options.legend, options.mission, seed);
        let lobby = LobbyHandle {
            lobby_id: Arc::from(lobby_id.as_str()),
            document: Arc::new((self.factory)(state)),
            metrics: Arc::new(TickMetrics::default()),
            connections: Arc::new(Mutex::new(HashMap::new())),
            pinned: options.pinned,
            created_at: Instant::now(),
            attached_once: Arc::new(AtomicBool::new(false)),
        };

        info!(
            lobby_id = %lobby_id,
            legend = %options.legend,
            mission = options.mission.map_or("free_sail", MissionId::as_str),
            seed,
            pinned = options.pinned,
            "lobby created"
        );
        lobbies.insert(lobby_id, lobby.clone());
        Ok(lobby)
    }

    /// Looks a lobby up by join code; the code is normalized first.
    pub async fn get_lobby(&self, join_code: &str) -> Option<LobbyHandle<D>> {
        let lobby_id = normalize_join_code(join_code).ok()?;
        let lobbies = self.lobbies.read().await;
        lobbies.get(&lobby_id).cloned()
    }

    /// Joins `conn_id` to the lobby presence and starts its peer host loop.
    pub async fn attach(
        &self,
        join_code: &str,
        conn_id: String,
    ) -> Result<PeerAttachment<D>, LobbyError> {
        let shutdown = Arc::new(Notify::new());
        let lobby = {
            // Registering under the read lock keeps removal from racing the attach.
            let lobbies = self.lobbies.read().await;
            let lobby = normalize_join_code(join_code)
                .ok()
                .and_then(|id| lobbies.get(&id).cloned())
                .ok_or_else(|| LobbyError::NotFound(join_code.to_string()))?;
            lobby
                .connections
                .lock()
                .await
                .insert(conn_id.clone(), shutdown.clone());
            lobby.attached_once.store(true, Ordering::Release);
            lobby
        };

        let snapshots = lobby.document.subscribe();
        if let Err(e) = lobby.document.join(&conn_id, Presence::default()).await {
            lobby.connections.lock().await.remove(&conn_id);
            return Err(e.into());
        }

        let controller = HostController::new(
            conn_id.clone(),
            lobby.document.clone(),
            lobby.metrics.clone(),
        );
        tokio::spawn(run_peer_loop(
            controller,
            self.settings.tick_interval,
            shutdown,
        ));

        debug!(lobby_id = %lobby.lobby_id, conn_id = %conn_id, "connection attached");
        Ok(PeerAttachment {
            lobby_id: lobby.lobby_id.clone(),
            session: PlayerSession::new(
                conn_id,
                lobby.document.clone(),
                self.settings.countdown_secs,
            ),
            snapshots,
        })
    }

    /// Stops the connection's peer loop and drops its presence. Unpinned lobbies
    /// are removed once their last connection is gone.
    pub async fn detach(&self, lobby_id: &str, conn_id: &str) {
        let Some(lobby) = self.get_lobby(lobby_id).await else {
            return;
        };

        if let Some(shutdown) = lobby.connections.lock().await.remove(conn_id) {
            // Stored permit: the loop exits even if it is mid-tick right now.
            shutdown.notify_one();
        }
        if let Err(e) = lobby.document.leave(conn_id).await {
            debug!(lobby_id, conn_id, error = %e, "presence already gone");
        }

        if lobby.pinned {
            return;
        }
        let mut lobbies = self.lobbies.write().await;
        if lobby.connections.lock().await.is_empty()
            && lobbies.remove(lobby.lobby_id.as_ref()).is_some()
        {
            lobby.document.close().await;
            info!(lobby_id = %lobby.lobby_id, "empty lobby removed");
        }
    }

    /// Removes lobbies nobody attached to within `grace`. Lobbies that did see a
    /// connection are removed by `detach` instead.
    pub async fn sweep_idle(&self, grace: Duration) -> usize {
        let mut lobbies = self.lobbies.write().await;
        let mut abandoned = Vec::new();
        for (lobby_id, lobby) in lobbies.iter() {
            if lobby.is_abandoned(grace).await {
                abandoned.push(lobby_id.clone());
            }
        }

        for lobby_id in &abandoned {
            if let Some(lobby) = lobbies.remove(lobby_id) {
                lobby.document.close().await;
                info!(lobby_id = %lobby_id, "idle lobby removed");
            }
        }
        abandoned.len()
    }

    /// Periodically sweeps lobbies that were created but never joined.
    pub fn spawn_idle_sweeper(self: Arc<Self>, grace: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(grace.max(Duration::from_secs(1)));
            loop {
                interval.tick().await;
                let removed = self.sweep_idle(grace).await;
                if removed > 0 {
                    debug!(removed, "idle lobby sweep");
                }
            }
        })
    }
}
