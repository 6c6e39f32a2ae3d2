use crate::interface_adapters::memory_store::MemoryLobbyDocument;
use crate::use_cases::LobbyRegistry;
use std::sync::Arc;

pub type SharedRegistry = Arc<LobbyRegistry<MemoryLobbyDocument>>;

#[derive(Clone)]
pub struct AppState {
    // Owns every lobby document and the per-connection peer loops.
    pub lobby_registry: SharedRegistry,
    // Pinned lobby used when a socket does not name one.
    pub default_lobby_id: Arc<str>,
}
