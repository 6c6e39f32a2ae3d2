// Use cases layer: peer host loop, player commands and lobby orchestration.

pub mod actions;
pub mod host;
pub mod join_code;
pub mod lobby;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use actions::{ActionError, IntentPatch, PlayerSession, PresencePatch, RowSide};
pub use host::{HostController, run_peer_loop};
pub use join_code::{ValidationError, normalize_join_code};
pub use lobby::{
    DocumentFactory, LobbyError, LobbyHandle, LobbyOptions, LobbyRegistry, LobbySettings,
    PeerAttachment,
};
pub use types::{TickMetrics, TickMetricsSnapshot, TickReport};
