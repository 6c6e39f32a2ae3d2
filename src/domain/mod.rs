// Domain layer: ship document, replay-safe simulation and the store port.

pub mod ports;
pub mod rng;
pub mod state;
pub mod systems;
pub mod tuning;

pub use ports::{Clock, DocumentSnapshot, LobbyDocument, Precondition, StoreError};
pub use state::{
    AttemptLogEntry, AttemptReason, HazardEvent, Intent, IntentsByConn, LobbyState, Phase,
    Presence, PresenceMap, Role, ShipState,
};
