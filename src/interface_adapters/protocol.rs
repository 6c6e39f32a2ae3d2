// Wire protocol DTOs for the public lobby socket.
// Internal HTTP DTOs live next to their handlers.

use crate::domain::state::{LobbyState, PresenceMap};
use crate::domain::tuning::{LegendId, MissionId};
use crate::domain::DocumentSnapshot;
use crate::use_cases::{IntentPatch, PresencePatch, RowSide};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Connection id assigned on attach; intents and presence are keyed by it.
    Identity {
        connection_id: String,
        lobby_id: String,
    },
    // Latest committed lobby document.
    Snapshot(SnapshotDto),
    // A command was rejected; the connection stays open.
    Error { message: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    SetPresence(PresencePatch),
    Intent(IntentPatch),
    BailTap,
    RowTap {
        side: RowSide,
    },
    LookoutSpot,
    SetLegend {
        legend: LegendId,
    },
    // `null` selects free sail.
    SetMission {
        mission: Option<MissionId>,
    },
    StartCountdown {
        #[serde(default)]
        seconds: Option<f64>,
    },
    ForceFinish,
    RestartMission {
        #[serde(default)]
        seconds: Option<f64>,
    },
}

/// Full document view pushed after every committed change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub version: u64,
    #[serde(flatten)]
    pub state: LobbyState,
    pub presence: PresenceMap,
}

impl From<DocumentSnapshot> for SnapshotDto {
    fn from(snapshot: DocumentSnapshot) -> Self {
        Self {
            version: snapshot.version,
            state: snapshot.state,
            presence: snapshot.presence,
        }
    }
}
