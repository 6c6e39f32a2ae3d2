use crate::domain::tuning::{LegendId, MissionId};
use crate::domain::{LobbyDocument, Phase};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LobbyError, LobbyOptions, TickMetricsSnapshot};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct LobbyInitRequest {
    // Join code, `ABC-123` shape; normalized before use.
    lobby_id: String,
    #[serde(default)]
    legend: Option<String>,
    // Absent means the default mission; `"free_sail"` sails without one.
    #[serde(default)]
    mission: Option<String>,
    #[serde(default)]
    seed: Option<u32>,
}

#[derive(Debug, serde::Serialize)]
struct LobbyInitResponse {
    // The normalized lobby id that was created.
    lobby_id: String,
}

#[derive(Debug, serde::Serialize)]
struct LobbyStatusResponse {
    lobby_id: String,
    phase: Phase,
    legend: LegendId,
    mission: Option<MissionId>,
    host_connection_id: String,
    connections: usize,
    pinned: bool,
    attempts: u32,
    metrics: TickMetricsSnapshot,
}

const FREE_SAIL: &str = "free_sail";

fn parse_options(payload: &LobbyInitRequest) -> Result<LobbyOptions, String> {
    let mut options = LobbyOptions {
        seed: payload.seed,
        ..LobbyOptions::default()
    };
    if let Some(legend) = payload.legend.as_deref() {
        options.legend = legend.parse::<LegendId>().map_err(|e| e.to_string())?;
    }
    match payload.mission.as_deref() {
        None => {}
        Some(FREE_SAIL) => options.mission = None,
        Some(mission) => {
            options.mission = Some(mission.parse::<MissionId>().map_err(|e| e.to_string())?);
        }
    }
    Ok(options)
}

pub async fn create_lobby_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LobbyInitRequest>,
) -> impl IntoResponse {
    let options = match parse_options(&payload) {
        Ok(options) => options,
        Err(error) => return error_response(StatusCode::BAD_REQUEST, error),
    };

    // Created lobbies are not pinned and will be removed on last disconnect.
    match state
        .lobby_registry
        .create_lobby(&payload.lobby_id, options)
        .await
    {
        Ok(lobby) => (
            StatusCode::CREATED,
            Json(LobbyInitResponse {
                lobby_id: lobby.lobby_id.to_string(),
            }),
        )
            .into_response(),
        Err(e @ LobbyError::InvalidCode(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ LobbyError::AlreadyExists(_)) => error_response(StatusCode::CONFLICT, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn lobby_status_handler(
    State(state): State<Arc<AppState>>,
    Path(lobby_id): Path<String>,
) -> impl IntoResponse {
    let Some(lobby) = state.lobby_registry.get_lobby(&lobby_id).await else {
        return error_response(StatusCode::NOT_FOUND, "lobby not found");
    };

    let snapshot = lobby.document.snapshot().await;
    let ship = &snapshot.state.ship;
    Json(LobbyStatusResponse {
        lobby_id: lobby.lobby_id.to_string(),
        phase: ship.phase,
        legend: ship.legend_id,
        mission: ship.mission_id,
        host_connection_id: snapshot.state.host_connection_id.clone(),
        connections: lobby.connection_count().await,
        pinned: lobby.is_pinned(),
        attempts: ship.attempts,
        metrics: lobby.metrics.snapshot(),
    })
    .into_response()
}
