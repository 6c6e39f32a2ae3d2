use crate::domain::{DocumentSnapshot, LobbyDocument};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, SnapshotDto};
use crate::interface_adapters::state::{AppState, SharedRegistry};
use crate::interface_adapters::utils::ids::next_connection_id;
use crate::use_cases::{ActionError, PlayerSession};

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug, thiserror::Error)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[error("websocket error: {0}")]
    Ws(#[from] axum::Error),
    #[error("failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("lobby document stopped publishing snapshots")]
    SnapshotsClosed,
}

#[derive(Debug, serde::Deserialize)]
pub struct LobbyQuery {
    // Join code of the lobby the client wants to attach to.
    #[serde(default)]
    lobby_id: Option<String>,
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> impl IntoResponse {
    let lobby_id = query
        .lobby_id
        .unwrap_or_else(|| state.default_lobby_id.to_string());

    if state.lobby_registry.get_lobby(&lobby_id).await.is_none() {
        // Keep not-found responses consistent with the JSON error schema.
        return error_response(StatusCode::NOT_FOUND, "lobby not found");
    }

    let lobby_registry = state.lobby_registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, lobby_id, lobby_registry))
}

async fn handle_socket(mut socket: WebSocket, lobby_id: String, lobby_registry: SharedRegistry) {
    let conn_id = next_connection_id();
    let span = info_span!("conn", conn_id = %conn_id, lobby_id = %lobby_id);

    async move {
        let attachment = match lobby_registry.attach(&lobby_id, conn_id.clone()).await {
            Ok(attachment) => attachment,
            Err(e) => {
                // The lobby can be removed between lookup and attach.
                warn!(error = %e, "failed to attach connection");
                let _ = send_close_with_reason(&mut socket, close_code::POLICY, "lobby unavailable")
                    .await;
                return;
            }
        };
        info!("client connected");

        let mut ctx = ConnCtx {
            lobby_id: attachment.lobby_id.clone(),
            session: attachment.session,
            snapshots: attachment.snapshots,
            stats: ConnStats::default(),
            close_frame: None,
        };

        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = %e, "client loop exited with error");
        }

        lobby_registry.detach(&ctx.lobby_id, &conn_id).await;
        let stats = &ctx.stats;
        debug!(
            msgs_in = stats.msgs_in,
            msgs_out = stats.msgs_out,
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            invalid_json = stats.invalid_json,
            rejected = stats.rejected,
            "connection stats"
        );
        info!("client disconnected");
    }
    .instrument(span)
    .await
}

struct ConnCtx<D> {
    // Normalized id of the attached lobby.
    lobby_id: Arc<str>,
    session: PlayerSession<D>,
    snapshots: watch::Receiver<DocumentSnapshot>,
    stats: ConnStats,
    close_frame: Option<CloseFrame>,
}

struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    // Commands that parsed but were refused by the lobby.
    rejected: u32,
    last_invalid_log: Instant,
    last_rejected_log: Instant,
}

impl Default for ConnStats {
    fn default() -> Self {
        // Backdated so the first warning of each kind is logged.
        let backdated = Instant::now()
            .checked_sub(LOG_THROTTLE)
            .unwrap_or_else(Instant::now);
        Self {
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            invalid_json: 0,
            rejected: 0,
            last_invalid_log: backdated,
            last_rejected_log: backdated,
        }
    }
}

impl ConnStats {
    fn sent(&mut self, bytes: usize) {
        self.msgs_out += 1;
        self.bytes_out += bytes as u64;
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg)?;
    let bytes = txt.len();
    socket.send(Message::Text(txt.into())).await?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await?;
    socket.close().await?;
    Ok(())
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop<D: LobbyDocument>(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx<D>,
) -> Result<(), NetError> {
    let identity = ServerMessage::Identity {
        connection_id: ctx.session.conn_id().to_string(),
        lobby_id: ctx.lobby_id.to_string(),
    };
    let bytes = send_message(socket, &identity).await?;
    ctx.stats.sent(bytes);

    // Initial state so the client can render before the next change.
    let initial = ctx.snapshots.borrow_and_update().clone();
    let bytes = send_message(socket, &ServerMessage::Snapshot(initial.into())).await?;
    ctx.stats.sent(bytes);

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        session,
        snapshots,
        stats,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming command from the client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, session, stats, close_frame).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing document snapshot
            changed = snapshots.changed() => {
                match changed {
                    Ok(()) => {
                        let snapshot = snapshots.borrow_and_update().clone();
                        match forward_snapshot(snapshot, socket, stats).await {
                            LoopControl::Continue => false,
                            LoopControl::Disconnect => true,
                        }
                    }
                    Err(_) => {
                        fatal = Some(NetError::SnapshotsClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await {
                debug!(error = %err, "socket close error");
            }
            break;
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws<D: LobbyDocument>(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    session: &PlayerSession<D>,
    stats: &mut ConnStats,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    let text = match incoming {
        Some(Ok(Message::Text(text))) => text,
        Some(Ok(Message::Binary(_))) => {
            *close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            return Ok(LoopControl::Disconnect);
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => return Ok(LoopControl::Continue),
        Some(Ok(Message::Close(_))) => return Ok(LoopControl::Disconnect),
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            return Ok(LoopControl::Disconnect);
        }
        None => {
            info!("websocket closed");
            return Ok(LoopControl::Disconnect);
        }
    };

    stats.msgs_in += 1;
    stats.bytes_in += text.len() as u64;

    let command = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(command) => command,
        Err(parse_err) => {
            stats.invalid_json += 1;
            if should_log(&mut stats.last_invalid_log) {
                warn!(
                    bytes = text.len(),
                    error = %parse_err,
                    "failed to parse client message"
                );
            }

            if stats.invalid_json > MAX_INVALID_JSON {
                *close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "too many invalid messages".into(),
                });
                return Ok(LoopControl::Disconnect);
            }

            let reply = ServerMessage::Error {
                message: format!("invalid message: {parse_err}"),
            };
            let bytes = send_message(socket, &reply).await?;
            stats.sent(bytes);
            return Ok(LoopControl::Continue);
        }
    };

    if let Err(e) = dispatch(session, command).await {
        stats.rejected += 1;
        if should_log(&mut stats.last_rejected_log) {
            debug!(error = %e, "command rejected");
        }
        let reply = ServerMessage::Error {
            message: e.to_string(),
        };
        let bytes = send_message(socket, &reply).await?;
        stats.sent(bytes);
    }
    Ok(LoopControl::Continue)
}

async fn dispatch<D: LobbyDocument>(
    session: &PlayerSession<D>,
    command: ClientMessage,
) -> Result<(), ActionError> {
    match command {
        ClientMessage::SetPresence(patch) => session.set_presence(patch).await,
        ClientMessage::Intent(patch) => session.set_intent(patch).await,
        ClientMessage::BailTap => session.bail_tap().await,
        ClientMessage::RowTap { side } => session.row_tap(side).await,
        ClientMessage::LookoutSpot => session.lookout_spot().await,
        ClientMessage::SetLegend { legend } => session.set_legend(legend).await,
        ClientMessage::SetMission { mission } => session.set_mission(mission).await,
        ClientMessage::StartCountdown { seconds } => session.start_countdown(seconds).await,
        ClientMessage::ForceFinish => session.force_finish().await.map(|_| ()),
        ClientMessage::RestartMission { seconds } => session.restart_mission(seconds).await,
    }
}

async fn forward_snapshot(
    snapshot: DocumentSnapshot,
    socket: &mut WebSocket,
    stats: &mut ConnStats,
) -> LoopControl {
    let msg = ServerMessage::Snapshot(SnapshotDto::from(snapshot));
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            stats.sent(bytes);
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = %err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}
