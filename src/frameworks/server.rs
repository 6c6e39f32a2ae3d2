// Framework bootstrap for the crew ship server runtime.

use crate::frameworks::config;
use crate::interface_adapters::memory_store::MemoryLobbyDocument;
use crate::interface_adapters::net::{create_lobby_handler, lobby_status_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LobbyOptions, LobbyRegistry, LobbySettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/lobbies", post(create_lobby_handler))
        .route("/lobbies/{lobby_id}", get(lobby_status_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let settings = LobbySettings {
        tick_interval: config::tick_interval(),
        countdown_secs: config::countdown_seconds(),
    };
    tracing::debug!(
        tick_interval_ms = settings.tick_interval.as_millis() as u64,
        countdown_secs = settings.countdown_secs,
        "lobby settings"
    );

    // Every lobby gets its own in-process document.
    let lobby_registry = Arc::new(LobbyRegistry::<MemoryLobbyDocument>::new(
        settings,
        Arc::new(MemoryLobbyDocument::new),
    ));

    // Keep the default lobby pinned so it never gets deleted.
    let default_lobby = lobby_registry
        .create_lobby(
            config::DEFAULT_LOBBY_CODE,
            LobbyOptions {
                pinned: true,
                ..LobbyOptions::default()
            },
        )
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default lobby: {e}")))?;

    // Lobbies created over HTTP but never joined would otherwise stay forever.
    lobby_registry.clone().spawn_idle_sweeper(config::idle_lobby_grace());

    Ok(Arc::new(AppState {
        lobby_registry,
        default_lobby_id: default_lobby.lobby_id.clone(),
    }))
}
