use std::{env, time::Duration};

// Runtime/server settings (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("SHIP_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// Interval of every connection's peer host loop (~20 Hz by default).
pub fn tick_interval() -> Duration {
    let millis = env::var("SHIP_TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(50);
    Duration::from_millis(millis)
}

pub fn countdown_seconds() -> f64 {
    env::var("SHIP_COUNTDOWN_SECONDS")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .unwrap_or(3.0)
}

/// How long a created lobby may sit without any connection before it is swept.
pub fn idle_lobby_grace() -> Duration {
    let secs = env::var("SHIP_IDLE_LOBBY_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}

// Pinned lobby that sockets without a `lobby_id` attach to.
pub const DEFAULT_LOBBY_CODE: &str = "SEA-000";
