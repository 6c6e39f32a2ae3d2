use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Returns a fresh connection id for this process.
///
/// Ids come from one counter seeded with the startup time and are zero-padded,
/// so their string order is their issue order. Host election picks the smallest
/// present id, which makes the longest-connected peer the preferred host.
pub fn next_connection_id() -> String {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    format!("conn-{:020}", counter.fetch_add(1, Ordering::Relaxed))
}
