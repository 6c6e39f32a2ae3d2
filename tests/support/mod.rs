// One server per integration-test binary, shared by every test in it.
#![allow(dead_code)]

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

// Base URL published once the server has bound its ephemeral port.
static SERVER_URL: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

/// Boots the server on first use and returns its `http://` base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Own OS thread and runtime so the server outlives each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                crew_ship_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

/// WebSocket URL for attaching to `lobby_id`.
pub fn ws_url(lobby_id: &str) -> String {
    let base = ensure_server();
    let host = base
        .strip_prefix("http://")
        .expect("base url should use http://");
    format!("ws://{host}/ws?lobby_id={lobby_id}")
}

/// Fresh random join code in `ABC-123` shape.
pub fn random_join_code() -> String {
    let bytes = *uuid::Uuid::new_v4().as_bytes();
    let letters: String = bytes[..3]
        .iter()
        .map(|b| char::from(b'A' + b % 26))
        .collect();
    let digits = u16::from_be_bytes([bytes[3], bytes[4]]) % 1000;
    format!("{letters}-{digits:03}")
}

fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
