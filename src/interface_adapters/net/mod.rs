// Network adapter modules split by public lobby sockets vs lobby management routes.

pub mod client;
pub mod internal;

pub use client::ws_handler;
pub use internal::{create_lobby_handler, lobby_status_handler};
