// Interface adapters: in-process document store, wire protocol and network handling.

pub mod http;
pub mod memory_store;
pub mod net;
pub mod protocol;
pub mod state;
pub mod utils;
