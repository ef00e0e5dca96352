//! Network infrastructure: the subscriber registry and the WebSocket fan-out
//! server that feeds it.

pub mod registry;
pub mod ws_server;
