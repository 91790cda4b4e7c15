//! Infrastructure layer for the server: the WebSocket listener.

pub mod ws_server;

pub use ws_server::{bind, run_server, serve};
