//! Web front end: measurement WebSocket and status API

pub mod handlers;
pub mod server;
pub mod websocket;


pub use server::{build_router, AppState, WebServer};
pub use websocket::WsSubscriber;
