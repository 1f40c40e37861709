//! Online-users presence over WebSocket
//!
//! Clients announce themselves with `online`, leave with `offline`, and every
//! connected client receives the full `online users` list after each change.

mod protocol;
mod tracker;
mod websocket;

pub use protocol::*;
pub use tracker::{PresenceError, PresenceHandle};
pub use websocket::{presence_router, ws_handler};
