//! Presence wire protocol
//!
//! Every WebSocket text frame is a JSON object `{"event": ..., "data": ...}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::db::models::PublicProfile;

/// Identifies one live WebSocket connection
pub type ConnectionId = Uuid;

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Announce the profile as online, bound to this connection
    #[serde(rename = "online")]
    Online(PublicProfile),
    /// Remove an identifier from the online list
    #[serde(rename = "offline")]
    Offline(String),
}

/// Events sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Profiles of every online user, sent to every connection after each change
    #[serde(rename = "online users")]
    OnlineUsers(Vec<PublicProfile>),
    /// Frame that could not be understood
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
