//! Presence tracker actor
//!
//! A single task owns the online map and the set of live connections. Every
//! other part of the server talks to it through a cloneable [`PresenceHandle`],
//! so the map has exactly one writer and needs no lock.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::protocol::{ConnectionId, ServerEvent};
use crate::core::db::models::PublicProfile;

/// Capacity of the command channel feeding the actor
const COMMAND_BUFFER_SIZE: usize = 256;

/// Presence errors
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("Presence tracker is no longer running")]
    TrackerStopped,
}

enum Command {
    Connect {
        connection: ConnectionId,
        sender: mpsc::Sender<ServerEvent>,
    },
    Online {
        connection: ConnectionId,
        profile: PublicProfile,
    },
    Offline {
        identifier: String,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<PublicProfile>>,
    },
}

/// Cloneable handle to the presence actor
#[derive(Clone)]
pub struct PresenceHandle {
    commands: mpsc::Sender<Command>,
}

impl PresenceHandle {
    /// Spawn the actor on the current runtime and return a handle to it.
    ///
    /// The actor stops once every handle has been dropped.
    pub fn spawn() -> Self {
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(PresenceTracker::default().run(inbox));
        Self { commands }
    }

    /// Register a new connection; it immediately receives the online list
    pub async fn connect(
        &self,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<ConnectionId, PresenceError> {
        let connection = Uuid::new_v4();
        self.send(Command::Connect { connection, sender }).await?;
        Ok(connection)
    }

    /// Mark `profile` online, bound to `connection`
    pub async fn online(
        &self,
        connection: ConnectionId,
        profile: PublicProfile,
    ) -> Result<(), PresenceError> {
        self.send(Command::Online {
            connection,
            profile,
        })
        .await
    }

    /// Remove `identifier` from the online list
    pub async fn offline(&self, identifier: impl Into<String>) -> Result<(), PresenceError> {
        self.send(Command::Offline {
            identifier: identifier.into(),
        })
        .await
    }

    /// Forget a closed connection and every entry it still owns
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), PresenceError> {
        self.send(Command::Disconnect { connection }).await
    }

    /// Current online list, ordered by identifier
    pub async fn snapshot(&self) -> Result<Vec<PublicProfile>, PresenceError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        response.await.map_err(|_| PresenceError::TrackerStopped)
    }

    async fn send(&self, command: Command) -> Result<(), PresenceError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PresenceError::TrackerStopped)
    }
}

/// An online profile and the connection that announced it
struct PresenceEntry {
    connection: ConnectionId,
    profile: PublicProfile,
}

/// State owned by the actor task
#[derive(Default)]
struct PresenceTracker {
    entries: HashMap<String, PresenceEntry>,
    connections: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
}

impl PresenceTracker {
    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        while let Some(command) = inbox.recv().await {
            self.handle(command);
        }
        tracing::debug!("Presence tracker stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { connection, sender } => {
                self.connections.insert(connection, sender);
                tracing::debug!(connection = %connection, "PRESENCE -> CONNECT");
                self.broadcast();
            }
            Command::Online {
                connection,
                profile,
            } => {
                tracing::info!(identifier = %profile.identifier, connection = %connection, "PRESENCE -> ONLINE");
                self.entries.insert(
                    profile.identifier.clone(),
                    PresenceEntry {
                        connection,
                        profile,
                    },
                );
                self.broadcast();
            }
            Command::Offline { identifier } => {
                if self.entries.remove(&identifier).is_some() {
                    tracing::info!(identifier = %identifier, "PRESENCE -> OFFLINE");
                }
                self.broadcast();
            }
            Command::Disconnect { connection } => {
                self.connections.remove(&connection);
                // An identifier re-announced from a newer connection stays online
                self.entries
                    .retain(|_, entry| entry.connection != connection);
                tracing::debug!(connection = %connection, "PRESENCE -> DISCONNECT");
                self.broadcast();
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.online_users());
            }
        }
    }

    fn online_users(&self) -> Vec<PublicProfile> {
        let mut users: Vec<PublicProfile> = self
            .entries
            .values()
            .map(|entry| entry.profile.clone())
            .collect();
        users.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        users
    }

    /// Send the online list to every connection without waiting on slow ones
    fn broadcast(&mut self) {
        let users = self.online_users();
        self.connections.retain(|connection, sender| {
            match sender.try_send(ServerEvent::OnlineUsers(users.clone())) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection = %connection, "Presence update dropped for slow client");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}
