//! WebSocket handler for presence
//!
//! WebSocket URL: ws(s)://{host}/presence

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::protocol::{ClientEvent, ConnectionId, ServerEvent};
use super::tracker::{PresenceError, PresenceHandle};

/// Channel buffer size for outgoing messages
const OUTGOING_BUFFER_SIZE: usize = 64;

/// Create the presence router
pub fn presence_router(presence: PresenceHandle) -> Router {
    Router::new()
        .route("/presence", get(ws_handler))
        .with_state(presence)
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(presence): State<PresenceHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, presence))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, presence: PresenceHandle) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Create channel for sending messages to this client
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTGOING_BUFFER_SIZE);

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize presence event: {}", e);
                }
            }
        }
    });

    let connection = match presence.connect(tx.clone()).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Presence connection refused: {}", e);
            send_task.abort();
            return;
        }
    };

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let text_str: &str = &text;
                match serde_json::from_str::<ClientEvent>(text_str) {
                    Ok(event) => {
                        if let Err(e) = handle_event(&presence, connection, event).await {
                            tracing::error!("Error handling presence event: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(connection = %connection, "Invalid presence event: {}", e);
                        let _ = tx
                            .send(ServerEvent::error(format!("Invalid event format: {}", e)))
                            .await;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection = %connection, "Client closed connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(connection = %connection, "WebSocket error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = presence.disconnect(connection).await {
        tracing::error!("Failed to release presence connection: {}", e);
    }

    send_task.abort();
}

/// Apply one client event to the tracker
async fn handle_event(
    presence: &PresenceHandle,
    connection: ConnectionId,
    event: ClientEvent,
) -> Result<(), PresenceError> {
    match event {
        ClientEvent::Online(profile) => presence.online(connection, profile).await,
        ClientEvent::Offline(identifier) => presence.offline(identifier).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message as ClientMessage;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
    use tower::ServiceExt;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Serve the presence router on an ephemeral port and return its URL
    async fn serve(presence: PresenceHandle) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, presence_router(presence).into_make_service())
                .await
                .unwrap();
        });
        format!("ws://{addr}/presence")
    }

    async fn open_client(url: &str) -> Client {
        let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        client
    }

    async fn announce(client: &mut Client, identifier: &str) {
        let frame = json!({
            "event": "online",
            "data": {"identifier": identifier, "role": "technician", "isOnline": true}
        });
        client
            .send(ClientMessage::text(frame.to_string()))
            .await
            .unwrap();
    }

    /// Next JSON event from the server, failing after a second of silence
    async fn next_event(client: &mut Client) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(1), client.next())
                .await
                .expect("no presence event within a second")
                .expect("socket closed")
                .unwrap();
            if let ClientMessage::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// Read until an online list with exactly `expected` arrives; returns
    /// every event seen on the way
    async fn wait_for_list(client: &mut Client, expected: &[&str]) -> Vec<Value> {
        let mut seen = Vec::new();
        loop {
            let event = next_event(client).await;
            let done = event["event"] == "online users"
                && event["data"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|user| user["identifier"].as_str().unwrap())
                    .collect::<Vec<_>>()
                    == expected;
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    #[tokio::test]
    async fn test_closed_socket_drops_its_user_from_broadcast() {
        let url = serve(PresenceHandle::spawn()).await;
        let mut a = open_client(&url).await;
        let mut b = open_client(&url).await;

        announce(&mut a, "A").await;
        wait_for_list(&mut b, &["A"]).await;
        announce(&mut b, "B").await;
        wait_for_list(&mut b, &["A", "B"]).await;

        // No offline event, the socket just goes away
        drop(a);
        wait_for_list(&mut b, &["B"]).await;
    }

    #[tokio::test]
    async fn test_garbage_frame_answered_on_sender_only() {
        let url = serve(PresenceHandle::spawn()).await;
        let mut a = open_client(&url).await;
        let mut b = open_client(&url).await;
        wait_for_list(&mut b, &[]).await;

        a.send(ClientMessage::text("not json")).await.unwrap();
        let error = loop {
            let event = next_event(&mut a).await;
            if event["event"] == "error" {
                break event;
            }
        };
        assert!(
            error["data"]["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid event format")
        );

        // The connection survives and B sees the next change without any error
        announce(&mut a, "A").await;
        let seen = wait_for_list(&mut b, &["A"]).await;
        assert!(seen.iter().all(|event| event["event"] != "error"));
    }

    #[tokio::test]
    async fn test_handle_event_online_then_offline() {
        let presence = PresenceHandle::spawn();
        let (tx, _rx) = mpsc::channel(16);
        let connection = presence.connect(tx).await.unwrap();

        let online: ClientEvent = serde_json::from_value(json!({
            "event": "online",
            "data": {"identifier": "001", "role": "technician"}
        }))
        .unwrap();
        handle_event(&presence, connection, online).await.unwrap();
        assert_eq!(presence.snapshot().await.unwrap().len(), 1);

        let offline = ClientEvent::Offline("001".to_string());
        handle_event(&presence, connection, offline).await.unwrap();
        assert!(presence.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plain_get_is_not_upgraded() {
        let app = presence_router(PresenceHandle::spawn());

        let request = Request::builder()
            .uri("/presence")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }
}
