//! WebSocket endpoint: one task per connection.
//!
//! Inbound frames are parsed into [`ClientMessage`] and handled in arrival
//! order. Outbound events come from the connection's [`EventBus`] inbox and
//! are written by a separate sender task, so a slow socket never blocks a
//! game action.

use crate::errors::{ErrorResponse, IntoErrorResponse};
use crate::events::{EventBus, ServerEvent};
use crate::protocol::ClientMessage;
use crate::session::SessionManager;
use futures_util::{SinkExt, StreamExt};
use letterbox_engine::player::PlayerId;
use std::sync::Arc;
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

pub async fn handle_socket(
    socket: WebSocket,
    sessions: Arc<SessionManager>,
    event_bus: Arc<EventBus>,
) {
    let connection = PlayerId::new(Uuid::new_v4().to_string());
    let mut subscription = event_bus.connect(connection.clone());
    let (mut ws_tx, mut ws_rx) = socket.split();

    let sender_task = tokio::spawn(async move {
        while let Some(event) = subscription.receiver().recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize event");
                    continue;
                }
            };
            if ws_tx.send(Message::text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = ws_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(player_id = %connection, error = %e, "websocket error");
                break;
            }
        };
        if frame.is_close() {
            break;
        }
        // Ping, pong and binary frames carry no game messages.
        let Ok(text) = frame.to_str() else {
            continue;
        };

        match ClientMessage::from_json(text) {
            Ok(message) => dispatch(&sessions, &event_bus, &connection, message).await,
            Err(e) => {
                tracing::debug!(player_id = %connection, error = %e, "unparseable message");
                event_bus.send_to(
                    &connection,
                    ServerEvent::ErrorMsg(ErrorResponse::new(
                        "invalid_message",
                        "Invalid message format",
                    )),
                );
            }
        }
    }

    event_bus.disconnect(&connection);
    sessions.disconnect(&connection);
    sender_task.abort();
}

/// Run one client message. Failures go back to the sender only: a failed
/// join as `join_result`, anything else as `error_msg`.
pub async fn dispatch(
    sessions: &SessionManager,
    event_bus: &EventBus,
    connection: &PlayerId,
    message: ClientMessage,
) {
    let kind = message.kind();
    tracing::debug!(player_id = %connection, message = kind, "client message");

    let result = match message {
        ClientMessage::CreateGame { player_name } => sessions
            .create_game(connection, &player_name)
            .await
            .map(|_| ()),
        ClientMessage::JoinGame { code, player_name } => {
            if let Err(err) = sessions.join_game(connection, &code, &player_name).await {
                let response = err.report();
                event_bus.send_to(
                    connection,
                    ServerEvent::JoinResult {
                        ok: false,
                        message: Some(response.message),
                    },
                );
            }
            return;
        }
        ClientMessage::SendChat { code, message } => {
            sessions.send_chat(connection, &code, &message).await
        }
        ClientMessage::StartGame { code } => sessions.start_game(connection, &code).await,
        ClientMessage::PlayCard {
            code,
            card_index,
            target_id,
            guessed_card,
        } => sessions
            .play_card(
                connection,
                &code,
                card_index,
                target_id.as_deref(),
                guessed_card.as_deref(),
            )
            .await
            .map(|_| ()),
    };

    if let Err(err) = result {
        event_bus.send_to(connection, ServerEvent::ErrorMsg(err.report()));
    }
}
