use crate::errors::ErrorResponse;
use crate::view::{GameView, PlayerView};
use letterbox_engine::cards::Card;
use letterbox_engine::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

// Bounded so a stalled client cannot grow memory; a full channel drops the
// connection instead of blocking the game.
const EVENT_CHANNEL_BUFFER: usize = 256;

pub type EventSender = mpsc::Sender<ServerEvent>;
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

/// Outbound events, one JSON text frame each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    GameCreated {
        code: String,
    },
    JoinResult {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Players {
        code: String,
        players: Vec<PlayerView>,
    },
    Chat {
        sender: String,
        message: String,
        timestamp: i64,
    },
    Start {
        state: GameView,
    },
    Update {
        state: GameView,
    },
    ErrorMsg(ErrorResponse),
    PrivateReveal {
        target_id: PlayerId,
        card: Card,
    },
    MatchWon {
        code: String,
        winner_ids: Vec<PlayerId>,
    },
    GameEnded {
        code: String,
        reason: String,
    },
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A connection's inbox. Dropping it disconnects the connection from the
/// bus and from every room it joined.
pub struct EventSubscription {
    bus: EventBus,
    connection_id: PlayerId,
    pub receiver: EventReceiver,
}

impl EventSubscription {
    pub fn connection_id(&self) -> &PlayerId {
        &self.connection_id
    }

    pub fn receiver(&mut self) -> &mut EventReceiver {
        &mut self.receiver
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.bus.disconnect(&self.connection_id);
    }
}

/// Routes events to connections, either directly or through rooms keyed by
/// game code.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    connections: RwLock<HashMap<PlayerId, EventSender>>,
    rooms: RwLock<HashMap<String, Vec<PlayerId>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, connection_id: PlayerId) -> EventSubscription {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        {
            let mut guard = self
                .inner
                .connections
                .write()
                .unwrap_or_else(|e| e.into_inner());
            guard.insert(connection_id.clone(), tx);
        }
        tracing::info!(connection_id = %connection_id, "connection registered");

        EventSubscription {
            bus: self.clone(),
            connection_id,
            receiver: rx,
        }
    }

    /// Add a connection to a room. Joining twice is a no-op.
    pub fn join_room(&self, code: &str, connection_id: &PlayerId) {
        let mut guard = self.inner.rooms.write().unwrap_or_else(|e| e.into_inner());
        let members = guard.entry(code.to_string()).or_default();
        if !members.contains(connection_id) {
            members.push(connection_id.clone());
            tracing::debug!(code = %code, connection_id = %connection_id, "joined room");
        }
    }

    pub fn send_to(&self, connection_id: &PlayerId, event: ServerEvent) {
        let sender = {
            let guard = self
                .inner
                .connections
                .read()
                .unwrap_or_else(|e| e.into_inner());
            guard.get(connection_id).cloned()
        };

        match sender {
            Some(sender) => {
                if let Err(e) = sender.try_send(event) {
                    tracing::warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "failed to deliver event, dropping connection"
                    );
                    self.disconnect(connection_id);
                }
            }
            None => {
                tracing::debug!(connection_id = %connection_id, "no such connection");
            }
        }
    }

    pub fn broadcast(&self, code: &str, event: ServerEvent) {
        self.broadcast_with(code, |_| event.clone());
    }

    /// Send each room member its own rendering of an event.
    pub fn broadcast_with<F>(&self, code: &str, render: F)
    where
        F: Fn(&PlayerId) -> ServerEvent,
    {
        let targets: Vec<(PlayerId, EventSender)> = {
            let rooms = self.inner.rooms.read().unwrap_or_else(|e| e.into_inner());
            let Some(members) = rooms.get(code) else {
                tracing::debug!(code = %code, "no subscribers for game");
                return;
            };
            let connections = self
                .inner
                .connections
                .read()
                .unwrap_or_else(|e| e.into_inner());
            members
                .iter()
                .filter_map(|id| connections.get(id).map(|tx| (id.clone(), tx.clone())))
                .collect()
        };

        tracing::trace!(code = %code, subscriber_count = targets.len(), "broadcasting");

        let mut failed = Vec::new();
        for (id, sender) in targets {
            if let Err(e) = sender.try_send(render(&id)) {
                tracing::warn!(
                    code = %code,
                    connection_id = %id,
                    error = %e,
                    "failed to send event to subscriber"
                );
                failed.push(id);
            }
        }
        for id in failed {
            self.disconnect(&id);
        }
    }

    pub fn disconnect(&self, connection_id: &PlayerId) {
        let removed = self
            .inner
            .connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(connection_id)
            .is_some();

        let mut rooms = self.inner.rooms.write().unwrap_or_else(|e| e.into_inner());
        rooms.retain(|_, members| {
            members.retain(|id| id != connection_id);
            !members.is_empty()
        });

        if removed {
            tracing::debug!(connection_id = %connection_id, "connection removed from bus");
        }
    }

    pub fn drop_room(&self, code: &str) {
        self.inner
            .rooms
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(code);
    }

    pub fn connection_count(&self) -> usize {
        self.inner
            .connections
            .read()
            .map(|g| g.len())
            .unwrap_or(0)
    }

    pub fn room_members(&self, code: &str) -> Vec<PlayerId> {
        self.inner
            .rooms
            .read()
            .map(|g| g.get(code).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}
