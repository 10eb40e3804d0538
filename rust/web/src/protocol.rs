//! Inbound WebSocket messages.
//!
//! One JSON text frame per message, tagged by `type`:
//!
//! ```json
//! {"type": "play_card", "code": "K7QD", "card_index": 0,
//!  "target_id": "5c1f...", "guessed_card": "Priest"}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateGame {
        player_name: String,
    },
    JoinGame {
        code: String,
        player_name: String,
    },
    SendChat {
        code: String,
        message: String,
    },
    StartGame {
        code: String,
    },
    PlayCard {
        code: String,
        card_index: usize,
        #[serde(default)]
        target_id: Option<String>,
        /// Card name, case-insensitive. Only read for the Guard.
        #[serde(default)]
        guessed_card: Option<String>,
    },
}

impl ClientMessage {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CreateGame { .. } => "create_game",
            ClientMessage::JoinGame { .. } => "join_game",
            ClientMessage::SendChat { .. } => "send_chat",
            ClientMessage::StartGame { .. } => "start_game",
            ClientMessage::PlayCard { .. } => "play_card",
        }
    }
}

/// Codes are case-insensitive on input and stored upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
