//! Client-facing projections of [`GameState`].
//!
//! Clients never receive the raw state. A [`GameView`] is rendered for one
//! recipient: their own hand is included, every other hand is reduced to a
//! count, and the deck order and burn card are never sent.

use letterbox_engine::cards::Card;
use letterbox_engine::game::{ChatEntry, GameState};
use letterbox_engine::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    /// Present only in the view rendered for this player
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    pub hand_size: usize,
    pub discarded: Vec<Card>,
    pub tokens: u32,
    pub eliminated: bool,
    pub protected: bool,
}

impl PlayerView {
    fn render(player: &Player, viewer: Option<&PlayerId>) -> Self {
        let own = viewer == Some(player.id());
        Self {
            id: player.id().clone(),
            name: player.name().to_string(),
            hand: own.then(|| player.hand().to_vec()),
            hand_size: player.hand().len(),
            discarded: player.discarded().to_vec(),
            tokens: player.tokens(),
            eliminated: player.is_eliminated(),
            protected: player.is_protected(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    pub code: String,
    pub players: Vec<PlayerView>,
    pub deck_remaining: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player_id: Option<PlayerId>,
    pub current_player_index: usize,
    pub started: bool,
    pub finished: bool,
    pub round: u32,
    pub tokens_to_win: u32,
    pub log: Vec<String>,
    pub chat: Vec<ChatEntry>,
}

impl GameView {
    /// Render for `viewer`, or for a spectator when `None`.
    pub fn render(state: &GameState, viewer: Option<&PlayerId>) -> Self {
        Self {
            code: state.code().to_string(),
            players: roster(state, viewer),
            deck_remaining: state.deck().remaining(),
            current_player_id: state
                .current_player()
                .filter(|_| !state.is_finished())
                .map(|p| p.id().clone()),
            current_player_index: state.current_player_index(),
            started: state.is_started(),
            finished: state.is_finished(),
            round: state.round(),
            tokens_to_win: state.tokens_to_win(),
            log: state.log().to_vec(),
            chat: state.chat().to_vec(),
        }
    }

    pub fn spectator(state: &GameState) -> Self {
        Self::render(state, None)
    }
}

pub fn roster(state: &GameState, viewer: Option<&PlayerId>) -> Vec<PlayerView> {
    state
        .players()
        .iter()
        .map(|p| PlayerView::render(p, viewer))
        .collect()
}
