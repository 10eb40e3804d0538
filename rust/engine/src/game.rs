use crate::cards::{Card, DECK_SIZE};
use crate::deck::Deck;
use crate::errors::GameError;
use crate::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// A chat line as stored in the game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub sender: String,
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Full state of one game, addressed by its code. This is also the
/// snapshot written to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    code: String,
    players: Vec<Player>,
    #[serde(default)]
    deck: Deck,
    #[serde(default)]
    burn_card: Option<Card>,
    #[serde(default)]
    current_player_index: usize,
    #[serde(default)]
    started: bool,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    round: u32,
    #[serde(default)]
    tokens_to_win: u32,
    #[serde(default)]
    log: Vec<String>,
    #[serde(default)]
    chat: Vec<ChatEntry>,
}

impl GameState {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            players: Vec::with_capacity(MAX_PLAYERS),
            deck: Deck::default(),
            burn_card: None,
            current_player_index: 0,
            started: false,
            finished: false,
            round: 0,
            tokens_to_win: 0,
            log: Vec::new(),
            chat: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
    pub fn players(&self) -> &[Player] {
        &self.players
    }
    pub fn deck(&self) -> &Deck {
        &self.deck
    }
    pub fn burn_card(&self) -> Option<Card> {
        self.burn_card
    }
    pub fn current_player_index(&self) -> usize {
        self.current_player_index
    }
    pub fn is_started(&self) -> bool {
        self.started
    }
    pub fn is_finished(&self) -> bool {
        self.finished
    }
    pub fn round(&self) -> u32 {
        self.round
    }
    pub fn tokens_to_win(&self) -> u32 {
        self.tokens_to_win
    }
    pub fn log(&self) -> &[String] {
        &self.log
    }
    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    pub fn current_player(&self) -> Option<&Player> {
        if self.started {
            self.players.get(self.current_player_index)
        } else {
            None
        }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id() == id)
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_eliminated())
    }

    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    /// Seat a new player at the end of the turn order.
    ///
    /// Re-adding an id that is already seated is a no-op so a client can
    /// retry a join. A different id using a taken name is rejected.
    pub fn add_player(&mut self, id: PlayerId, name: impl Into<String>) -> Result<(), GameError> {
        let name = name.into();
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        if self.player(&id).is_some() {
            return Ok(());
        }
        if self.players.iter().any(|p| p.name() == name) {
            return Err(GameError::NameTaken(name));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::GameFull { max: MAX_PLAYERS });
        }
        self.players.push(Player::new(id, name));
        Ok(())
    }

    pub fn push_chat(&mut self, entry: ChatEntry) {
        self.chat.push(entry);
    }

    /// Every card currently accounted for: deck, hands, burn card and
    /// discard piles. Always the full 16-card multiset once a round is dealt.
    pub fn all_cards(&self) -> Vec<Card> {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        cards.extend_from_slice(self.deck.cards());
        cards.extend(self.burn_card);
        for p in &self.players {
            cards.extend_from_slice(p.hand());
            cards.extend_from_slice(p.discarded());
        }
        cards
    }

    pub(crate) fn player_mut(&mut self, index: usize) -> &mut Player {
        &mut self.players[index]
    }
    pub(crate) fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }
    pub(crate) fn set_deck(&mut self, deck: Deck) {
        self.deck = deck;
    }
    pub(crate) fn set_burn_card(&mut self, card: Option<Card>) {
        self.burn_card = card;
    }
    pub(crate) fn set_current_player_index(&mut self, index: usize) {
        self.current_player_index = index;
    }
    pub(crate) fn mark_started(&mut self, tokens_to_win: u32) {
        self.started = true;
        self.tokens_to_win = tokens_to_win;
    }
    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }
    pub(crate) fn next_round(&mut self) {
        self.round += 1;
    }
    pub(crate) fn clear_log(&mut self) {
        self.log.clear();
    }
    pub(crate) fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }
}

/// Tokens needed to win the match for a given table size.
pub fn tokens_to_win(player_count: usize) -> u32 {
    match player_count {
        0..=2 => 7,
        3 => 5,
        _ => 4,
    }
}
