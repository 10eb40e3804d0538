use crate::cards::Card;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable player identifier. The web layer uses the id of the connection
/// that created or joined the game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A seated player. Tokens persist across rounds; hand, discards and the
/// `eliminated`/`protected` flags are round-scoped and reset by
/// [`crate::round::start_round`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    hand: Vec<Card>,
    #[serde(default)]
    discarded: Vec<Card>,
    #[serde(default)]
    tokens: u32,
    #[serde(default)]
    eliminated: bool,
    #[serde(default)]
    protected: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hand: Vec::with_capacity(2),
            discarded: Vec::new(),
            tokens: 0,
            eliminated: false,
            protected: false,
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn hand(&self) -> &[Card] {
        &self.hand
    }
    pub fn discarded(&self) -> &[Card] {
        &self.discarded
    }
    pub fn tokens(&self) -> u32 {
        self.tokens
    }
    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// The single card held between turns, if any.
    pub fn held_card(&self) -> Option<Card> {
        self.hand.first().copied()
    }

    pub fn discard_total(&self) -> u32 {
        self.discarded.iter().map(|c| u32::from(c.value())).sum()
    }

    pub(crate) fn reset_for_round(&mut self) {
        self.hand.clear();
        self.discarded.clear();
        self.eliminated = false;
        self.protected = false;
    }

    pub(crate) fn give_card(&mut self, c: Card) {
        self.hand.push(c);
    }

    pub(crate) fn take_card(&mut self, index: usize) -> Option<Card> {
        if index < self.hand.len() {
            Some(self.hand.remove(index))
        } else {
            None
        }
    }

    pub(crate) fn push_discard(&mut self, c: Card) {
        self.discarded.push(c);
    }

    pub(crate) fn replace_hand(&mut self, hand: Vec<Card>) -> Vec<Card> {
        std::mem::replace(&mut self.hand, hand)
    }

    pub(crate) fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
    }

    /// Knock the player out of the round; whatever they still hold is
    /// discarded face up.
    pub(crate) fn eliminate(&mut self) {
        self.eliminated = true;
        self.protected = false;
        let hand = std::mem::take(&mut self.hand);
        self.discarded.extend(hand);
    }

    pub(crate) fn award_token(&mut self) {
        self.tokens = self.tokens.saturating_add(1);
    }
}
