use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GameError;

/// One of the eight card kinds. Each kind has a fixed value from 1 to 8,
/// and the value doubles as the card's strength in comparisons.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(into = "CardRepr", try_from = "CardRepr")]
pub enum Card {
    /// Guess another player's card to eliminate them (1)
    Guard = 1,
    /// Look at another player's card (2)
    Priest,
    /// Compare cards with another player, lower is eliminated (3)
    Baron,
    /// Protection until your next turn (4)
    Handmaid,
    /// Force a player to discard and redraw (5)
    Prince,
    /// Trade hands with another player (6)
    King,
    /// Must be discarded when held with King or Prince (7)
    Countess,
    /// Discarding her eliminates you (8)
    Princess,
}

impl Card {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Card::Guard => "Guard",
            Card::Priest => "Priest",
            Card::Baron => "Baron",
            Card::Handmaid => "Handmaid",
            Card::Prince => "Prince",
            Card::King => "King",
            Card::Countess => "Countess",
            Card::Princess => "Princess",
        }
    }

    pub fn from_value(v: u8) -> Option<Card> {
        all_cards().into_iter().find(|c| c.value() == v)
    }

    /// Number of copies of this card in a full deck.
    pub fn copies(self) -> usize {
        match self {
            Card::Guard => 5,
            Card::Priest | Card::Baron | Card::Handmaid | Card::Prince => 2,
            Card::King | Card::Countess | Card::Princess => 1,
        }
    }

    /// Whether playing this card requires naming another player.
    pub fn requires_target(self) -> bool {
        matches!(
            self,
            Card::Guard | Card::Priest | Card::Baron | Card::Prince | Card::King
        )
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Card {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_cards()
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GameError::UnknownCard(s.to_string()))
    }
}

/// Wire form of a card: `{"name": "Guard", "value": 1}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CardRepr {
    name: String,
    value: u8,
}

impl From<Card> for CardRepr {
    fn from(card: Card) -> Self {
        Self {
            name: card.name().to_string(),
            value: card.value(),
        }
    }
}

impl TryFrom<CardRepr> for Card {
    type Error = GameError;

    fn try_from(repr: CardRepr) -> Result<Self, Self::Error> {
        let card: Card = repr.name.parse()?;
        if card.value() != repr.value {
            return Err(GameError::UnknownCard(format!(
                "{} with value {}",
                repr.name, repr.value
            )));
        }
        Ok(card)
    }
}

pub fn all_cards() -> [Card; 8] {
    [
        Card::Guard,
        Card::Priest,
        Card::Baron,
        Card::Handmaid,
        Card::Prince,
        Card::King,
        Card::Countess,
        Card::Princess,
    ]
}

pub const DECK_SIZE: usize = 16;

/// The fixed 16-card multiset in canonical (unshuffled) order.
pub fn full_deck() -> Vec<Card> {
    let mut v = Vec::with_capacity(DECK_SIZE);
    for c in all_cards() {
        for _ in 0..c.copies() {
            v.push(c);
        }
    }
    v
}
