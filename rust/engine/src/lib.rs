//! # letterbox-engine: Elimination Card Game Core
//!
//! Rules engine for a 16-card elimination game played by 2–4 players.
//! Each round every player holds one card, draws a second on their turn and
//! plays one of the two. The last player standing, or the highest card when
//! the deck runs out, wins a token. The first player to the token target
//! wins the match.
//!
//! ## Core Modules
//!
//! - [`cards`] - The eight card kinds and the fixed deck multiset
//! - [`deck`] - Draw pile with uniform (Fisher–Yates) shuffling via ChaCha20
//! - [`player`] - Seated player: hand, discards, tokens, round flags
//! - [`game`] - Game state for one game code, roster and chat
//! - [`rules`] - Legality checks for a card play
//! - [`effects`] - Card effect resolution
//! - [`round`] - Dealing, turn advancement, round and match end
//! - [`errors`] - Rule violation errors
//!
//! ## Quick Start
//!
//! ```rust
//! use letterbox_engine::game::GameState;
//! use letterbox_engine::player::PlayerId;
//! use letterbox_engine::round::start_game;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut state = GameState::new("ABCD");
//! state.add_player(PlayerId::from("a"), "Ann").unwrap();
//! state.add_player(PlayerId::from("b"), "Bo").unwrap();
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! start_game(&mut state, &mut rng).unwrap();
//!
//! assert_eq!(state.players()[0].hand().len(), 2);
//! assert_eq!(state.players()[1].hand().len(), 1);
//! ```
//!
//! ## Playing a Card
//!
//! Every play goes through [`round::play_card`], which validates first and
//! leaves the state untouched on error:
//!
//! ```rust
//! use letterbox_engine::cards::Card;
//! use letterbox_engine::deck::Deck;
//! use letterbox_engine::errors::GameError;
//! use letterbox_engine::game::GameState;
//! use letterbox_engine::player::PlayerId;
//! use letterbox_engine::round::{play_card, start_game_with_deck};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut state = GameState::new("ABCD");
//! state.add_player(PlayerId::from("a"), "Ann").unwrap();
//! state.add_player(PlayerId::from("b"), "Bo").unwrap();
//! // Top of the deck is the last card: burn, Ann, Bo, then Ann's draw.
//! let deck = Deck::from_cards(vec![Card::Guard, Card::Countess, Card::Baron, Card::Prince, Card::Guard]);
//! start_game_with_deck(&mut state, deck).unwrap();
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(1);
//! let before = state.clone();
//! let err = play_card(&mut state, &PlayerId::from("a"), 0, Some(&PlayerId::from("b")), None, &mut rng);
//! assert_eq!(err, Err(GameError::CountessMustBePlayed));
//! assert_eq!(state, before);
//! ```

pub mod cards;
pub mod deck;
pub mod effects;
pub mod errors;
pub mod game;
pub mod player;
pub mod round;
pub mod rules;
