use thiserror::Error;

use crate::cards::Card;

/// Rule violations. Every variant is raised before any state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Game has not started")]
    NotStarted,
    #[error("Game already started")]
    AlreadyStarted,
    #[error("Match is over")]
    MatchFinished,
    #[error("Need at least {min} players to start (have {actual})")]
    NotEnoughPlayers { min: usize, actual: usize },
    #[error("Game is full ({max} players)")]
    GameFull { max: usize },
    #[error("Name `{0}` is already taken in this game")]
    NameTaken(String),
    #[error("Player not in game")]
    NotInGame,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("You are eliminated")]
    PlayerEliminated,
    #[error("Invalid card index: {index}")]
    InvalidCardIndex { index: usize },
    #[error("Rule: If you hold the Countess with King/Prince, you must discard the Countess")]
    CountessMustBePlayed,
    #[error("{0} requires a target")]
    TargetRequired(Card),
    #[error("Target not found")]
    TargetNotFound,
    #[error("{0} is protected by Handmaid")]
    TargetProtected(String),
    #[error("{0} is already eliminated")]
    TargetEliminated(String),
    #[error("{0} cannot target yourself")]
    SelfTarget(Card),
    #[error("Invalid guess for Guard")]
    InvalidGuess,
    #[error("Unknown card: {0}")]
    UnknownCard(String),
}
