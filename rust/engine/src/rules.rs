use crate::cards::Card;
use crate::errors::GameError;
use crate::game::GameState;
use crate::player::PlayerId;

/// A play that passed every legality check. Indices refer to
/// [`GameState::players`] and the actor's hand at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlay {
    pub actor: usize,
    pub card_index: usize,
    pub card: Card,
    pub effect: Effect,
}

/// What the played card will do, with its target and guess already checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Guard { target: usize, guess: Card },
    Priest { target: usize },
    Baron { target: usize },
    Handmaid,
    Prince { target: usize },
    King { target: usize },
    Countess,
    Princess,
    /// A targeted card played while every opponent is protected.
    Blocked,
}

/// Checks that `actor` may play the card at `card_index` against `target`.
///
/// Nothing is mutated: on `Err` the caller must leave the state untouched,
/// and on `Ok` the returned [`ValidatedPlay`] is safe to apply.
///
/// # Errors
///
/// - [`GameError::NotStarted`] / [`GameError::MatchFinished`] outside a round
/// - [`GameError::NotInGame`], [`GameError::NotYourTurn`],
///   [`GameError::PlayerEliminated`] for the wrong actor
/// - [`GameError::InvalidCardIndex`] when the index is not in hand
/// - [`GameError::CountessMustBePlayed`] for King/Prince held with the Countess
/// - [`GameError::TargetRequired`], [`GameError::TargetNotFound`],
///   [`GameError::SelfTarget`], [`GameError::TargetEliminated`],
///   [`GameError::TargetProtected`] for illegal targets
/// - [`GameError::InvalidGuess`] for a missing Guard guess or guessing Guard
pub fn validate_play(
    state: &GameState,
    actor: &PlayerId,
    card_index: usize,
    target: Option<&PlayerId>,
    guess: Option<Card>,
) -> Result<ValidatedPlay, GameError> {
    if !state.is_started() {
        return Err(GameError::NotStarted);
    }
    if state.is_finished() {
        return Err(GameError::MatchFinished);
    }

    let actor_index = state.player_index(actor).ok_or(GameError::NotInGame)?;
    if actor_index != state.current_player_index() {
        return Err(GameError::NotYourTurn);
    }
    let player = &state.players()[actor_index];
    if player.is_eliminated() {
        return Err(GameError::PlayerEliminated);
    }

    let hand = player.hand();
    let card = *hand
        .get(card_index)
        .ok_or(GameError::InvalidCardIndex { index: card_index })?;

    let holds_countess = hand
        .iter()
        .enumerate()
        .any(|(i, c)| i != card_index && *c == Card::Countess);
    if holds_countess && matches!(card, Card::King | Card::Prince) {
        return Err(GameError::CountessMustBePlayed);
    }

    let target_index = match target {
        Some(id) if card.requires_target() => Some(check_target(state, actor_index, card, id)?),
        None if card.requires_target()
            && (card == Card::Prince || has_legal_target(state, actor_index)) =>
        {
            return Err(GameError::TargetRequired(card));
        }
        _ => None,
    };

    let effect = match (card, target_index) {
        (Card::Guard, Some(target)) => match guess {
            Some(guess) if guess != Card::Guard => Effect::Guard { target, guess },
            _ => return Err(GameError::InvalidGuess),
        },
        (Card::Priest, Some(target)) => Effect::Priest { target },
        (Card::Baron, Some(target)) => Effect::Baron { target },
        (Card::Prince, Some(target)) => Effect::Prince { target },
        (Card::King, Some(target)) => Effect::King { target },
        (Card::Handmaid, _) => Effect::Handmaid,
        (Card::Countess, _) => Effect::Countess,
        (Card::Princess, _) => Effect::Princess,
        (Card::Guard | Card::Priest | Card::Baron | Card::Prince | Card::King, None) => {
            Effect::Blocked
        }
    };

    Ok(ValidatedPlay {
        actor: actor_index,
        card_index,
        card,
        effect,
    })
}

fn check_target(
    state: &GameState,
    actor_index: usize,
    card: Card,
    id: &PlayerId,
) -> Result<usize, GameError> {
    let index = state.player_index(id).ok_or(GameError::TargetNotFound)?;
    if index == actor_index && card != Card::Prince {
        return Err(GameError::SelfTarget(card));
    }
    let target = &state.players()[index];
    if target.is_eliminated() {
        return Err(GameError::TargetEliminated(target.name().to_string()));
    }
    if target.is_protected() {
        return Err(GameError::TargetProtected(target.name().to_string()));
    }
    Ok(index)
}

/// Whether any opponent can be chosen by a targeted card.
pub fn has_legal_target(state: &GameState, actor_index: usize) -> bool {
    state
        .players()
        .iter()
        .enumerate()
        .any(|(i, p)| i != actor_index && !p.is_eliminated() && !p.is_protected())
}
