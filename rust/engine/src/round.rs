use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::deck::Deck;
use crate::effects::{self, EffectOutcome};
use crate::errors::GameError;
use crate::game::{tokens_to_win, GameState, MIN_PLAYERS};
use crate::player::PlayerId;
use crate::rules::validate_play;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEndReason {
    /// Everyone else was eliminated
    LastPlayerStanding,
    /// The deck ran out and hands were compared
    DeckExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u32,
    pub winners: Vec<PlayerId>,
    pub reason: RoundEndReason,
    /// Non-empty once someone reached the token target; no new round is dealt.
    pub match_winners: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn passed to the player at this index, who has drawn.
    Next { current: usize },
    RoundEnded(RoundResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub card: Card,
    pub effect: EffectOutcome,
    pub turn: TurnOutcome,
}

/// Start the match and deal the first round from a shuffled deck.
pub fn start_game<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> Result<(), GameError> {
    begin_match(state)?;
    start_round(state, rng);
    Ok(())
}

/// Like [`start_game`] but deals from `deck` as given (top card last).
pub fn start_game_with_deck(state: &mut GameState, deck: Deck) -> Result<(), GameError> {
    begin_match(state)?;
    start_round_with_deck(state, deck);
    Ok(())
}

fn begin_match(state: &mut GameState) -> Result<(), GameError> {
    if state.is_started() {
        return Err(GameError::AlreadyStarted);
    }
    let count = state.players().len();
    if count < MIN_PLAYERS {
        return Err(GameError::NotEnoughPlayers {
            min: MIN_PLAYERS,
            actual: count,
        });
    }
    state.mark_started(tokens_to_win(count));
    Ok(())
}

pub fn start_round<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) {
    start_round_with_deck(state, Deck::shuffled(rng));
}

/// Deal a new round: burn one card, one card to each player in seat order,
/// reset round flags, then the first player draws their second card.
pub fn start_round_with_deck(state: &mut GameState, deck: Deck) {
    state.set_deck(deck);
    let burn = state.deck_mut().draw();
    state.set_burn_card(burn);

    for i in 0..state.players().len() {
        let card = state.deck_mut().draw();
        let player = state.player_mut(i);
        player.reset_for_round();
        if let Some(c) = card {
            player.give_card(c);
        }
    }

    state.set_current_player_index(0);
    state.clear_log();
    state.next_round();

    if let Some(c) = state.deck_mut().draw() {
        state.player_mut(0).give_card(c);
    }
}

/// Validate and apply one card play, then advance the turn.
///
/// On `Err` the state is exactly as it was before the call.
pub fn play_card<R: Rng + ?Sized>(
    state: &mut GameState,
    actor: &PlayerId,
    card_index: usize,
    target: Option<&PlayerId>,
    guess: Option<Card>,
    rng: &mut R,
) -> Result<PlayOutcome, GameError> {
    let play = validate_play(state, actor, card_index, target, guess)?;

    let player = state.player_mut(play.actor);
    let card = player
        .take_card(play.card_index)
        .ok_or(GameError::InvalidCardIndex { index: card_index })?;
    player.push_discard(card);
    let line = format!("{} played {}.", player.name(), card);
    state.push_log(line);

    let effect = effects::resolve(state, &play);
    let turn = advance_turn(state, rng);

    Ok(PlayOutcome { card, effect, turn })
}

/// Runs after every applied play. Round end takes priority over passing
/// the turn: last player standing first, then deck exhaustion.
pub fn advance_turn<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> TurnOutcome {
    let active: Vec<usize> = state
        .players()
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_eliminated())
        .map(|(i, _)| i)
        .collect();

    if active.len() <= 1 {
        return finish_round(state, rng, active, RoundEndReason::LastPlayerStanding);
    }

    if state.deck().is_empty() {
        let winners = showdown_winners(state, &active);
        return finish_round(state, rng, winners, RoundEndReason::DeckExhausted);
    }

    let count = state.players().len();
    let mut next = state.current_player_index();
    loop {
        next = (next + 1) % count;
        if !state.players()[next].is_eliminated() {
            break;
        }
    }

    state.set_current_player_index(next);
    let drawn = state.deck_mut().draw();
    let player = state.player_mut(next);
    player.set_protected(false);
    if let Some(c) = drawn {
        player.give_card(c);
    }

    TurnOutcome::Next { current: next }
}

/// Highest held card wins. Equal cards are split by the larger total of
/// cards discarded this round; players still tied all win.
fn showdown_winners(state: &GameState, active: &[usize]) -> Vec<usize> {
    let holding: Vec<(usize, u8, u32)> = active
        .iter()
        .filter_map(|&i| {
            let p = &state.players()[i];
            p.held_card().map(|c| (i, c.value(), p.discard_total()))
        })
        .collect();

    let best = holding.iter().map(|&(_, v, d)| (v, d)).max();
    match best {
        Some(best) => holding
            .into_iter()
            .filter(|&(_, v, d)| (v, d) == best)
            .map(|(i, _, _)| i)
            .collect(),
        None => Vec::new(),
    }
}

fn finish_round<R: Rng + ?Sized>(
    state: &mut GameState,
    rng: &mut R,
    winners: Vec<usize>,
    reason: RoundEndReason,
) -> TurnOutcome {
    for &i in &winners {
        state.player_mut(i).award_token();
    }

    let names: Vec<String> = winners
        .iter()
        .map(|&i| state.players()[i].name().to_string())
        .collect();
    let who = if names.is_empty() {
        "No one".to_string()
    } else {
        names.join(" and ")
    };
    let line = match reason {
        RoundEndReason::LastPlayerStanding => {
            format!("{who} won the round (last player standing).")
        }
        RoundEndReason::DeckExhausted => {
            format!("{who} won the round (highest card when deck empty).")
        }
    };
    state.push_log(line.clone());

    let round = state.round();
    let winner_ids: Vec<PlayerId> = winners
        .iter()
        .map(|&i| state.players()[i].id().clone())
        .collect();

    let target = state.tokens_to_win();
    let match_winners: Vec<PlayerId> = if target > 0 {
        state
            .players()
            .iter()
            .filter(|p| p.tokens() >= target)
            .map(|p| p.id().clone())
            .collect()
    } else {
        Vec::new()
    };

    if match_winners.is_empty() {
        start_round(state, rng);
        state.push_log(line);
    } else {
        state.mark_finished();
        state.push_log(format!("{who} won the match."));
    }

    TurnOutcome::RoundEnded(RoundResult {
        round,
        winners: winner_ids,
        reason,
        match_winners,
    })
}
