//! Card effect resolution.
//!
//! [`resolve`] applies the effect of a card that has already been validated
//! by [`crate::rules::validate_play`] and moved from the actor's hand onto
//! their discard pile. It never fails: every precondition was checked
//! before the card left the hand.

use std::cmp::Ordering;

use crate::cards::Card;
use crate::game::GameState;
use crate::player::PlayerId;
use crate::rules::{Effect, ValidatedPlay};

/// Information that must reach exactly one player (Priest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateReveal {
    pub viewer: PlayerId,
    pub target: PlayerId,
    pub card: Card,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectOutcome {
    pub reveal: Option<PrivateReveal>,
    /// Players knocked out by this effect, in the order it happened
    pub eliminated: Vec<PlayerId>,
}

pub fn resolve(state: &mut GameState, play: &ValidatedPlay) -> EffectOutcome {
    let mut outcome = EffectOutcome::default();
    let actor = play.actor;
    let actor_name = state.players()[actor].name().to_string();

    match play.effect {
        Effect::Guard { target, guess } => {
            let target_name = state.players()[target].name().to_string();
            if state.players()[target].held_card() == Some(guess) {
                eliminate(state, target, &mut outcome);
                state.push_log(format!(
                    "{actor_name} guessed {guess} correctly, {target_name} is eliminated."
                ));
            } else {
                state.push_log(format!(
                    "{actor_name} guessed {guess} for {target_name}, wrong."
                ));
            }
        }
        Effect::Priest { target } => {
            let viewed = &state.players()[target];
            let target_name = viewed.name().to_string();
            if let Some(card) = viewed.held_card() {
                outcome.reveal = Some(PrivateReveal {
                    viewer: state.players()[actor].id().clone(),
                    target: viewed.id().clone(),
                    card,
                });
            }
            state.push_log(format!("{actor_name} used Priest on {target_name}."));
        }
        Effect::Baron { target } => {
            let target_name = state.players()[target].name().to_string();
            let mine = state.players()[actor].held_card();
            let theirs = state.players()[target].held_card();
            match (mine, theirs) {
                (Some(m), Some(o)) => match m.value().cmp(&o.value()) {
                    Ordering::Greater => {
                        eliminate(state, target, &mut outcome);
                        state.push_log(format!(
                            "{actor_name} ({m}) beat {target_name} ({o})."
                        ));
                    }
                    Ordering::Less => {
                        eliminate(state, actor, &mut outcome);
                        state.push_log(format!(
                            "{target_name} ({o}) beat {actor_name} ({m})."
                        ));
                    }
                    Ordering::Equal => {
                        state.push_log(format!("{actor_name} and {target_name} tied with {m}."));
                    }
                },
                _ => {
                    state.push_log(format!(
                        "{actor_name} and {target_name} had nothing to compare."
                    ));
                }
            }
        }
        Effect::Handmaid => {
            state.player_mut(actor).set_protected(true);
            state.push_log(format!("{actor_name} is protected until their next turn."));
        }
        Effect::Prince { target } => {
            let target_name = state.players()[target].name().to_string();
            let discarded = state.player_mut(target).take_card(0);
            if let Some(card) = discarded {
                state.player_mut(target).push_discard(card);
                state.push_log(format!("{target_name} discarded {card} due to Prince."));
            }
            if discarded == Some(Card::Princess) {
                eliminate(state, target, &mut outcome);
                state.push_log(format!(
                    "{target_name} discarded the Princess and was eliminated."
                ));
            } else if let Some(card) = state.deck_mut().draw() {
                state.player_mut(target).give_card(card);
            } else {
                state.push_log(format!(
                    "The deck is empty; {target_name} draws nothing."
                ));
            }
        }
        Effect::King { target } => {
            let target_name = state.players()[target].name().to_string();
            let mine = state.player_mut(actor).replace_hand(Vec::new());
            let theirs = state.player_mut(target).replace_hand(mine);
            state.player_mut(actor).replace_hand(theirs);
            state.push_log(format!("{actor_name} swapped hands with {target_name}."));
        }
        Effect::Countess => {
            state.push_log(format!("{actor_name} discarded the Countess."));
        }
        Effect::Princess => {
            eliminate(state, actor, &mut outcome);
            state.push_log(format!(
                "{actor_name} discarded the Princess and was eliminated."
            ));
        }
        Effect::Blocked => {
            state.push_log(format!(
                "{actor_name}'s {} had no effect: every other player is protected.",
                play.card
            ));
        }
    }

    outcome
}

fn eliminate(state: &mut GameState, index: usize, outcome: &mut EffectOutcome) {
    let player = state.player_mut(index);
    if !player.is_eliminated() {
        player.eliminate();
        outcome.eliminated.push(player.id().clone());
    }
}
