#![allow(dead_code)]

use letterbox_engine::cards::Card;
use letterbox_engine::deck::Deck;
use letterbox_engine::game::GameState;
use letterbox_engine::player::PlayerId;
use letterbox_engine::round::start_game_with_deck;
use letterbox_engine::rules::validate_play;
use rand::Rng;

pub fn id(s: &str) -> PlayerId {
    PlayerId::from(s)
}

/// Seat `names` (each name doubles as the player id) without starting.
pub fn table(names: &[&str]) -> GameState {
    let mut gs = GameState::new("TEST");
    for name in names {
        gs.add_player(id(name), *name).expect("seat player");
    }
    gs
}

/// Start a game whose cards come out in `draws` order: burn card, one card
/// per seat, the first player's second card, then later draws.
pub fn staged(names: &[&str], draws: &[Card]) -> GameState {
    let mut gs = table(names);
    let mut cards = draws.to_vec();
    cards.reverse();
    start_game_with_deck(&mut gs, Deck::from_cards(cards)).expect("start staged game");
    gs
}

pub fn hand(gs: &GameState, who: &str) -> Vec<Card> {
    gs.player(&id(who)).expect("player").hand().to_vec()
}

/// Every legal (card index, target, guess) for the current player.
pub fn legal_plays(gs: &GameState) -> Vec<(usize, Option<PlayerId>, Option<Card>)> {
    let Some(current) = gs.current_player() else {
        return Vec::new();
    };
    let actor = current.id().clone();
    let mut targets: Vec<Option<PlayerId>> = vec![None];
    targets.extend(gs.players().iter().map(|p| Some(p.id().clone())));
    let mut guesses: Vec<Option<Card>> = vec![None];
    guesses.extend(letterbox_engine::cards::all_cards().into_iter().map(Some));

    let mut plays = Vec::new();
    for index in 0..current.hand().len() {
        for target in &targets {
            for guess in &guesses {
                if validate_play(gs, &actor, index, target.as_ref(), *guess).is_ok() {
                    plays.push((index, target.clone(), *guess));
                }
            }
        }
    }
    plays
}

pub fn pick<R: Rng>(rng: &mut R, len: usize) -> usize {
    rng.random_range(0..len)
}
