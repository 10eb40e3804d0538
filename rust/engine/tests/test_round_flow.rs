mod helpers;

use helpers::{hand, id, staged, table};
use letterbox_engine::cards::Card::*;
use letterbox_engine::round::{play_card, start_game, RoundEndReason, TurnOutcome};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[test]
fn start_round_gives_current_player_two_cards() {
    for seed in 0..20 {
        let mut gs = table(&["a", "b", "c", "d"]);
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        start_game(&mut gs, &mut rng).expect("start");
        assert_eq!(gs.current_player_index(), 0);
        for (i, p) in gs.players().iter().enumerate() {
            let expected = if i == 0 { 2 } else { 1 };
            assert_eq!(p.hand().len(), expected);
            assert!(!p.is_eliminated());
            assert!(!p.is_protected());
        }
        assert!(gs.log().is_empty());
    }
}

#[test]
fn last_player_standing_ends_round_with_cards_left() {
    // burn Guard; a Guard, b Priest; a draws Guard; plenty left in the deck.
    let mut gs = staged(
        &["a", "b"],
        &[Guard, Guard, Priest, Guard, Baron, Handmaid, Prince, King],
    );
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let out = play_card(&mut gs, &id("a"), 0, Some(&id("b")), Some(Priest), &mut rng)
        .expect("guard play");

    match out.turn {
        TurnOutcome::RoundEnded(result) => {
            assert_eq!(result.reason, RoundEndReason::LastPlayerStanding);
            assert_eq!(result.winners, vec![id("a")]);
            assert!(result.match_winners.is_empty());
        }
        other => panic!("expected round end, got {other:?}"),
    }
    assert_eq!(gs.player(&id("a")).unwrap().tokens(), 1);
    assert_eq!(gs.player(&id("b")).unwrap().tokens(), 0);
    // New round was dealt straight away and the win survived the log reset.
    assert_eq!(gs.round(), 2);
    assert_eq!(gs.log(), ["a won the round (last player standing)."]);
    assert_eq!(hand(&gs, "a").len(), 2);
    assert_eq!(hand(&gs, "b").len(), 1);
}

#[test]
fn normal_advance_skips_eliminated_and_draws() {
    // burn Guard; a Baron, b Guard, c Prince; a draws Princess... a keeps
    // Princess and Barons b (Guard) out, turn skips to c who draws Handmaid.
    let mut gs = staged(&["a", "b", "c"], &[Guard, Baron, Guard, Prince, Princess, Handmaid]);
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let out = play_card(&mut gs, &id("a"), 0, Some(&id("b")), None, &mut rng).expect("baron");
    assert_eq!(out.effect.eliminated, vec![id("b")]);
    assert_eq!(out.turn, TurnOutcome::Next { current: 2 });
    assert_eq!(hand(&gs, "c"), vec![Prince, Handmaid]);
    assert!(hand(&gs, "b").is_empty());
}

#[test]
fn handmaid_protection_lasts_until_own_next_turn() {
    // burn Guard; a Handmaid, b Guard, c Guard; a draws Guard; then
    // b draws Priest, c draws Baron, a draws King.
    let mut gs = staged(
        &["a", "b", "c"],
        &[Guard, Handmaid, Guard, Guard, Guard, Priest, Baron, King, Prince],
    );
    let mut rng = ChaCha20Rng::seed_from_u64(5);

    play_card(&mut gs, &id("a"), 0, None, None, &mut rng).expect("handmaid");
    assert!(gs.player(&id("a")).unwrap().is_protected());

    // b cannot target a, still protected through b's and c's turns.
    let before = gs.clone();
    let err = play_card(&mut gs, &id("b"), 0, Some(&id("a")), Some(Priest), &mut rng);
    assert!(err.is_err());
    assert_eq!(gs, before);
    play_card(&mut gs, &id("b"), 1, Some(&id("c")), None, &mut rng).expect("priest on c");
    assert!(gs.player(&id("a")).unwrap().is_protected());

    play_card(&mut gs, &id("c"), 0, Some(&id("b")), Some(King), &mut rng).expect("guard on b");
    // a's turn has begun: protection cleared, a drew King.
    assert_eq!(gs.current_player().unwrap().id(), &id("a"));
    assert!(!gs.player(&id("a")).unwrap().is_protected());
    assert_eq!(hand(&gs, "a"), vec![Guard, King]);
}

#[test]
fn match_ends_when_token_target_is_reached() {
    let mut gs = table(&["a", "b"]);
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    start_game(&mut gs, &mut rng).expect("start");
    assert_eq!(gs.tokens_to_win(), 7);

    // Play random legal moves until the match is over.
    let mut plays = 0;
    while !gs.is_finished() {
        let options = helpers::legal_plays(&gs);
        assert!(!options.is_empty(), "current player must have a legal play");
        let (index, target, guess) = options[helpers::pick(&mut rng, options.len())].clone();
        let actor = gs.current_player().unwrap().id().clone();
        play_card(&mut gs, &actor, index, target.as_ref(), guess, &mut rng).expect("legal play");
        plays += 1;
        assert!(plays < 10_000, "match should finish");
    }

    let champion = gs.players().iter().filter(|p| p.tokens() >= 7).count();
    assert!(champion >= 1);
    let last = gs.log().last().expect("log line");
    assert!(last.ends_with("won the match."));

    let actor = gs.players()[gs.current_player_index()].id().clone();
    assert!(play_card(&mut gs, &actor, 0, None, None, &mut rng).is_err());
}
