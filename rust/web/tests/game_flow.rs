mod common;

use common::{any_legal_play, drain, id, seated, snapshot, stage};
use letterbox_engine::cards::Card;
use letterbox_engine::errors::GameError;
use letterbox_web::events::ServerEvent;
use letterbox_web::server::AppContext;
use letterbox_web::session::SessionError;

#[tokio::test]
async fn priest_reveal_is_private_and_updates_are_redacted() {
    let ctx = AppContext::new_for_tests();
    let sessions = ctx.sessions();
    let (code, mut subs) = seated(&ctx, &["a", "b", "c"]).await;
    stage(
        &sessions,
        &code,
        &[
            Card::Guard,
            Card::Priest,
            Card::Baron,
            Card::Guard,
            Card::Handmaid,
            Card::Prince,
            Card::Guard,
        ],
    )
    .await;
    for sub in subs.iter_mut() {
        drain(sub);
    }

    sessions
        .play_card(&id("a"), &code, 0, Some("b"), None)
        .await
        .expect("priest on b");

    let a_events = drain(&mut subs[0]);
    assert_eq!(
        a_events[0],
        ServerEvent::PrivateReveal {
            target_id: id("b"),
            card: Card::Baron,
        }
    );
    let ServerEvent::Update { state } = &a_events[1] else {
        panic!("expected update, got {:?}", a_events[1]);
    };
    assert_eq!(state.players[0].hand, Some(vec![Card::Handmaid]));
    assert_eq!(state.players[1].hand, None);
    assert_eq!(state.players[1].hand_size, 2);
    assert_eq!(state.current_player_id, Some(id("b")));

    for (index, sub) in subs.iter_mut().enumerate().skip(1) {
        let events = drain(sub);
        assert_eq!(events.len(), 1, "one update for seat {index}");
        let ServerEvent::Update { state } = &events[0] else {
            panic!("expected update, got {:?}", events[0]);
        };
        for (seat, player) in state.players.iter().enumerate() {
            assert_eq!(player.hand.is_some(), seat == index);
        }
        assert_eq!(state.players[0].discarded, vec![Card::Priest]);
    }

    let b_view = sessions.view(&code, Some(&id("b"))).await.expect("view");
    assert_eq!(b_view.players[1].hand, Some(vec![Card::Baron, Card::Prince]));
}

#[tokio::test]
async fn rejected_play_reaches_nobody() {
    let ctx = AppContext::new_for_tests();
    let sessions = ctx.sessions();
    let (code, mut subs) = seated(&ctx, &["a", "b"]).await;
    stage(
        &sessions,
        &code,
        &[Card::Guard, Card::Countess, Card::Guard, Card::Prince, Card::Baron],
    )
    .await;
    let before = snapshot(&sessions, &code).await;
    for sub in subs.iter_mut() {
        drain(sub);
    }

    let err = sessions
        .play_card(&id("a"), &code, 1, Some("b"), None)
        .await
        .expect_err("prince while holding the countess");
    assert!(matches!(
        err,
        SessionError::Rule(GameError::CountessMustBePlayed)
    ));
    assert_eq!(snapshot(&sessions, &code).await, before);
    assert!(subs.iter_mut().all(|sub| drain(sub).is_empty()));

    sessions
        .play_card(&id("a"), &code, 0, None, None)
        .await
        .expect("countess");
    let after = snapshot(&sessions, &code).await;
    assert_eq!(after.current_player_index(), 1);
}

#[tokio::test]
async fn guesses_are_read_by_name() {
    let ctx = AppContext::new_for_tests();
    let sessions = ctx.sessions();
    let (code, mut subs) = seated(&ctx, &["a", "b"]).await;
    stage(
        &sessions,
        &code,
        &[Card::Guard, Card::Guard, Card::King, Card::Priest, Card::Baron],
    )
    .await;

    let err = sessions
        .play_card(&id("a"), &code, 0, Some("b"), Some("Jester"))
        .await
        .expect_err("unknown card name");
    assert!(matches!(err, SessionError::Rule(GameError::UnknownCard(_))));

    drain(&mut subs[1]);
    let outcome = sessions
        .play_card(&id("a"), &code, 0, Some("b"), Some(" king "))
        .await
        .expect("correct guess");
    assert_eq!(outcome.effect.eliminated, vec![id("b")]);

    // Two players: the round is over and a new one is dealt.
    let state = snapshot(&sessions, &code).await;
    assert_eq!(state.player(&id("a")).expect("a").tokens(), 1);
    assert_eq!(state.round(), 2);
}

#[tokio::test]
async fn random_match_ends_with_one_match_won() {
    let ctx = AppContext::new_for_tests();
    let sessions = ctx.sessions();
    let (code, mut subs) = seated(&ctx, &["a", "b", "c"]).await;
    sessions.start_game(&id("a"), &code).await.expect("start");

    let mut match_won = Vec::new();
    for _ in 0..5_000 {
        let state = snapshot(&sessions, &code).await;
        if state.is_finished() {
            break;
        }
        let (actor, index, target, guess) = any_legal_play(&state);
        sessions
            .play_card(&actor, &code, index, target.as_deref(), guess.as_deref())
            .await
            .expect("legal play");

        for event in drain(&mut subs[0]) {
            if let ServerEvent::MatchWon { winner_ids, .. } = event {
                match_won.push(winner_ids);
            }
        }
        for sub in subs.iter_mut().skip(1) {
            drain(sub);
        }
    }

    let state = snapshot(&sessions, &code).await;
    assert!(state.is_finished());
    assert_eq!(match_won.len(), 1);
    for winner in &match_won[0] {
        let tokens = state.player(winner).expect("winner seated").tokens();
        assert!(tokens >= state.tokens_to_win());
    }

    let err = sessions
        .play_card(&id("a"), &code, 0, None, None)
        .await
        .expect_err("no plays after the match");
    assert!(matches!(err, SessionError::Rule(GameError::MatchFinished)));
    let view = sessions.view(&code, None).await.expect("view");
    assert!(view.finished);
    assert_eq!(view.current_player_id, None);
}
