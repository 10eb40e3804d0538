#![allow(dead_code)]

use letterbox_engine::cards::{all_cards, Card};
use letterbox_engine::deck::Deck;
use letterbox_engine::game::GameState;
use letterbox_engine::player::PlayerId;
use letterbox_engine::round::start_game_with_deck;
use letterbox_engine::rules::validate_play;
use letterbox_web::events::{EventSubscription, ServerEvent};
use letterbox_web::server::AppContext;
use letterbox_web::session::{GameCode, SessionManager};
use serde_json::Value;
use std::time::Duration;
use warp::test::WsClient;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub fn id(s: &str) -> PlayerId {
    PlayerId::from(s)
}

/// Everything queued on a subscription right now.
pub fn drain(sub: &mut EventSubscription) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = sub.receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Seat `names` in a new game, one bus connection per name (the name is
/// also the connection id). The first name creates the game.
pub async fn seated(
    ctx: &AppContext,
    names: &[&str],
) -> (GameCode, Vec<EventSubscription>) {
    let sessions = ctx.sessions();
    let bus = ctx.event_bus();
    let subs: Vec<EventSubscription> = names.iter().map(|n| bus.connect(id(n))).collect();

    let code = sessions
        .create_game(&id(names[0]), names[0])
        .await
        .expect("create game");
    for name in &names[1..] {
        sessions
            .join_game(&id(name), &code, name)
            .await
            .expect("join game");
    }
    (code, subs)
}

/// Replace the live state of `code` with a started game dealt from
/// `draws`: burn card, one card per seat, the first player's second card,
/// then later draws.
pub async fn stage(sessions: &SessionManager, code: &str, draws: &[Card]) {
    let session = sessions
        .registry()
        .get(code)
        .expect("registry readable")
        .expect("session resident");
    let mut state = session.lock().await;

    let mut staged = GameState::new(code);
    for player in state.players() {
        staged
            .add_player(player.id().clone(), player.name())
            .expect("reseat player");
    }
    let mut cards = draws.to_vec();
    cards.reverse();
    start_game_with_deck(&mut staged, Deck::from_cards(cards)).expect("start staged game");
    *state = staged;
}

pub async fn snapshot(sessions: &SessionManager, code: &str) -> GameState {
    let session = sessions
        .registry()
        .get(code)
        .expect("registry readable")
        .expect("session resident");
    let state = session.lock().await;
    state.clone()
}

/// Some legal play for the current player, as wire arguments.
pub fn any_legal_play(state: &GameState) -> (PlayerId, usize, Option<String>, Option<String>) {
    let current = state.current_player().expect("current player");
    let actor = current.id().clone();

    let mut targets: Vec<Option<&PlayerId>> = vec![None];
    targets.extend(state.players().iter().map(|p| Some(p.id())));
    let mut guesses: Vec<Option<Card>> = vec![None];
    guesses.extend(all_cards().into_iter().map(Some));

    for index in 0..current.hand().len() {
        for target in &targets {
            for guess in &guesses {
                if validate_play(state, &actor, index, *target, *guess).is_ok() {
                    return (
                        actor.clone(),
                        index,
                        target.map(|t| t.to_string()),
                        guess.map(|g| g.name().to_string()),
                    );
                }
            }
        }
    }
    panic!("current player has no legal play");
}

pub async fn send_json(client: &mut WsClient, value: Value) {
    client.send_text(value.to_string()).await;
}

pub async fn recv_json(client: &mut WsClient) -> Value {
    let message = tokio::time::timeout(RECV_TIMEOUT, client.recv())
        .await
        .expect("event before timeout")
        .expect("open socket");
    let text = message.to_str().expect("text frame");
    serde_json::from_str(text).expect("event is JSON")
}

/// Skip events until one of type `kind` arrives.
pub async fn recv_type(client: &mut WsClient, kind: &str) -> Value {
    loop {
        let event = recv_json(client).await;
        if event["type"] == kind {
            return event;
        }
    }
}

/// True when nothing arrives within a short window.
pub async fn is_quiet(client: &mut WsClient) -> bool {
    tokio::time::timeout(Duration::from_millis(100), client.recv())
        .await
        .is_err()
}
