mod common;

use common::{is_quiet, recv_json, recv_type, send_json};
use letterbox_web::server::{AppContext, WebServer};
use serde_json::json;
use warp::ws::Message;

#[tokio::test]
async fn create_join_start_over_websocket() {
    let ctx = AppContext::new_for_tests();
    let filter = WebServer::filter(&ctx);

    let mut host = warp::test::ws()
        .path("/ws")
        .handshake(filter.clone())
        .await
        .expect("host handshake");
    let mut guest = warp::test::ws()
        .path("/ws")
        .handshake(filter)
        .await
        .expect("guest handshake");

    send_json(&mut host, json!({"type": "create_game", "player_name": "Ada"})).await;
    let created = recv_json(&mut host).await;
    assert_eq!(created["type"], "game_created");
    let code = created["code"].as_str().expect("code").to_string();
    assert_eq!(code.len(), 4);
    let roster = recv_type(&mut host, "players").await;
    assert_eq!(roster["players"].as_array().expect("players").len(), 1);

    send_json(
        &mut guest,
        json!({"type": "join_game", "code": code.to_lowercase(), "player_name": "Grace"}),
    )
    .await;
    let joined = recv_json(&mut guest).await;
    assert_eq!(joined["type"], "join_result");
    assert_eq!(joined["ok"], true);
    let roster = recv_type(&mut host, "players").await;
    let names: Vec<&str> = roster["players"]
        .as_array()
        .expect("players")
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);

    send_json(&mut guest, json!({"type": "start_game", "code": code})).await;
    let start = recv_type(&mut host, "start").await;
    assert_eq!(start["state"]["started"], true);
    assert_eq!(start["state"]["round"], 1);
    let update = recv_json(&mut host).await;
    assert_eq!(update["type"], "update");

    // Seat 0 opens the round holding two cards; only they see them.
    let host_view = &update["state"]["players"];
    assert_eq!(host_view[0]["hand"].as_array().expect("own hand").len(), 2);
    assert!(host_view[1].get("hand").is_none());
    assert_eq!(host_view[1]["hand_size"], 1);

    let guest_update = recv_type(&mut guest, "update").await;
    let guest_view = &guest_update["state"]["players"];
    assert!(guest_view[0].get("hand").is_none());
    assert_eq!(guest_view[1]["hand"].as_array().expect("own hand").len(), 1);
    assert!(guest_update["state"].get("deck").is_none());
    assert!(guest_update["state"].get("burn_card").is_none());

    send_json(
        &mut guest,
        json!({"type": "play_card", "code": code, "card_index": 0}),
    )
    .await;
    let rejected = recv_json(&mut guest).await;
    assert_eq!(rejected["type"], "error_msg");
    assert_eq!(rejected["error"], "invalid_action");
    assert!(is_quiet(&mut host).await);
}

#[tokio::test]
async fn bad_frames_and_unknown_codes_are_answered() {
    let ctx = AppContext::new_for_tests();
    let mut client = warp::test::ws()
        .path("/ws")
        .handshake(WebServer::filter(&ctx))
        .await
        .expect("handshake");

    client.send_text("definitely not json").await;
    let error = recv_json(&mut client).await;
    assert_eq!(error["type"], "error_msg");
    assert_eq!(error["error"], "invalid_message");

    send_json(&mut client, json!({"type": "fold", "code": "ABCD"})).await;
    let error = recv_json(&mut client).await;
    assert_eq!(error["error"], "invalid_message");

    send_json(
        &mut client,
        json!({"type": "join_game", "code": "ZZZZ", "player_name": "Ada"}),
    )
    .await;
    let joined = recv_json(&mut client).await;
    assert_eq!(joined["type"], "join_result");
    assert_eq!(joined["ok"], false);
    assert!(joined["message"].as_str().expect("reason").contains("ZZZZ"));

    send_json(&mut client, json!({"type": "start_game", "code": "ZZZZ"})).await;
    let error = recv_json(&mut client).await;
    assert_eq!(error["error"], "game_not_found");
}

#[tokio::test]
async fn chat_reaches_the_room() {
    let ctx = AppContext::new_for_tests();
    let filter = WebServer::filter(&ctx);
    let mut host = warp::test::ws()
        .path("/ws")
        .handshake(filter.clone())
        .await
        .expect("host handshake");
    let mut outsider = warp::test::ws()
        .path("/ws")
        .handshake(filter)
        .await
        .expect("outsider handshake");

    send_json(&mut host, json!({"type": "create_game", "player_name": "Ada"})).await;
    let code = recv_json(&mut host).await["code"]
        .as_str()
        .expect("code")
        .to_string();
    recv_type(&mut host, "players").await;

    send_json(
        &mut outsider,
        json!({"type": "send_chat", "code": code, "message": "let me in"}),
    )
    .await;
    assert!(is_quiet(&mut host).await);

    send_json(
        &mut host,
        json!({"type": "send_chat", "code": code, "message": "hello"}),
    )
    .await;
    let chat = recv_json(&mut host).await;
    assert_eq!(chat["type"], "chat");
    assert_eq!(chat["sender"], "Ada");
    assert_eq!(chat["message"], "hello");
    assert!(chat["timestamp"].as_i64().expect("timestamp") > 0);
    assert!(is_quiet(&mut outsider).await);
}

#[tokio::test]
async fn closed_socket_leaves_the_bus() {
    let ctx = AppContext::new_for_tests();
    let bus = ctx.event_bus();
    let mut client = warp::test::ws()
        .path("/ws")
        .handshake(WebServer::filter(&ctx))
        .await
        .expect("handshake");

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(bus.connection_count(), 1);

    client.send(Message::close()).await;
    drop(client);
    for _ in 0..50 {
        if bus.connection_count() == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(bus.connection_count(), 0);
}
