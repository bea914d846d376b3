//! Integration tests for the room system: registry, actors and routing.
//!
//! Room actors dispatch events before replying, so once an awaited call
//! returns its events are already queued and `try_recv` sees them.

use std::sync::Arc;
use std::time::Duration;

use strikeball_protocol::{
    Channel, ConnectionStatus, CreateRoomRequest, ErrorCode, FinishReason, GameStatus,
    JoinRoomRequest, ReconnectToken, RoomCode, ServerEvent, SessionId,
};
use strikeball_room::{
    PlayerIntent, RegistryConfig, RoomError, RoomOutbound, RoomRegistry,
};
use strikeball_session::Attachment;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

type Rx = mpsc::UnboundedReceiver<RoomOutbound>;

fn registry() -> RoomRegistry {
    RoomRegistry::new(RegistryConfig::default())
}

fn create_request(digits: u32) -> CreateRoomRequest {
    CreateRoomRequest {
        nickname: Some("Alice".into()),
        digits: Some(digits),
        allow_zero: Some(false),
        allow_duplicate: Some(false),
    }
}

fn join_request(room_code: &RoomCode) -> JoinRoomRequest {
    JoinRoomRequest {
        room_code: room_code.clone(),
        nickname: Some("Bob".into()),
    }
}

/// Collects everything queued on a receiver.
fn drain(rx: &mut Rx) -> Vec<RoomOutbound> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn kinds(messages: &[RoomOutbound]) -> Vec<&'static str> {
    messages.iter().map(|m| m.event.kind()).collect()
}

struct Table {
    room_code: RoomCode,
    creator: SessionId,
    creator_token: ReconnectToken,
    joiner: SessionId,
    joiner_token: ReconnectToken,
    creator_rx: Rx,
    joiner_rx: Rx,
}

/// Creates a 3-digit room, seats both players and attaches both, then
/// discards the setup traffic.
async fn seated(reg: &RoomRegistry) -> Table {
    let created = reg.create_room(&create_request(3)).unwrap();
    let joined = reg.join_room(&join_request(&created.room_code)).await.unwrap();

    let (ctx, mut creator_rx) = mpsc::unbounded_channel();
    let (jtx, mut joiner_rx) = mpsc::unbounded_channel();
    reg.attach(&created.session_id, Some(&created.reconnect_token), ctx)
        .await
        .unwrap();
    reg.attach(&joined.session_id, Some(&joined.reconnect_token), jtx)
        .await
        .unwrap();
    drain(&mut creator_rx);
    drain(&mut joiner_rx);

    Table {
        room_code: created.room_code,
        creator: created.session_id,
        creator_token: created.reconnect_token,
        joiner: joined.session_id,
        joiner_token: joined.reconnect_token,
        creator_rx,
        joiner_rx,
    }
}

async fn intent(
    reg: &RoomRegistry,
    session_id: &SessionId,
    intent: PlayerIntent,
) -> Result<(), RoomError> {
    reg.handle_for_session(session_id)?
        .intent(session_id.clone(), intent)
        .await
}

/// Drives a seated table into IN_PROGRESS with secrets "123" (creator)
/// and "456" (joiner).
async fn start_game(reg: &RoomRegistry, t: &mut Table) {
    intent(reg, &t.creator, PlayerIntent::SetReady(true)).await.unwrap();
    intent(reg, &t.joiner, PlayerIntent::SetReady(true)).await.unwrap();
    intent(reg, &t.creator, PlayerIntent::SetAnswer("123".into())).await.unwrap();
    intent(reg, &t.joiner, PlayerIntent::SetAnswer("456".into())).await.unwrap();
    drain(&mut t.creator_rx);
    drain(&mut t.joiner_rx);
}

// =========================================================================
// create_room()
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_code_session_and_settings() {
    let reg = registry();

    let created = reg.create_room(&create_request(4)).unwrap();

    assert_eq!(created.room_code.as_str().len(), 6);
    assert_eq!(created.session_id.as_str().len(), 32);
    assert_eq!(created.settings.digits, 4);
    assert!(!created.settings.allow_zero);
    assert_eq!(reg.room_count(), 1);
    assert!(reg.lookup(&created.room_code).is_some());
}

#[tokio::test]
async fn test_create_room_codes_never_collide() {
    let reg = registry();

    for _ in 0..50 {
        reg.create_room(&create_request(3)).unwrap();
    }

    let mut codes = reg.room_codes();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 50);
}

#[tokio::test]
async fn test_create_room_bad_digits_returns_invalid_configuration() {
    let reg = registry();

    let err = reg.create_room(&create_request(6)).unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
    assert_eq!(reg.room_count(), 0);
    assert_eq!(reg.session_count(), 0);
}

#[tokio::test]
async fn test_create_room_bad_nickname_returns_invalid_nickname() {
    let reg = registry();
    let request = CreateRoomRequest {
        nickname: Some("no_underscores".into()),
        ..create_request(3)
    };

    let err = reg.create_room(&request).unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidNickname);
}

// =========================================================================
// join_room()
// =========================================================================

#[tokio::test]
async fn test_join_room_success_reports_waiting_for_ready() {
    let reg = registry();
    let created = reg.create_room(&create_request(5)).unwrap();

    let joined = reg.join_room(&join_request(&created.room_code)).await.unwrap();

    assert_eq!(joined.room_code, created.room_code);
    assert_eq!(joined.status, GameStatus::WaitingForReady);
    assert_eq!(joined.settings, created.settings);
    assert_ne!(joined.session_id, created.session_id);
}

#[tokio::test]
async fn test_join_room_unknown_code_returns_room_not_found() {
    let reg = registry();

    let err = reg
        .join_room(&join_request(&"ZZZZZZ".parse().unwrap()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::RoomNotFound);
}

#[tokio::test]
async fn test_join_room_twice_returns_room_full_and_issues_no_session() {
    let reg = registry();
    let created = reg.create_room(&create_request(3)).unwrap();
    reg.join_room(&join_request(&created.room_code)).await.unwrap();

    let err = reg
        .join_room(&join_request(&created.room_code))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::RoomFull);
    assert_eq!(reg.session_count(), 2);
}

#[tokio::test]
async fn test_join_room_after_start_returns_room_closed() {
    let reg = registry();
    let mut t = seated(&reg).await;
    start_game(&reg, &mut t).await;

    let err = reg.join_room(&join_request(&t.room_code)).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::RoomClosed);
}

#[tokio::test]
async fn test_join_room_concurrent_joins_admit_exactly_one() {
    let reg = Arc::new(registry());
    let room_code = reg.create_room(&create_request(3)).unwrap().room_code;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let reg = Arc::clone(&reg);
        let request = join_request(&room_code);
        tasks.push(tokio::spawn(async move {
            reg.join_room(&request).await
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(reg.session_count(), 2);
}

// =========================================================================
// attach() / routing
// =========================================================================

#[tokio::test]
async fn test_attach_sends_personal_snapshot_then_presence() {
    let reg = registry();
    let created = reg.create_room(&create_request(3)).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let attachment = reg
        .attach(&created.session_id, Some(&created.reconnect_token), tx)
        .await
        .unwrap();

    assert_eq!(attachment.status, ConnectionStatus::Connected);
    let messages = drain(&mut rx);
    assert_eq!(kinds(&messages), vec!["STATE_CHANGE", "PLAYER_CONNECTED"]);
    assert_eq!(
        messages[0].channel,
        Channel::Session(created.session_id.clone())
    );
    assert_eq!(messages[1].channel, Channel::Room(created.room_code.clone()));
}

#[tokio::test]
async fn test_creator_sees_state_change_when_joiner_arrives() {
    let reg = registry();
    let created = reg.create_room(&create_request(3)).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    reg.attach(&created.session_id, Some(&created.reconnect_token), tx)
        .await
        .unwrap();
    drain(&mut rx);

    reg.join_room(&join_request(&created.room_code)).await.unwrap();

    let messages = drain(&mut rx);
    assert_eq!(kinds(&messages), vec!["STATE_CHANGE"]);
    match &messages[0].event {
        ServerEvent::StateChange(sc) => assert_eq!(sc.status, GameStatus::WaitingForReady),
        other => panic!("expected StateChange, got {other:?}"),
    }
}

#[tokio::test]
async fn test_attach_unknown_session_returns_unknown_session() {
    let reg = registry();
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = reg
        .attach(&SessionId::new("ghost"), Some(&ReconnectToken::new("t")), tx)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::UnknownSession);
}

#[tokio::test]
async fn test_attach_with_opponent_token_is_refused_and_keeps_routing() {
    let reg = registry();
    let mut t = seated(&reg).await;
    let (tx, mut intruder_rx) = mpsc::unbounded_channel();

    let err = reg
        .attach(&t.joiner, Some(&t.creator_token), tx.clone())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownSession);

    let err = reg.attach(&t.joiner, None, tx).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownSession);

    // The joiner's own connection still receives its events.
    intent(&reg, &t.joiner, PlayerIntent::GetStatus).await.unwrap();
    assert_eq!(kinds(&drain(&mut t.joiner_rx)), vec!["GAME_STATUS"]);
    assert!(drain(&mut intruder_rx).is_empty());
}

#[tokio::test]
async fn test_is_current_tracks_newest_attach() {
    let reg = registry();
    let t = seated(&reg).await;
    let first = reg
        .attach(&t.creator, Some(&t.creator_token), mpsc::unbounded_channel().0)
        .await
        .unwrap();

    let second = reg
        .attach(&t.creator, Some(&t.creator_token), mpsc::unbounded_channel().0)
        .await
        .unwrap();

    assert!(!reg.is_current(&t.creator, first.generation));
    assert!(reg.is_current(&t.creator, second.generation));
}

// =========================================================================
// Intents through the actor
// =========================================================================

#[tokio::test]
async fn test_full_game_creator_guesses_joiner_secret_and_wins() {
    let reg = registry();
    let mut t = seated(&reg).await;
    start_game(&reg, &mut t).await;

    intent(&reg, &t.creator, PlayerIntent::SubmitGuess("456".into()))
        .await
        .unwrap();

    for rx in [&mut t.creator_rx, &mut t.joiner_rx] {
        let messages = drain(rx);
        assert_eq!(
            kinds(&messages),
            vec!["NEW_GUESS", "STATE_CHANGE", "GAME_FINISHED"]
        );
        match &messages[0].event {
            ServerEvent::NewGuess(g) => assert_eq!(g.result, "3S"),
            other => panic!("expected NewGuess, got {other:?}"),
        }
        match &messages[2].event {
            ServerEvent::GameFinished(f) => {
                assert_eq!(f.winner, Some(t.creator.clone()));
                assert_eq!(f.reason, FinishReason::Win);
            }
            other => panic!("expected GameFinished, got {other:?}"),
        }
        assert!(messages.iter().all(|m| m.channel == Channel::Room(t.room_code.clone())));
    }
}

#[tokio::test]
async fn test_rejected_intent_reaches_only_submitter() {
    let reg = registry();
    let mut t = seated(&reg).await;
    start_game(&reg, &mut t).await;

    let err = intent(&reg, &t.joiner, PlayerIntent::SubmitGuess("123".into()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::NotYourTurn);
    let joiner_messages = drain(&mut t.joiner_rx);
    assert_eq!(kinds(&joiner_messages), vec!["ERROR"]);
    assert_eq!(joiner_messages[0].channel, Channel::Session(t.joiner.clone()));
    assert!(drain(&mut t.creator_rx).is_empty());
}

#[tokio::test]
async fn test_get_status_replies_point_to_point() {
    let reg = registry();
    let mut t = seated(&reg).await;

    intent(&reg, &t.joiner, PlayerIntent::GetStatus).await.unwrap();

    let messages = drain(&mut t.joiner_rx);
    assert_eq!(kinds(&messages), vec!["GAME_STATUS"]);
    match &messages[0].event {
        ServerEvent::GameStatus(info) => {
            assert_eq!(info.status, GameStatus::WaitingForReady);
            assert_eq!(info.turn_count, 0);
        }
        other => panic!("expected GameStatus, got {other:?}"),
    }
    assert!(drain(&mut t.creator_rx).is_empty());
}

#[tokio::test]
async fn test_answer_set_never_carries_secret() {
    let reg = registry();
    let mut t = seated(&reg).await;
    intent(&reg, &t.creator, PlayerIntent::SetReady(true)).await.unwrap();
    intent(&reg, &t.joiner, PlayerIntent::SetReady(true)).await.unwrap();
    drain(&mut t.joiner_rx);

    intent(&reg, &t.creator, PlayerIntent::SetAnswer("987".into()))
        .await
        .unwrap();

    let messages = drain(&mut t.joiner_rx);
    assert_eq!(kinds(&messages), vec!["ANSWER_SET"]);
    let json = serde_json::to_string(&messages[0].event).unwrap();
    assert!(!json.contains("987"));
}

// =========================================================================
// detach() / leave()
// =========================================================================

#[tokio::test]
async fn test_detach_announces_disconnect_to_opponent() {
    let reg = registry();
    let created = reg.create_room(&create_request(3)).unwrap();
    let joined = reg.join_room(&join_request(&created.room_code)).await.unwrap();
    let (ctx, mut creator_rx) = mpsc::unbounded_channel();
    let (jtx, _joiner_rx) = mpsc::unbounded_channel();
    reg.attach(&created.session_id, Some(&created.reconnect_token), ctx)
        .await
        .unwrap();
    let joiner_attachment = reg
        .attach(&joined.session_id, Some(&joined.reconnect_token), jtx)
        .await
        .unwrap();
    drain(&mut creator_rx);

    reg.detach(&joined.session_id, joiner_attachment.generation)
        .await
        .unwrap();

    let messages = drain(&mut creator_rx);
    assert_eq!(kinds(&messages), vec!["PLAYER_DISCONNECTED"]);
    match &messages[0].event {
        ServerEvent::PlayerDisconnected(p) => {
            assert_eq!(p.nickname, "Bob");
            assert!(!p.connected);
            assert_eq!(p.connection_status, ConnectionStatus::Disconnected);
        }
        other => panic!("expected PlayerDisconnected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_detach_stale_generation_is_silent() {
    let reg = registry();
    let mut t = seated(&reg).await;

    // The joiner reconnects on a second connection.
    let (tx, mut new_rx) = mpsc::unbounded_channel();
    let second = reg
        .attach(&t.joiner, Some(&t.joiner_token), tx)
        .await
        .unwrap();
    assert_eq!(second.status, ConnectionStatus::Reconnected);
    drain(&mut t.creator_rx);
    drain(&mut new_rx);

    // The first connection closes late.
    reg.detach(&t.joiner, second.generation - 1).await.unwrap();

    assert!(drain(&mut t.creator_rx).is_empty());

    // The player is still reachable on the new connection.
    intent(&reg, &t.joiner, PlayerIntent::GetStatus).await.unwrap();
    assert_eq!(kinds(&drain(&mut new_rx)), vec!["GAME_STATUS"]);
}

#[tokio::test]
async fn test_room_actor_ignores_attach_older_than_current_route() {
    let reg = registry();
    let mut t = seated(&reg).await;
    let handle = reg.lookup(&t.room_code).unwrap();
    let (late_tx, mut late_rx) = mpsc::unbounded_channel();

    // The creator's route is generation 1; a delayed generation 0 arrives.
    let stale = Attachment {
        generation: 0,
        status: ConnectionStatus::Reconnected,
    };
    handle.attach(t.creator.clone(), stale, late_tx).await.unwrap();
    handle.detach(t.creator.clone(), 0).await.unwrap();

    intent(&reg, &t.creator, PlayerIntent::GetStatus).await.unwrap();
    assert_eq!(kinds(&drain(&mut t.creator_rx)), vec!["GAME_STATUS"]);
    assert!(drain(&mut late_rx).is_empty());
    assert!(drain(&mut t.joiner_rx).is_empty());
}

#[tokio::test]
async fn test_disconnect_does_not_change_game_status() {
    let reg = registry();
    let mut t = seated(&reg).await;
    start_game(&reg, &mut t).await;
    let generation = reg
        .attach(&t.joiner, Some(&t.joiner_token), mpsc::unbounded_channel().0)
        .await
        .unwrap()
        .generation;

    reg.detach(&t.joiner, generation).await.unwrap();

    let info = reg.lookup(&t.room_code).unwrap().info().await.unwrap();
    assert_eq!(info.status, GameStatus::InProgress);
    assert_eq!(info.connected, 1);
}

#[tokio::test]
async fn test_leave_by_both_players_removes_room() {
    let reg = registry();
    let mut t = seated(&reg).await;

    reg.leave(&t.creator).await.unwrap();

    assert_eq!(kinds(&drain(&mut t.joiner_rx)), vec!["PLAYER_DISCONNECTED"]);
    assert_eq!(reg.room_count(), 1);

    reg.leave(&t.joiner).await.unwrap();

    assert_eq!(reg.room_count(), 0);
    assert_eq!(reg.session_count(), 0);
    assert!(reg.handle_for_session(&t.creator).is_err());
}

// =========================================================================
// remove() / reap()
// =========================================================================

#[tokio::test]
async fn test_remove_unknown_room_returns_room_not_found() {
    let reg = registry();

    let err = reg.remove(&"ABCDEF".parse().unwrap()).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::RoomNotFound);
}

#[tokio::test]
async fn test_removed_room_code_can_no_longer_be_joined() {
    let reg = registry();
    let created = reg.create_room(&create_request(3)).unwrap();

    reg.remove(&created.room_code).await.unwrap();

    let err = reg
        .join_room(&join_request(&created.room_code))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RoomNotFound);
}

#[tokio::test]
async fn test_reap_in_flight_leaves_registry_usable() {
    let reg = registry();
    let t = seated(&reg).await;

    let reap = reg.reap();
    tokio::pin!(reap);
    // The pass is now waiting on the room actor.
    assert!(futures_util::poll!(reap.as_mut()).is_pending());

    let created = reg.create_room(&create_request(4)).unwrap();
    assert!(reg.lookup(&created.room_code).is_some());
    assert!(reg.handle_for_session(&t.creator).is_ok());

    assert!(reap.await.is_empty());
    assert_eq!(reg.room_count(), 2);
}

#[tokio::test]
async fn test_reap_fresh_rooms_keeps_them() {
    let reg = registry();
    seated(&reg).await;

    let reaped = reg.reap().await;

    assert!(reaped.is_empty());
    assert_eq!(reg.room_count(), 1);
}

#[tokio::test]
async fn test_reap_idle_game_times_out_without_winner() {
    let reg = RoomRegistry::new(RegistryConfig {
        idle_timeout: Duration::ZERO,
        ..RegistryConfig::default()
    });
    let mut t = seated(&reg).await;
    start_game(&reg, &mut t).await;

    let reaped = reg.reap().await;

    assert_eq!(reaped, vec![t.room_code.clone()]);
    for rx in [&mut t.creator_rx, &mut t.joiner_rx] {
        let messages = drain(rx);
        assert_eq!(kinds(&messages), vec!["STATE_CHANGE", "GAME_FINISHED"]);
        match &messages[1].event {
            ServerEvent::GameFinished(f) => {
                assert_eq!(f.winner, None);
                assert_eq!(f.reason, FinishReason::Timeout);
                assert_eq!(f.creator_answer.as_deref(), Some("123"));
            }
            other => panic!("expected GameFinished, got {other:?}"),
        }
    }
    assert_eq!(reg.room_count(), 0);
    assert_eq!(reg.session_count(), 0);
}

#[tokio::test]
async fn test_reap_finished_room_after_ttl() {
    let reg = RoomRegistry::new(RegistryConfig {
        finished_ttl: Duration::ZERO,
        ..RegistryConfig::default()
    });
    let mut t = seated(&reg).await;
    let other = reg.create_room(&create_request(4)).unwrap();
    start_game(&reg, &mut t).await;
    intent(&reg, &t.creator, PlayerIntent::SubmitGuess("456".into()))
        .await
        .unwrap();
    drain(&mut t.creator_rx);

    let reaped = reg.reap().await;

    // Finished rooms carry no second GAME_FINISHED; the waiting room stays.
    assert_eq!(reaped, vec![t.room_code.clone()]);
    assert!(drain(&mut t.creator_rx).is_empty());
    assert!(reg.lookup(&other.room_code).is_some());
}

#[tokio::test]
async fn test_reap_room_without_connections_after_absent_timeout() {
    let reg = RoomRegistry::new(RegistryConfig {
        absent_timeout: Duration::ZERO,
        ..RegistryConfig::default()
    });
    let abandoned = reg.create_room(&create_request(3)).unwrap();
    let attended = reg.create_room(&create_request(3)).unwrap();
    reg.attach(
        &attended.session_id,
        Some(&attended.reconnect_token),
        mpsc::unbounded_channel().0,
    )
    .await
    .unwrap();

    let reaped = reg.reap().await;

    assert_eq!(reaped, vec![abandoned.room_code]);
    assert!(reg.lookup(&attended.room_code).is_some());
}
