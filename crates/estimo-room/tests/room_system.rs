//! Integration tests for the room hub, driven through its handle with
//! in-memory channels standing in for connections.

use std::time::Duration;

use estimo_protocol::{ClientEvent, JoinRequest, RoomKey, RoomView, ServerEvent};
use estimo_room::{
    ConnectionReceiver, HubHandle, RoomConfig, TracingDiagnostics, spawn_hub,
};
use estimo_transport::ConnectionId;
use serde_json::json;

// =========================================================================
// Helpers
// =========================================================================

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn hub() -> HubHandle {
    spawn_hub(RoomConfig::default(), TracingDiagnostics)
}

fn join(key: Option<&str>, username: &str) -> ClientEvent {
    ClientEvent::Join(JoinRequest {
        id: key.map(RoomKey::from),
        username: username.into(),
    })
}

async fn next_state(rx: &mut ConnectionReceiver) -> RoomView {
    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for state")
        .expect("hub dropped the channel");
    match event {
        ServerEvent::State(view) => view,
        other => panic!("expected state, got {other:?}"),
    }
}

/// Asserts nothing is queued once the hub has caught up.
async fn assert_quiet(hub: &HubHandle, rx: &mut ConnectionReceiver) {
    // A snapshot round-trip means every earlier command has been applied.
    hub.snapshot().await.unwrap();
    assert!(rx.try_recv().is_err(), "unexpected event queued");
}

fn estimates(view: &RoomView) -> Vec<serde_json::Value> {
    view.participants.iter().map(|p| p.estimate.clone()).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_join_without_key_creates_fresh_room() {
    let hub = hub();
    let mut rx1 = hub.connect(conn(1)).await.unwrap();
    let mut rx2 = hub.connect(conn(2)).await.unwrap();

    hub.dispatch(conn(1), join(None, "alice")).await.unwrap();
    hub.dispatch(conn(2), join(None, "bob")).await.unwrap();

    assert_eq!(next_state(&mut rx1).await.owner, "alice");
    assert_eq!(next_state(&mut rx2).await.owner, "bob");

    let rooms = hub.snapshot().await.unwrap();
    assert_eq!(rooms.len(), 2);
}

#[tokio::test]
async fn test_join_existing_room_keeps_owner_and_notifies_everyone() {
    let hub = hub();
    let mut rx1 = hub.connect(conn(1)).await.unwrap();
    let mut rx2 = hub.connect(conn(2)).await.unwrap();

    hub.dispatch(conn(1), join(Some("abc"), "alice")).await.unwrap();
    next_state(&mut rx1).await;
    hub.dispatch(conn(2), join(Some("abc"), "bob")).await.unwrap();

    let seen_by_alice = next_state(&mut rx1).await;
    let seen_by_bob = next_state(&mut rx2).await;
    assert_eq!(seen_by_alice, seen_by_bob);
    assert_eq!(seen_by_alice.owner, "alice");
    assert_eq!(seen_by_alice.participants.len(), 2);
}

#[tokio::test]
async fn test_planning_round_walkthrough() {
    let hub = hub();
    let mut bob = hub.connect(conn(2)).await.unwrap();
    let mut carol = hub.connect(conn(3)).await.unwrap();

    hub.dispatch(conn(2), join(Some("xyz"), "bob")).await.unwrap();
    hub.dispatch(conn(3), join(Some("xyz"), "carol")).await.unwrap();
    hub.dispatch(conn(2), ClientEvent::SetEstimate(json!("5"))).await.unwrap();
    hub.dispatch(conn(3), ClientEvent::SetEstimate(json!("8"))).await.unwrap();

    // bob sees his join, carol's join and both estimates, all masked.
    for _ in 0..4 {
        let view = next_state(&mut bob).await;
        assert!(estimates(&view).iter().all(|e| *e == json!("X")));
    }
    for _ in 0..3 {
        next_state(&mut carol).await;
    }

    hub.dispatch(conn(2), ClientEvent::FlipCards).await.unwrap();
    let revealed = next_state(&mut carol).await;
    assert_eq!(revealed.owner, "bob");
    assert_eq!(estimates(&revealed), vec![json!("5"), json!("8")]);
    assert_eq!(next_state(&mut bob).await, revealed);

    // carol cannot reset: nothing is broadcast, nothing changes.
    hub.dispatch(conn(3), ClientEvent::ResetCards).await.unwrap();
    assert_quiet(&hub, &mut bob).await;
    assert_quiet(&hub, &mut carol).await;
    let rooms = hub.snapshot().await.unwrap();
    assert!(rooms[&RoomKey::from("xyz")].flipped);

    hub.dispatch(conn(2), ClientEvent::ResetCards).await.unwrap();
    let cleared = next_state(&mut carol).await;
    assert_eq!(estimates(&cleared), vec![json!("X"), json!("X")]);
    let rooms = hub.snapshot().await.unwrap();
    let room = &rooms[&RoomKey::from("xyz")];
    assert!(!room.flipped);
    assert!(room.participants.iter().all(|p| p.estimate == json!("")));
}

#[tokio::test]
async fn test_estimate_after_flip_is_ignored() {
    let hub = hub();
    let mut rx = hub.connect(conn(1)).await.unwrap();

    hub.dispatch(conn(1), join(Some("r"), "alice")).await.unwrap();
    hub.dispatch(conn(1), ClientEvent::SetEstimate(json!(3))).await.unwrap();
    hub.dispatch(conn(1), ClientEvent::FlipCards).await.unwrap();
    for _ in 0..3 {
        next_state(&mut rx).await;
    }

    hub.dispatch(conn(1), ClientEvent::SetEstimate(json!(21))).await.unwrap();
    assert_quiet(&hub, &mut rx).await;
    let rooms = hub.snapshot().await.unwrap();
    assert_eq!(rooms[&RoomKey::from("r")].participants[0].estimate, json!(3));
}

#[tokio::test]
async fn test_actions_before_join_are_ignored() {
    let hub = hub();
    let mut rx = hub.connect(conn(1)).await.unwrap();

    hub.dispatch(conn(1), ClientEvent::SetEstimate(json!("1"))).await.unwrap();
    hub.dispatch(conn(1), ClientEvent::FlipCards).await.unwrap();
    hub.dispatch(conn(1), ClientEvent::ResetCards).await.unwrap();

    assert_quiet(&hub, &mut rx).await;
    assert!(hub.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_rooms_replies_to_caller_only() {
    let hub = hub();
    let mut member = hub.connect(conn(1)).await.unwrap();
    let mut outsider = hub.connect(conn(2)).await.unwrap();

    hub.dispatch(conn(1), join(Some("abc"), "alice")).await.unwrap();
    hub.dispatch(conn(1), ClientEvent::SetEstimate(json!("13"))).await.unwrap();
    next_state(&mut member).await;
    next_state(&mut member).await;

    hub.dispatch(conn(2), ClientEvent::GetRooms).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(1), outsider.recv())
        .await
        .unwrap()
        .unwrap();
    let ServerEvent::GetRooms(rooms) = reply else {
        panic!("expected get_rooms reply");
    };
    // Listing is unmasked.
    assert_eq!(rooms[&RoomKey::from("abc")].participants[0].estimate, json!("13"));
    assert_quiet(&hub, &mut member).await;
}

#[tokio::test]
async fn test_last_disconnect_prunes_room_silently() {
    let hub = hub();
    let mut alice = hub.connect(conn(1)).await.unwrap();
    let mut watcher = hub.connect(conn(9)).await.unwrap();

    hub.dispatch(conn(1), join(Some("abc"), "alice")).await.unwrap();
    next_state(&mut alice).await;

    hub.disconnect(conn(1)).await.unwrap();
    assert_quiet(&hub, &mut watcher).await;
    assert!(hub.snapshot().await.unwrap().is_empty());

    // The key is free again: joining it creates a new room with a new owner.
    hub.dispatch(conn(9), join(Some("abc"), "zoe")).await.unwrap();
    assert_eq!(next_state(&mut watcher).await.owner, "zoe");
}

#[tokio::test]
async fn test_disconnect_notifies_only_rooms_that_still_have_members() {
    let hub = hub();
    let mut c = hub.connect(conn(1)).await.unwrap();
    let mut b_member = hub.connect(conn(2)).await.unwrap();
    let mut other = hub.connect(conn(3)).await.unwrap();

    hub.dispatch(conn(1), join(Some("a"), "carol")).await.unwrap();
    hub.dispatch(conn(2), join(Some("b"), "bob")).await.unwrap();
    hub.dispatch(conn(1), join(Some("b"), "carol")).await.unwrap();
    hub.dispatch(conn(3), join(Some("c"), "dave")).await.unwrap();

    next_state(&mut b_member).await;
    next_state(&mut b_member).await;
    next_state(&mut other).await;
    hub.snapshot().await.unwrap();
    while c.try_recv().is_ok() {}

    hub.disconnect(conn(1)).await.unwrap();

    let view = next_state(&mut b_member).await;
    assert_eq!(view.participants.len(), 1);
    assert_eq!(view.participants[0].username, "bob");
    assert_quiet(&hub, &mut other).await;

    let rooms = hub.snapshot().await.unwrap();
    assert!(!rooms.contains_key(&RoomKey::from("a")));
    assert!(rooms.contains_key(&RoomKey::from("b")));
    assert!(rooms.contains_key(&RoomKey::from("c")));
}

#[tokio::test]
async fn test_owner_rejoining_under_same_name_regains_control() {
    let hub = hub();
    let _owner = hub.connect(conn(1)).await.unwrap();
    let _guest = hub.connect(conn(2)).await.unwrap();
    let _returning = hub.connect(conn(3)).await.unwrap();

    hub.dispatch(conn(1), join(Some("r"), "bob")).await.unwrap();
    hub.dispatch(conn(2), join(Some("r"), "carol")).await.unwrap();
    hub.disconnect(conn(1)).await.unwrap();
    hub.dispatch(conn(3), join(Some("r"), "bob")).await.unwrap();
    hub.dispatch(conn(3), ClientEvent::FlipCards).await.unwrap();

    let rooms = hub.snapshot().await.unwrap();
    assert!(rooms[&RoomKey::from("r")].flipped);
}

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let hub = hub();
    hub.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(hub.snapshot().await.is_err());
}
