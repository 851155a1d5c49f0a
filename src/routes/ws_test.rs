use frames::{DrawEvent, Point, Stroke, Tool};
use futures::{SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::*;
use crate::model::Whiteboard;
use crate::state::test_helpers::{self, member_count, seed_user, seed_whiteboard};

async fn assert_channel_has_message(rx: &mut mpsc::Receiver<ChannelMessage>) -> ChannelMessage {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("message receive timed out")
        .expect("channel closed")
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<ChannelMessage>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}

fn draw_event(room_id: Uuid) -> DrawEvent {
    let mut stroke = Stroke::new(Tool::Brush, "#336699", 4.0, Point::new(10.0, 10.0));
    stroke.points.push(Point::new(20.0, 15.0));
    DrawEvent::from_stroke(room_id, Uuid::new_v4(), &stroke)
}

fn session(user_id: Uuid) -> (Session, mpsc::Receiver<ChannelMessage>) {
    let (tx, rx) = mpsc::channel(16);
    (Session::new(Uuid::new_v4(), user_id, tx), rx)
}

fn error_code(replies: &[ChannelMessage]) -> Option<&str> {
    match replies {
        [ChannelMessage::Error { code, .. }] => Some(code.as_str()),
        _ => None,
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn join_replies_with_peer_count() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let owner = seed_user(&store, "owner").await;
    let wb = seed_whiteboard(&state, owner.id, vec![]).await;
    let (mut a, _rx_a) = session(owner.id);
    let (mut b, _rx_b) = session(owner.id);

    let join = encode_message(&ChannelMessage::JoinRoom { room_id: wb.id });
    assert_eq!(
        process_inbound_bytes(&state, &mut a, &join).await,
        vec![ChannelMessage::Joined { room_id: wb.id, peers: 1 }]
    );
    assert_eq!(
        process_inbound_bytes(&state, &mut b, &join).await,
        vec![ChannelMessage::Joined { room_id: wb.id, peers: 2 }]
    );
    assert_eq!(a.current_room, Some(wb.id));
}

#[tokio::test]
async fn draw_is_relayed_to_peers_without_echo() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let owner = seed_user(&store, "owner").await;
    let wb = seed_whiteboard(&state, owner.id, vec![]).await;
    let (mut a, mut rx_a) = session(owner.id);
    let (mut b, mut rx_b) = session(owner.id);
    let join = encode_message(&ChannelMessage::JoinRoom { room_id: wb.id });
    process_inbound_bytes(&state, &mut a, &join).await;
    process_inbound_bytes(&state, &mut b, &join).await;

    let event = draw_event(wb.id);
    let replies = process_inbound_bytes(&state, &mut a, &encode_message(&ChannelMessage::Draw(event.clone()))).await;
    assert!(replies.is_empty());

    let relayed = assert_channel_has_message(&mut rx_b).await;
    assert_eq!(relayed, ChannelMessage::Draw(event.with_from(a.client_id)));
    assert_channel_empty(&mut rx_a).await;
}

#[tokio::test]
async fn json_text_frames_are_accepted() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let owner = seed_user(&store, "owner").await;
    let wb = seed_whiteboard(&state, owner.id, vec![]).await;
    let (mut a, _rx) = session(owner.id);

    let text = format!(r#"{{"type":"join-room","roomId":"{}"}}"#, wb.id);
    assert_eq!(
        process_inbound_text(&state, &mut a, &text).await,
        vec![ChannelMessage::Joined { room_id: wb.id, peers: 1 }]
    );
}

#[tokio::test]
async fn draw_without_join_is_rejected() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let owner = seed_user(&store, "owner").await;
    let wb = seed_whiteboard(&state, owner.id, vec![]).await;
    let (mut a, _rx) = session(owner.id);

    let replies = process_inbound_bytes(&state, &mut a, &encode_message(&ChannelMessage::Draw(draw_event(wb.id)))).await;
    assert_eq!(error_code(&replies), Some("E_NOT_IN_ROOM"));
}

#[tokio::test]
async fn malformed_and_invalid_messages_get_error_replies() {
    let state = test_helpers::test_app_state();
    let (mut a, _rx) = session(Uuid::new_v4());

    let replies = process_inbound_bytes(&state, &mut a, &[0xff, 0x01, 0x02]).await;
    assert_eq!(error_code(&replies), Some("E_MALFORMED_MESSAGE"));

    let replies = process_inbound_text(&state, &mut a, "{\"type\":\"draw\"").await;
    assert_eq!(error_code(&replies), Some("E_MALFORMED_MESSAGE"));

    let mut bad = draw_event(Uuid::new_v4());
    bad.color = "not-a-color".into();
    let replies = process_inbound_bytes(&state, &mut a, &encode_message(&ChannelMessage::Draw(bad))).await;
    assert_eq!(error_code(&replies), Some("E_INVALID_STROKE"));

    let replies = process_inbound_text(&state, &mut a, r#"{"type":"error","code":"E_X","message":"x"}"#).await;
    assert_eq!(error_code(&replies), Some("E_UNEXPECTED_MESSAGE"));
}

#[tokio::test]
async fn join_private_board_is_denied() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let owner = seed_user(&store, "owner").await;
    let stranger = seed_user(&store, "stranger").await;
    let wb = seed_whiteboard(&state, owner.id, vec![]).await;
    let (mut s, _rx) = session(stranger.id);

    let replies = process_inbound_bytes(&state, &mut s, &encode_message(&ChannelMessage::JoinRoom { room_id: wb.id })).await;
    assert_eq!(error_code(&replies), Some("E_ACCESS_DENIED"));
    assert_eq!(s.current_room, None);
}

#[tokio::test]
async fn switching_rooms_parts_the_previous_one() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let owner = seed_user(&store, "owner").await;
    let first = seed_whiteboard(&state, owner.id, vec![]).await;
    let second = seed_whiteboard(&state, owner.id, vec![]).await;
    let (mut a, _rx_a) = session(owner.id);
    let (mut watcher, mut rx_watcher) = session(owner.id);

    process_inbound_bytes(&state, &mut watcher, &encode_message(&ChannelMessage::JoinRoom { room_id: first.id })).await;
    process_inbound_bytes(&state, &mut a, &encode_message(&ChannelMessage::JoinRoom { room_id: first.id })).await;
    process_inbound_bytes(&state, &mut a, &encode_message(&ChannelMessage::JoinRoom { room_id: second.id })).await;

    assert_eq!(a.current_room, Some(second.id));
    assert_eq!(member_count(&state, first.id).await, 1);
    assert_eq!(
        assert_channel_has_message(&mut rx_watcher).await,
        ChannelMessage::PeerLeft { room_id: first.id, peer: a.client_id }
    );
}

#[tokio::test]
async fn leave_room_is_idempotent() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let owner = seed_user(&store, "owner").await;
    let wb = seed_whiteboard(&state, owner.id, vec![]).await;
    let (mut a, _rx) = session(owner.id);
    let leave = encode_message(&ChannelMessage::LeaveRoom { room_id: wb.id });

    process_inbound_bytes(&state, &mut a, &encode_message(&ChannelMessage::JoinRoom { room_id: wb.id })).await;
    assert!(process_inbound_bytes(&state, &mut a, &leave).await.is_empty());
    assert!(process_inbound_bytes(&state, &mut a, &leave).await.is_empty());
    assert_eq!(a.current_room, None);
    assert_eq!(member_count(&state, wb.id).await, 0);
}

// =============================================================================
// END TO END
// =============================================================================

async fn spawn_server(state: AppState) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, crate::routes::app(state)).await.expect("serve");
    });
    addr
}

async fn next_message<S>(stream: &mut S) -> ChannelMessage
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("ws receive timed out")
            .expect("ws stream ended")
            .expect("ws error");
        match frame {
            WsMessage::Binary(bytes) => return decode_message(&bytes).expect("decode"),
            WsMessage::Text(text) => return serde_json::from_str(text.as_str()).expect("json"),
            _ => {}
        }
    }
}

#[tokio::test]
async fn two_peers_draw_over_real_sockets() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let mut wb = Whiteboard::new("Shared sketch", alice.id, false);
    wb.collaborators.push(bob.id);
    state.store.insert_whiteboard(&wb).await.expect("insert");
    let addr = spawn_server(state).await;

    let (mut ws_a, _) = connect_async(format!("ws://{addr}/api/ws?token=tok-alice")).await.expect("connect a");
    let (mut ws_b, _) = connect_async(format!("ws://{addr}/api/ws?token=tok-bob")).await.expect("connect b");

    let join = encode_message(&ChannelMessage::JoinRoom { room_id: wb.id });
    ws_a.send(WsMessage::Binary(join.clone().into())).await.expect("send");
    assert_eq!(next_message(&mut ws_a).await, ChannelMessage::Joined { room_id: wb.id, peers: 1 });
    ws_b.send(WsMessage::Binary(join.into())).await.expect("send");
    assert_eq!(next_message(&mut ws_b).await, ChannelMessage::Joined { room_id: wb.id, peers: 2 });

    let event = draw_event(wb.id);
    ws_a.send(WsMessage::Binary(encode_message(&ChannelMessage::Draw(event.clone())).into()))
        .await
        .expect("send");

    let ChannelMessage::Draw(received) = next_message(&mut ws_b).await else {
        panic!("expected a draw event");
    };
    assert_eq!(received.stroke_id, event.stroke_id);
    assert_eq!(received.points, event.points);
    assert!(received.from.is_some());

    assert!(
        timeout(Duration::from_millis(150), ws_a.next()).await.is_err(),
        "sender must not receive its own stroke"
    );
}

#[tokio::test]
async fn upgrade_without_valid_token_is_refused() {
    let state = test_helpers::test_app_state();
    let addr = spawn_server(state).await;

    assert!(connect_async(format!("ws://{addr}/api/ws?token=bogus")).await.is_err());
    assert!(connect_async(format!("ws://{addr}/api/ws")).await.is_err());
}
