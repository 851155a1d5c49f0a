use super::*;
use serde_json::json;

fn draw(points: Vec<Point>) -> ChannelMessage {
    ChannelMessage::Draw(DrawEvent {
        room_id: Uuid::new_v4(),
        stroke_id: Uuid::new_v4(),
        from: None,
        tool: Tool::Brush,
        color: "#000000".to_owned(),
        line_width: 3.0,
        points,
    })
}

#[test]
fn join_room_uses_kebab_type_and_camel_fields() {
    let room_id = Uuid::new_v4();
    let json = serde_json::to_value(ChannelMessage::JoinRoom { room_id }).expect("serialize");
    assert_eq!(json, json!({ "type": "join-room", "roomId": room_id }));
}

#[test]
fn draw_payload_is_flat() {
    let raw = json!({
        "type": "draw",
        "roomId": Uuid::nil(),
        "strokeId": Uuid::nil(),
        "tool": "eraser",
        "color": "#fff",
        "lineWidth": 8,
        "points": [{ "x": 1, "y": 2 }]
    });
    let msg: ChannelMessage = serde_json::from_value(raw).expect("deserialize");
    let ChannelMessage::Draw(event) = msg else {
        panic!("expected draw");
    };
    assert_eq!(event.tool, Tool::Eraser);
    assert_eq!(event.from, None);
    assert_eq!(event.points, vec![Point::new(1.0, 2.0)]);
}

#[test]
fn unknown_variant_is_rejected() {
    let raw = json!({ "type": "cursor", "roomId": Uuid::nil() });
    assert!(serde_json::from_value::<ChannelMessage>(raw).is_err());
}

#[test]
fn draw_missing_points_is_rejected() {
    let raw = json!({
        "type": "draw",
        "roomId": Uuid::nil(),
        "strokeId": Uuid::nil(),
        "tool": "brush",
        "color": "#000",
        "lineWidth": 1
    });
    assert!(serde_json::from_value::<ChannelMessage>(raw).is_err());
}

#[test]
fn validate_accepts_well_formed_draw() {
    assert_eq!(draw(vec![Point::new(0.0, 0.0), Point::new(4.0, 4.0)]).validate(), Ok(()));
}

#[test]
fn validate_rejects_empty_and_oversized_draws() {
    assert_eq!(draw(vec![]).validate(), Err(MessageError::Stroke(StrokeError::NoPoints)));

    let many = vec![Point::new(1.0, 1.0); MAX_DRAW_POINTS + 1];
    assert_eq!(draw(many).validate(), Err(MessageError::TooManyPoints(MAX_DRAW_POINTS + 1)));
}

#[test]
fn non_draw_messages_always_validate() {
    let msg = ChannelMessage::LeaveRoom { room_id: Uuid::new_v4() };
    assert_eq!(msg.validate(), Ok(()));
    assert_eq!(msg.kind(), "leave-room");
}

#[test]
fn from_stroke_and_back_preserve_geometry() {
    let stroke = Stroke::new(Tool::Text, "#123456", 1.5, Point::new(3.0, 4.0));
    let event = DrawEvent::from_stroke(Uuid::new_v4(), Uuid::new_v4(), &stroke);
    assert_eq!(event.to_stroke(), stroke);
}
