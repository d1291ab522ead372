// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn syndic_announcement_decodes() {
    let event: JobEvent = serde_json::from_value(json!({"syndic": ["c", "d"]})).unwrap();
    assert_eq!(
        event,
        JobEvent::Syndic { syndic: vec![AgentId::new("c"), AgentId::new("d")] }
    );
}

#[test]
fn return_event_decodes_without_out() {
    let event: JobEvent = serde_json::from_value(json!({"id": "b", "return": 7})).unwrap();
    let JobEvent::Return(ev) = event else { panic!("expected a return event") };
    assert_eq!(ev.id, "b");
    assert_eq!(ev.ret, json!(7));
    assert_eq!(ev.out, None);
}

#[test]
fn return_event_keeps_out_hint() {
    let event: JobEvent =
        serde_json::from_value(json!({"id": "b", "return": {"ok": true}, "out": "highstate"}))
            .unwrap();
    let JobEvent::Return(ev) = event else { panic!("expected a return event") };
    assert_eq!(ev.out, Some(json!("highstate")));
}

#[test]
fn envelope_flattens_event_fields() {
    let env = EventEnvelope::new(
        JobId::new("j1"),
        JobEvent::Return(ReturnEvent { id: AgentId::new("a"), ret: json!(true), out: None }),
    );
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value, json!({"jid": "j1", "id": "a", "return": true}));
    let back: EventEnvelope = serde_json::from_value(value).unwrap();
    assert_eq!(back, env);
}

#[test]
fn envelope_round_trips_syndic() {
    let env = EventEnvelope::new(
        JobId::new("j1"),
        JobEvent::Syndic { syndic: vec![AgentId::new("x")] },
    );
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value, json!({"jid": "j1", "syndic": ["x"]}));
    let back: EventEnvelope = serde_json::from_value(value).unwrap();
    assert_eq!(back, env);
}
