use chrono::{Datelike, Timelike};
use groupwatch_shared::*;
use serde_json::{self as json, Value};

fn parse(json_str: &str) -> Value {
    json::from_str(json_str).expect("valid json")
}

#[test]
fn new_message_event_keeps_type_and_full_payload() {
    let text = r#"{
        "type": "new_message",
        "message": {
            "id": "3EB0C767D26A1D0B",
            "group_name": "Weekend Runners",
            "sender_name": "Amina",
            "sender_phone": "254700000001",
            "content": "See you at 7",
            "timestamp": "2024-05-04T06:15:00"
        }
    }"#;

    let envelope = RealtimeEnvelope::parse(text).expect("parse");
    assert_eq!(envelope.event_type, "new_message");
    assert_eq!(envelope.payload, parse(text));

    match envelope.event {
        RealtimeEvent::NewMessage { message } => {
            assert_eq!(message.id, "3EB0C767D26A1D0B");
            assert_eq!(message.group_id, None);
            assert_eq!(message.timestamp.hour(), 6);
        }
        other => panic!("expected NewMessage, got {other:?}"),
    }
}

#[test]
fn member_events_parse_from_realtime_payload() {
    let text = r#"{
        "type": "member_leave",
        "event": {
            "id": 812,
            "group_id": 4,
            "group_name": "Weekend Runners",
            "member_name": "Brian",
            "member_phone": null,
            "event_type": "LEAVE",
            "event_date": "2024-05-04",
            "timestamp": "2024-05-04T08:00:00"
        }
    }"#;

    let envelope = RealtimeEnvelope::parse(text).expect("parse");
    assert_eq!(envelope.event.group_id(), Some(4));
    match envelope.event {
        RealtimeEvent::MemberLeave { event } => {
            assert_eq!(event.event_type, MemberEventType::Leave);
            assert_eq!(event.event_date.day(), 4);
            assert!(event.whatsapp_group_id.is_empty());
        }
        other => panic!("expected MemberLeave, got {other:?}"),
    }
}

#[test]
fn ready_event_reads_camel_case_phone_number() {
    let envelope = RealtimeEnvelope::parse(r#"{"type":"ready","phoneNumber":"254711111111"}"#)
        .expect("parse");
    assert_eq!(
        envelope.event,
        RealtimeEvent::Ready { phone_number: Some("254711111111".into()) }
    );
}

#[test]
fn task_events_are_flattened_into_their_variant() {
    let progress = RealtimeEnvelope::parse(
        r#"{"type":"broadcast_progress","message_id":9,"group_name":"Choir","groups_sent":2,"total_groups":5}"#,
    )
    .expect("parse");
    assert!(progress.event.is_progress());
    assert_eq!(
        progress.event,
        RealtimeEvent::BroadcastProgress(TaskProgress {
            message_id: Some(9),
            group_name: Some("Choir".into()),
            groups_sent: 2,
            total_groups: 5,
        })
    );

    let complete = RealtimeEnvelope::parse(
        r#"{"type":"immediate_settings_complete","action":"close","groups_success":3,"groups_failed":1,"errors":["Choir: not admin"]}"#,
    )
    .expect("parse");
    match complete.event {
        RealtimeEvent::ImmediateSettingsComplete(done) => {
            assert_eq!(done.action, "close");
            assert_eq!(done.task_id, None);
            assert_eq!(done.errors, Some(vec!["Choir: not admin".to_string()]));
        }
        other => panic!("expected ImmediateSettingsComplete, got {other:?}"),
    }
}

#[test]
fn unknown_type_is_not_an_error() {
    let envelope =
        RealtimeEnvelope::parse(r#"{"type":"typing","who":"someone"}"#).expect("parse");
    assert_eq!(envelope.event_type, "typing");
    assert_eq!(envelope.event, RealtimeEvent::Unknown);
}

#[test]
fn malformed_frames_are_rejected() {
    assert!(matches!(
        RealtimeEnvelope::parse("{not json"),
        Err(ProtocolError::InvalidJson(_))
    ));
    assert_eq!(
        RealtimeEnvelope::parse(r#"{"message":{}}"#),
        Err(ProtocolError::MissingType)
    );
    assert!(matches!(
        RealtimeEnvelope::parse(r#"{"type":"new_message"}"#),
        Err(ProtocolError::InvalidPayload { .. })
    ));
}

#[test]
fn broadcast_request_omits_unset_optionals() {
    let req = BroadcastRequest {
        content: "Meeting moved to 6pm".into(),
        group_ids: vec![1, 2],
        mention_type: MentionType::All,
        ..Default::default()
    };
    let v = parse(&json::to_string(&req).expect("serialize"));
    assert_eq!(v["mention_type"], "all");
    assert!(v.get("mention_ids").is_none());
    assert!(v.get("scheduled_at").is_none());
}

#[test]
fn certificate_summary_splits_group_names() {
    let summary: CertificateSummary = json::from_str(
        r#"{"summary":[{"member_name":"Amina","member_phone":"2547","certificate_count":3,"groups":"Choir, Weekend Runners"}],
            "total_certificates":3,"unique_members":1,"period_start":null,"period_end":null}"#,
    )
    .expect("deserialize");
    assert_eq!(summary.summary[0].group_names(), vec!["Choir", "Weekend Runners"]);
}

#[test]
fn scheduled_task_rows_default_missing_counters() {
    let task: BroadcastTask = json::from_str(
        r#"{"id":4,"task_type":"poll","content":"Lunch?","group_names":["Choir"],"mention_type":"none",
            "scheduled_at":"2024-06-01T10:00:00","status":"pending","created_at":"2024-05-30T09:00:00",
            "poll_options":["Rice","Chapati"]}"#,
    )
    .expect("deserialize");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.groups_sent, 0);
    assert_eq!(task.poll_options.as_ref().map(Vec::len), Some(2));
}
