//! Realtime push protocol: JSON objects discriminated by a `type` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MemberEvent, TaskStatus};
use crate::time;

/// Listener key matching every event type.
pub const WILDCARD: &str = "*";

/// `new_message` payload. A subset of [`crate::Message`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveMessage {
    pub id: String,
    /// Present on newer backends; used to scope cache invalidation.
    #[serde(default)]
    pub group_id: Option<i64>,
    pub group_name: String,
    pub sender_name: String,
    #[serde(default)]
    pub sender_phone: Option<String>,
    pub content: String,
    #[serde(with = "time")]
    pub timestamp: DateTime<Utc>,
}

/// Progress of a broadcast/poll task fanning out over several groups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskProgress {
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub groups_sent: u32,
    #[serde(default)]
    pub total_groups: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskComplete {
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub groups_sent: u32,
    #[serde(default)]
    pub groups_failed: u32,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Progress of an open/close group settings change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SettingsProgress {
    /// Absent for immediate (manual) changes.
    #[serde(default)]
    pub task_id: Option<i64>,
    pub action: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub groups_done: u32,
    #[serde(default)]
    pub total_groups: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsComplete {
    #[serde(default)]
    pub task_id: Option<i64>,
    pub action: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub groups_success: u32,
    #[serde(default)]
    pub groups_failed: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// Every server-initiated event the dashboard understands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    // WhatsApp session lifecycle
    Qr {
        #[serde(default)]
        qr: Option<String>,
    },
    Authenticated,
    Ready {
        #[serde(rename = "phoneNumber", default)]
        phone_number: Option<String>,
    },
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },

    // Content
    NewMessage {
        message: LiveMessage,
    },
    MemberJoin {
        event: MemberEvent,
    },
    MemberLeave {
        event: MemberEvent,
    },
    Certificate {
        event: MemberEvent,
    },
    WelcomeSent {
        group_id: i64,
        group_name: String,
        #[serde(default)]
        joiners_count: u32,
    },
    AgentResponse {
        agent_name: String,
        group_name: String,
        response: String,
    },

    // Long-running tasks
    BroadcastProgress(TaskProgress),
    BroadcastComplete(TaskComplete),
    PollProgress(TaskProgress),
    PollComplete(TaskComplete),
    ChannelBroadcastProgress(TaskProgress),
    ChannelBroadcastComplete(TaskComplete),
    ChannelPollProgress(TaskProgress),
    ChannelPollComplete(TaskComplete),
    SettingsProgress(SettingsProgress),
    SettingsComplete(SettingsComplete),
    ImmediateSettingsProgress(SettingsProgress),
    ImmediateSettingsComplete(SettingsComplete),

    /// A `type` this client does not know about.
    #[serde(other)]
    Unknown,
}

impl RealtimeEvent {
    /// Group the event concerns, when the payload names one.
    pub fn group_id(&self) -> Option<i64> {
        match self {
            RealtimeEvent::NewMessage { message } => message.group_id,
            RealtimeEvent::MemberJoin { event }
            | RealtimeEvent::MemberLeave { event }
            | RealtimeEvent::Certificate { event } => Some(event.group_id),
            RealtimeEvent::WelcomeSent { group_id, .. } => Some(*group_id),
            _ => None,
        }
    }

    pub fn is_progress(&self) -> bool {
        matches!(
            self,
            RealtimeEvent::BroadcastProgress(_)
                | RealtimeEvent::PollProgress(_)
                | RealtimeEvent::ChannelBroadcastProgress(_)
                | RealtimeEvent::ChannelPollProgress(_)
                | RealtimeEvent::SettingsProgress(_)
                | RealtimeEvent::ImmediateSettingsProgress(_)
        )
    }
}

/// Why an incoming frame could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("payload has no string `type` field")]
    MissingType,
    #[error("malformed `{event_type}` payload: {reason}")]
    InvalidPayload { event_type: String, reason: String },
}

/// A parsed realtime frame: the raw `type` string, the typed event and the
/// full JSON payload as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEnvelope {
    pub event_type: String,
    pub event: RealtimeEvent,
    pub payload: serde_json::Value,
}

impl RealtimeEnvelope {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let payload: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        let event_type = payload
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(ProtocolError::MissingType)?
            .to_string();
        let event = serde_json::from_value::<RealtimeEvent>(payload.clone()).map_err(|e| {
            ProtocolError::InvalidPayload {
                event_type: event_type.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            event_type,
            event,
            payload,
        })
    }
}

/// Check if a host is a local/development address.
pub fn is_local_address(host: &str) -> bool {
    let host_part = host.split(':').next().unwrap_or(host);
    host_part == "localhost"
        || host_part == "127.0.0.1"
        || host_part == "0.0.0.0"
        || host_part.starts_with("192.168.")
        || host_part.starts_with("10.")
}
