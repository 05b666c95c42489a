//! REST data models served by the group monitoring backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time;

// --- Common Definitions ---

/// Who gets @-mentioned when a message is delivered to a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MentionType {
    #[default]
    None,
    All,
    Selected,
}

/// Generic `{success, message}` acknowledgement returned by most mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// --- Auth ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(with = "time::option", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

fn default_true() -> bool {
    true
}

// --- WhatsApp session ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WhatsAppStatus {
    /// not_initialized, initializing, qr_ready, authenticated, ready, disconnected
    pub status: String,
    pub is_authenticated: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub has_qr: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QrCode {
    #[serde(default)]
    pub qr: Option<String>,
    pub status: String,
    #[serde(default)]
    pub has_qr: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitResponse {
    pub success: bool,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableGroup {
    /// WhatsApp group id
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub participant_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableGroups {
    pub success: bool,
    pub groups: Vec<AvailableGroup>,
}

/// A group participant as reported by the WhatsApp service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMembers {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

/// A WhatsApp channel (newsletter) the account follows or owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WhatsAppChannel {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WhatsAppChannels {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub channels: Vec<WhatsAppChannel>,
}

// --- Groups ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub whatsapp_group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(with = "time::option", default)]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddGroupRequest {
    pub whatsapp_group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub member_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub mention_all: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_ids: Option<Vec<String>>,
}

// --- Messages ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub whatsapp_group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    pub sender_name: String,
    #[serde(default)]
    pub sender_phone: Option<String>,
    pub content: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(with = "time")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

// --- Member events ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberEventType {
    Join,
    Leave,
    Certificate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberEvent {
    pub id: i64,
    /// Omitted by the admin per-user listings.
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub whatsapp_group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub member_id: String,
    pub member_name: String,
    #[serde(default)]
    pub member_phone: Option<String>,
    pub event_type: MemberEventType,
    pub event_date: NaiveDate,
    #[serde(with = "time")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventPage {
    pub events: Vec<MemberEvent>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventSummary {
    pub total_joins: u64,
    pub total_leaves: u64,
    pub net_change: i64,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyEvents {
    pub date: NaiveDate,
    pub joins: u64,
    pub leaves: u64,
}

// --- Certificates ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certificate {
    pub id: i64,
    #[serde(default)]
    pub group_id: i64,
    pub group_name: String,
    pub member_name: String,
    #[serde(default)]
    pub member_phone: Option<String>,
    pub event_date: NaiveDate,
    #[serde(with = "time")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificatePage {
    pub certificates: Vec<Certificate>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateHolder {
    pub member_name: String,
    #[serde(default)]
    pub member_phone: Option<String>,
    pub certificate_count: u64,
    /// Comma-separated group names.
    #[serde(default)]
    pub groups: Option<String>,
}

impl CertificateHolder {
    pub fn group_names(&self) -> Vec<&str> {
        self.groups
            .as_deref()
            .map(|groups| {
                groups
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateSummary {
    #[serde(default)]
    pub summary: Vec<CertificateHolder>,
    pub total_certificates: u64,
    pub unique_members: u64,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
}

// --- Broadcasts & polls ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BroadcastRequest {
    pub content: String,
    pub group_ids: Vec<i64>,
    #[serde(default)]
    pub mention_type: MentionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_ids: Option<Vec<String>>,
    /// `None` sends immediately.
    #[serde(with = "time::option", default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PollRequest {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub allow_multiple_answers: bool,
    pub group_ids: Vec<i64>,
    #[serde(default)]
    pub mention_type: MentionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_ids: Option<Vec<String>>,
    #[serde(with = "time::option", default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastAccepted {
    pub success: bool,
    pub message_id: i64,
    #[serde(default)]
    pub scheduled: bool,
    #[serde(with = "time::option", default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Sending,
    Sent,
    PartiallySent,
    Failed,
    Cancelled,
}

/// A scheduled, in-flight or finished broadcast/poll task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastTask {
    pub id: i64,
    #[serde(default = "default_task_type")]
    pub task_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub group_names: Vec<String>,
    #[serde(default)]
    pub mention_type: MentionType,
    #[serde(with = "time::option", default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(with = "time::option", default)]
    pub sent_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    #[serde(default)]
    pub groups_sent: u32,
    #[serde(default)]
    pub groups_failed: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub poll_options: Option<Vec<String>>,
}

fn default_task_type() -> String {
    "broadcast".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastHistory {
    pub broadcasts: Vec<BroadcastTask>,
    pub total: u64,
}

// --- Group settings (open/close scheduling) ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CreateScheduleRequest {
    pub group_ids: Vec<i64>,
    /// `HH:MM`
    pub open_time: String,
    /// `HH:MM`
    pub close_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_message: Option<String>,
    #[serde(default)]
    pub mention_type: MentionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ImmediateSettingsRequest {
    pub group_ids: Vec<i64>,
    /// `true` closes the groups (only admins may post).
    pub admin_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub mention_type: MentionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImmediateSettingsAccepted {
    pub success: bool,
    pub action: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsSchedule {
    pub id: String,
    #[serde(default)]
    pub group_ids: Vec<i64>,
    #[serde(default)]
    pub group_names: Vec<String>,
    #[serde(default)]
    pub open_time: Option<String>,
    #[serde(default)]
    pub close_time: Option<String>,
    #[serde(default)]
    pub open_message: Option<String>,
    #[serde(default)]
    pub close_message: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::option", default)]
    pub next_open: Option<DateTime<Utc>>,
    #[serde(with = "time::option", default)]
    pub next_close: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsSchedules {
    pub schedules: Vec<SettingsSchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsChange {
    pub id: i64,
    pub action: String,
    #[serde(default)]
    pub group_names: Vec<String>,
    #[serde(with = "time::option", default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(with = "time::option", default)]
    pub sent_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    #[serde(default)]
    pub groups_success: u32,
    #[serde(default)]
    pub groups_failed: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsHistory {
    pub history: Vec<SettingsChange>,
}

// --- Welcome messages ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WelcomeSettings {
    pub id: i64,
    pub group_name: String,
    #[serde(default)]
    pub whatsapp_group_id: String,
    pub welcome_enabled: bool,
    pub welcome_threshold: u32,
    #[serde(default)]
    pub welcome_join_count: u32,
    #[serde(default)]
    pub welcome_text: Option<String>,
    #[serde(default)]
    pub welcome_part2_enabled: bool,
    #[serde(default)]
    pub welcome_part2_text: Option<String>,
    #[serde(default)]
    pub welcome_part2_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WelcomeUpdate {
    pub group_ids: Vec<i64>,
    pub enabled: bool,
    pub threshold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_mentions: Option<Vec<String>>,
    #[serde(default)]
    pub part2_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part2_text: Option<String>,
}

impl Default for WelcomeUpdate {
    fn default() -> Self {
        Self {
            group_ids: Vec::new(),
            enabled: false,
            threshold: 1,
            text: None,
            extra_mentions: None,
            part2_enabled: false,
            part2_text: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisableAllResponse {
    pub success: bool,
    pub disabled_count: u32,
}

// --- AI agents ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub api_url: String,
    /// Masked by the server (`sk-abc1234...`).
    #[serde(default)]
    pub api_key: Option<String>,
    pub input_token_limit: u32,
    pub output_token_limit: u32,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub enabled_group_ids: Vec<i64>,
    #[serde(with = "time::option", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "time::option", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentList {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateAgentRequest {
    pub name: String,
    pub api_url: String,
    pub api_key: String,
    pub input_token_limit: u32,
    pub output_token_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for CreateAgentRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            api_url: String::new(),
            api_key: String::new(),
            input_token_limit: 4096,
            output_token_limit: 1024,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UpdateAgentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_token_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentGroups {
    pub enabled_group_ids: Vec<i64>,
}

/// A monitored group and whether the agent answers in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentGroupStatus {
    pub id: i64,
    pub group_name: String,
    #[serde(default)]
    pub member_count: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentGroupList {
    pub groups: Vec<AgentGroupStatus>,
}

// --- Statistics ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsOverview {
    pub total_messages: u64,
    pub total_groups: u64,
    pub total_joins: u64,
    pub total_leaves: u64,
    pub net_member_change: i64,
    pub unique_senders: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopSender {
    pub sender_name: String,
    #[serde(default)]
    pub sender_phone: Option<String>,
    pub message_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupActivity {
    pub group_id: i64,
    pub group_name: String,
    pub message_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberChange {
    pub date: NaiveDate,
    #[serde(default)]
    pub joins: u64,
    #[serde(default)]
    pub leaves: u64,
}

// --- Admin ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub whatsapp_status: Option<String>,
    #[serde(default)]
    pub whatsapp_connected: bool,
    #[serde(default)]
    pub whatsapp_phone: Option<String>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub group_count: u64,
    #[serde(default)]
    pub event_count: u64,
    #[serde(default)]
    pub certificate_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminUserStats {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub total_messages: u64,
    pub total_groups: u64,
    pub total_events: u64,
    #[serde(default)]
    pub whatsapp_status: Option<String>,
    #[serde(default)]
    pub is_whatsapp_connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminOverview {
    pub total_users: u64,
    pub active_users: u64,
    pub admin_users: u64,
    pub connected_whatsapp_sessions: u64,
    pub total_messages: u64,
    pub total_groups: u64,
    pub total_certificates: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminToggled {
    pub success: bool,
    pub user_id: i64,
    pub is_admin: bool,
}
