//! Client-side checks run before a request is dispatched.

use chrono::Utc;
use groupwatch_shared::{
    BroadcastRequest, CreateAgentRequest, CreateScheduleRequest, ImmediateSettingsRequest,
    MentionType, PollRequest, UpdateAgentRequest, WelcomeUpdate,
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 12;

/// A rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

type Validation = Result<(), ValidationError>;

fn required(field: &'static str, value: &str, message: &str) -> Validation {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, message))
    } else {
        Ok(())
    }
}

fn groups_selected(group_ids: &[i64]) -> Validation {
    if group_ids.is_empty() {
        Err(ValidationError::new("group_ids", "Select at least one group"))
    } else {
        Ok(())
    }
}

fn mentions(mention_type: MentionType, mention_ids: Option<&[String]>) -> Validation {
    let has_ids = mention_ids.is_some_and(|ids| ids.iter().any(|id| !id.trim().is_empty()));
    if mention_type == MentionType::Selected && !has_ids {
        return Err(ValidationError::new(
            "mention_ids",
            "Choose at least one member to mention",
        ));
    }
    Ok(())
}

pub fn validate_login(email: &str, password: &str) -> Validation {
    required("email", email, "Email is required")?;
    required("password", password, "Password is required")
}

pub fn validate_registration(username: &str, email: &str, password: &str) -> Validation {
    required("username", username, "Username is required")?;
    required("email", email, "Email is required")?;
    if !email.contains('@') {
        return Err(ValidationError::new("email", "Enter a valid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

/// A direct message to one group: text, media, or both.
pub fn validate_group_message(content: &str, has_media: bool) -> Validation {
    if !has_media {
        required("content", content, "Message cannot be empty")?;
    }
    Ok(())
}

pub fn validate_broadcast(request: &BroadcastRequest, has_media: bool) -> Validation {
    validate_group_message(&request.content, has_media)?;
    groups_selected(&request.group_ids)?;
    mentions(request.mention_type, request.mention_ids.as_deref())?;
    if let Some(at) = request.scheduled_at {
        if at <= Utc::now() {
            return Err(ValidationError::new(
                "scheduled_at",
                "Scheduled time must be in the future",
            ));
        }
    }
    Ok(())
}

pub fn validate_poll(request: &PollRequest) -> Validation {
    required("question", &request.question, "Poll question is required")?;
    if request.options.iter().any(|o| o.trim().is_empty()) {
        return Err(ValidationError::new("options", "Poll options cannot be blank"));
    }
    let count = request.options.len();
    if !(MIN_POLL_OPTIONS..=MAX_POLL_OPTIONS).contains(&count) {
        return Err(ValidationError::new(
            "options",
            format!("A poll needs between {MIN_POLL_OPTIONS} and {MAX_POLL_OPTIONS} options"),
        ));
    }
    groups_selected(&request.group_ids)?;
    mentions(request.mention_type, request.mention_ids.as_deref())
}

/// Parse a 24-hour `HH:MM` time.
pub fn parse_hhmm(value: &str) -> Option<(u8, u8)> {
    let (h, m) = value.trim().split_once(':')?;
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(h) || !two_digits(m) {
        return None;
    }
    let hour: u8 = h.parse().ok()?;
    let minute: u8 = m.parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

pub fn validate_schedule(request: &CreateScheduleRequest) -> Validation {
    groups_selected(&request.group_ids)?;
    if parse_hhmm(&request.open_time).is_none() {
        return Err(ValidationError::new("open_time", "Open time must be HH:MM"));
    }
    if parse_hhmm(&request.close_time).is_none() {
        return Err(ValidationError::new("close_time", "Close time must be HH:MM"));
    }
    if request.open_time.trim() == request.close_time.trim() {
        return Err(ValidationError::new(
            "close_time",
            "Open and close times must differ",
        ));
    }
    mentions(request.mention_type, request.mention_ids.as_deref())
}

pub fn validate_immediate_settings(request: &ImmediateSettingsRequest) -> Validation {
    groups_selected(&request.group_ids)?;
    mentions(request.mention_type, request.mention_ids.as_deref())
}

pub fn validate_welcome(update: &WelcomeUpdate) -> Validation {
    groups_selected(&update.group_ids)?;
    if update.threshold < 1 {
        return Err(ValidationError::new("threshold", "Threshold must be at least 1"));
    }
    if update.enabled {
        required(
            "text",
            update.text.as_deref().unwrap_or_default(),
            "Welcome text is required",
        )?;
    }
    if update.part2_enabled {
        required(
            "part2_text",
            update.part2_text.as_deref().unwrap_or_default(),
            "Second message text is required",
        )?;
    }
    Ok(())
}

pub fn validate_agent(request: &CreateAgentRequest) -> Validation {
    required("name", &request.name, "Agent name is required")?;
    required("api_url", &request.api_url, "API URL is required")?;
    required("api_key", &request.api_key, "API key is required")?;
    token_limits(
        Some(request.input_token_limit),
        Some(request.output_token_limit),
    )
}

pub fn validate_agent_update(request: &UpdateAgentRequest) -> Validation {
    if let Some(name) = &request.name {
        required("name", name, "Agent name is required")?;
    }
    if let Some(url) = &request.api_url {
        required("api_url", url, "API URL is required")?;
    }
    token_limits(request.input_token_limit, request.output_token_limit)
}

fn token_limits(input: Option<u32>, output: Option<u32>) -> Validation {
    if input == Some(0) {
        return Err(ValidationError::new(
            "input_token_limit",
            "Input token limit must be greater than 0",
        ));
    }
    if output == Some(0) {
        return Err(ValidationError::new(
            "output_token_limit",
            "Output token limit must be greater than 0",
        ));
    }
    Ok(())
}
