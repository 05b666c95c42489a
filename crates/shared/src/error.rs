//! Error envelope returned by the backend and the client-side API error type.

use serde::{Deserialize, Serialize};

/// Error body produced by the backend: `{"detail": "..."}` for handled
/// errors, `{"detail": [{"loc": [...], "msg": "..."}]}` for request
/// validation failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationIssue>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
}

impl ValidationIssue {
    /// The offending field name, i.e. the last string segment of `loc`.
    pub fn field(&self) -> Option<&str> {
        self.loc.iter().rev().find_map(|segment| segment.as_str())
    }
}

/// Attempt to parse an error body into a user-facing message.
///
/// A plain `detail` string is returned verbatim; validation issues are
/// rendered as `field: msg` joined with `; `.
pub fn try_error_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    match parsed.detail {
        ErrorDetail::Message(detail) if !detail.trim().is_empty() => Some(detail),
        ErrorDetail::Message(_) => None,
        ErrorDetail::Validation(issues) if !issues.is_empty() => Some(
            issues
                .iter()
                .map(|issue| match issue.field() {
                    Some(field) => format!("{field}: {}", issue.msg),
                    None => issue.msg.clone(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        ErrorDetail::Validation(_) => None,
    }
}

/// API error type for client-side use
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Expired or invalid bearer token.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Human-readable message suitable for inline display.
    ///
    /// Server-provided `detail` text is passed through unchanged.
    pub fn message(&self) -> String {
        match self {
            ApiError::Network(_) => "Unable to reach the server".to_string(),
            ApiError::Http { status, body } => try_error_detail(body)
                .unwrap_or_else(|| format!("Request failed with status {status}")),
            ApiError::Deserialize(_) => "Unexpected response from the server".to_string(),
        }
    }
}
