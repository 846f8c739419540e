use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Storage(format!("{:#}", err))
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Message used when a 401 body carries nothing readable
const DEFAULT_UNAUTHORIZED_MESSAGE: &str = "Authentication credentials were not provided or are invalid";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 | 422 => ApiError::Validation(FieldErrors::from_body(body)),
            401 => ApiError::Unauthorized(
                server_message(body).unwrap_or_else(|| DEFAULT_UNAUTHORIZED_MESSAGE.to_string()),
            ),
            403 => ApiError::AccessDenied(
                server_message(body).unwrap_or_else(|| Self::truncate_body(body)),
            ),
            404 => ApiError::NotFound(
                server_message(body).unwrap_or_else(|| Self::truncate_body(body)),
            ),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server(Self::truncate_body(body)),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// True when no response was received from the backend.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Transport(_))
    }

    /// True for authorization failures, recovered or session-ending.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::SessionExpired)
    }
}

/// Pull the backend's human-readable message out of an error body.
///
/// The backend reports single failures as `{"error": "..."}` and permission
/// failures as `{"detail": "..."}`.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Field-level validation errors, keyed by field name.
///
/// Messages not tied to a field (`non_field_errors`, `error`, `detail`, or a
/// body that is not an object) are collected under [`FieldErrors::GENERAL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub const GENERAL: &'static str = "non_field_errors";

    pub fn from_body(body: &str) -> Self {
        let mut errors = BTreeMap::new();
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => {
                for (field, value) in map {
                    let key = match field.as_str() {
                        "error" | "detail" => Self::GENERAL.to_string(),
                        _ => field,
                    };
                    let messages: &mut Vec<String> = errors.entry(key).or_default();
                    collect_messages(&value, messages);
                }
            }
            Ok(other) => {
                let mut messages = Vec::new();
                collect_messages(&other, &mut messages);
                errors.insert(Self::GENERAL.to_string(), messages);
            }
            Err(_) if !body.trim().is_empty() => {
                errors.insert(
                    Self::GENERAL.to_string(),
                    vec![ApiError::truncate_body(body.trim())],
                );
            }
            Err(_) => {}
        }
        errors.retain(|_, messages| !messages.is_empty());
        Self(errors)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_messages(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_messages(item, out)),
        Value::Null => {}
        other => out.push(other.to_string()),
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("request rejected");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| {
                if field == Self::GENERAL {
                    messages.join(" ")
                } else {
                    format!("{}: {}", field, messages.join(" "))
                }
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}
