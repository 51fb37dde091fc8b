use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Typed error surfaced to the UI
///
/// `status` is the HTTP status the gateway answered with (0 when no response
/// was received); `code`/`message` come from the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorField,
}

/// Upstream errors are `{code, message}`; the gateway's own are a bare string
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detailed { code: String, message: String },
    Message(String),
}

impl ApiError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(401, UNAUTHORIZED, "Not authenticated")
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::new(0, NETWORK_ERROR, format!("Network error: {}", err))
    }

    pub fn malformed(status: u16, err: impl std::fmt::Display) -> Self {
        Self::new(status, MALFORMED_RESPONSE, format!("Unexpected response shape: {}", err))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(0, VALIDATION_ERROR, message)
    }

    /// Build from a non-2xx status and its raw body
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: ErrorField::Detailed { code, message },
            }) => Self::new(status.as_u16(), code, message),
            Ok(ErrorEnvelope {
                error: ErrorField::Message(message),
            }) => Self::new(status.as_u16(), code_for_status(status), message),
            Err(_) => Self::new(
                status.as_u16(),
                code_for_status(status),
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
            ),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.code == UNAUTHORIZED
    }
}

/// `Bad Request` -> `BAD_REQUEST`; unknown statuses -> `HTTP_<n>`
fn code_for_status(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect(),
        None => format!("HTTP_{}", status.as_u16()),
    }
}
