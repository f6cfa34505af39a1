use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session expired or credentials rejected")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// How a failed call should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The server refused the input; show the field messages and let the
    /// user correct the form.
    Validation,
    /// The request was understood but refused (auth, permission, missing).
    Rejected,
    /// The request never produced a usable answer (network, 5xx, garbage).
    Transport,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::Validation(ValidationErrors::from_body(body)),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            ApiError::Validation(_) => Outcome::Validation,
            ApiError::Unauthorized | ApiError::AccessDenied(_) | ApiError::NotFound(_) => {
                Outcome::Rejected
            }
            ApiError::RateLimited
            | ApiError::ServerError(_)
            | ApiError::NetworkError(_)
            | ApiError::InvalidResponse(_) => Outcome::Transport,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Field-level messages from a 400 response.
///
/// The backend answers `{"field": ["msg", ...]}`, sometimes a bare string per
/// field, `non_field_errors`, or just `{"detail": "..."}`. All of them land
/// in one map; messages not tied to a field use the key `non_field_errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

impl ValidationErrors {
    pub fn from_body(body: &str) -> Self {
        let mut errors = Self::default();
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => {
                for (key, value) in map {
                    let key = if key == "detail" {
                        NON_FIELD_ERRORS.to_string()
                    } else {
                        key
                    };
                    for msg in flatten_messages(&value) {
                        errors.add(&key, msg);
                    }
                }
            }
            Ok(other) => {
                for msg in flatten_messages(&other) {
                    errors.add(NON_FIELD_ERRORS, msg);
                }
            }
            Err(_) => {
                let trimmed = body.trim();
                if !trimmed.is_empty() {
                    errors.add(NON_FIELD_ERRORS, ApiError::truncate_body(trimmed));
                }
            }
        }
        errors
    }

    /// A single client-side message, for checks made before any request.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn flatten_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(flatten_messages).collect(),
        Value::Object(map) => map
            .iter()
            .flat_map(|(k, v)| {
                flatten_messages(v)
                    .into_iter()
                    .map(move |m| format!("{}: {}", k, m))
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return f.write_str("request rejected");
        }
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, msgs)| {
                if field == NON_FIELD_ERRORS {
                    msgs.join(" ")
                } else {
                    format!("{}: {}", field, msgs.join(" "))
                }
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Failure of the login call.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credentials refused; the message comes from the server when it sent one.
    #[error("{0}")]
    Rejected(String),

    #[error("Token endpoint error {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Failure of the refresh procedure.
///
/// Cloneable because one outcome is handed to every caller waiting on the
/// same in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Refresh rejected with status {0}")]
    Rejected(u16),

    #[error("Refresh request failed: {0}")]
    Network(String),

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The stored credentials were cleared or replaced while the refresh
    /// was in flight; the minted token was discarded.
    #[error("Credentials changed during refresh")]
    Superseded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_validation_errors_field_lists() {
        let errors = ValidationErrors::from_body(
            r#"{"amount": ["Amount must be positive."], "date": "Enter a valid date."}"#,
        );
        assert_eq!(errors.field("amount"), ["Amount must be positive."]);
        assert_eq!(errors.field("date"), ["Enter a valid date."]);
        assert!(errors.field("missing").is_empty());
    }

    #[test]
    fn test_validation_errors_detail_and_non_field() {
        let errors = ValidationErrors::from_body(
            r#"{"detail": "Bad input", "non_field_errors": ["Duplicate budget"]}"#,
        );
        assert_eq!(
            errors.field(NON_FIELD_ERRORS),
            ["Bad input", "Duplicate budget"]
        );
        assert_eq!(errors.to_string(), "Bad input Duplicate budget");
    }

    #[test]
    fn test_validation_errors_plain_text_body() {
        let errors = ValidationErrors::from_body("Bad Request");
        assert_eq!(errors.field(NON_FIELD_ERRORS), ["Bad Request"]);

        assert!(ValidationErrors::from_body("").is_empty());
    }

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"name": ["required"]}"#),
            ApiError::Validation(_)
        ));
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "nope"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_outcomes() {
        let validation = ApiError::Validation(ValidationErrors::single("amount", "too small"));
        assert_eq!(validation.outcome(), Outcome::Validation);
        assert_eq!(ApiError::Unauthorized.outcome(), Outcome::Rejected);
        assert_eq!(
            ApiError::ServerError("boom".into()).outcome(),
            Outcome::Transport
        );
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY_LENGTH);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }
}
