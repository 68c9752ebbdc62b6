// src/error.rs
use reqwest::header::InvalidHeaderValue;
use serde_json::{json, Value};
use thiserror::Error;

use crate::error_codes;
use crate::resource::ResourceState;
use crate::validation::{FieldError, ValidationErrors};

/// Transport and protocol level failures.
///
/// These come out of [`ParseClient`](crate::ParseClient) and the wire decoding helpers.
/// Resource and query operations wrap them in [`ResourceError::Transport`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("HTTP request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("URL parsing failed: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("JSON deserialization failed: {0}")]
    JsonDeserializationFailed(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid session token: {0}")]
    InvalidSessionToken(String),

    #[error("Field '{0}' is assigned by the server and cannot be set")]
    ReservedField(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Other Parse error (HTTP {status}, Code: {code}): {message}")]
    OtherParseError {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(InvalidHeaderValue),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ParseError {
    /// Creates a `ParseError` from an HTTP status code and a JSON response body.
    ///
    /// Only responses that are not structured 4xx rejections reach this point, so the
    /// status decides the variant and the Parse code is carried along in the message.
    pub(crate) fn from_response(status_code: u16, response_body: Value) -> Self {
        let error_code = response_body
            .get("code")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let error_message = response_body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error")
            .to_string();

        if status_code >= 500 {
            ParseError::InternalServerError(format!(
                "Server error (HTTP {}): ({}) {}",
                status_code, error_code, error_message
            ))
        } else if status_code == 401 || status_code == 403 {
            ParseError::AuthenticationError(format!(
                "Auth error (HTTP {}): ({}) {}",
                status_code, error_code, error_message
            ))
        } else if status_code == 404 {
            ParseError::ObjectNotFound(format!(
                "Not found (HTTP {}): ({}) {}",
                status_code, error_code, error_message
            ))
        } else {
            ParseError::OtherParseError {
                status: status_code,
                code: error_code,
                message: error_message,
            }
        }
    }
}

/// The failure kinds a resource, query or user operation can report.
///
/// Every public operation that talks to the backend returns one of these as a plain
/// value, so callers branch on the kind instead of catching anything.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Local validation failed before any request was made.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The backend answered with a 4xx and a structured `{code, error}` payload.
    #[error("Rejected by server (HTTP {status}, code {code}): {message}")]
    RemoteRejection {
        status: u16,
        code: i64,
        /// The raw `error` string sent by the backend.
        message: String,
        /// The code translated to a field-level error.
        error: FieldError,
    },

    /// The request could not be completed or the response made no sense.
    #[error("Transport failure: {0}")]
    Transport(#[from] ParseError),

    /// `find` was called without a usable identifier.
    #[error("{class_name} record not found (id: {id:?})")]
    NotFound { class_name: &'static str, id: String },

    /// The operation is not valid for the object's lifecycle state.
    #[error("Cannot {operation} a {state} object")]
    InvalidState {
        operation: &'static str,
        state: ResourceState,
    },
}

impl ResourceError {
    /// Classifies a non-success response.
    ///
    /// A 4xx carrying a numeric `code` becomes a [`ResourceError::RemoteRejection`]; anything
    /// else is reported as a transport failure classified by [`ParseError::from_response`].
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();

        if (400..500).contains(&status) {
            if let Some(code) = parsed
                .as_ref()
                .and_then(|payload| payload.get("code"))
                .and_then(Value::as_i64)
            {
                let message = parsed
                    .as_ref()
                    .and_then(|payload| payload.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return ResourceError::RemoteRejection {
                    status,
                    code,
                    message,
                    error: error_codes::translate(code),
                };
            }
        }

        let payload = parsed.unwrap_or_else(|| {
            log::warn!(
                "Non-JSON error body with status {}: {}",
                status,
                String::from_utf8_lossy(body)
            );
            json!({
                "code": status,
                "error": String::from_utf8_lossy(body).chars().take(100).collect::<String>(),
            })
        });
        ResourceError::Transport(ParseError::from_response(status, payload))
    }

    /// Returns the validation errors carried by a `Validation` failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ResourceError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Returns the translated field error of a `RemoteRejection`.
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            ResourceError::RemoteRejection { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ResourceError::Validation(_))
    }

    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, ResourceError::RemoteRejection { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ResourceError::Transport(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_with_code_becomes_remote_rejection() {
        let body = br#"{"code":202,"error":"username taken"}"#;
        let error = ResourceError::from_response(400, body);

        match error {
            ResourceError::RemoteRejection {
                status,
                code,
                message,
                error,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, 202);
                assert_eq!(message, "username taken");
                assert_eq!(error.field, "username");
            }
            other => panic!("expected RemoteRejection, got {:?}", other),
        }
    }

    #[test]
    fn server_error_is_a_transport_failure() {
        let error = ResourceError::from_response(503, br#"{"code":1,"error":"down"}"#);
        assert!(matches!(
            error,
            ResourceError::Transport(ParseError::InternalServerError(_))
        ));
    }

    #[test]
    fn client_error_without_json_is_a_transport_failure() {
        let error = ResourceError::from_response(404, b"<html>nope</html>");
        assert!(matches!(
            error,
            ResourceError::Transport(ParseError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn from_response_classifies_by_status() {
        let error = ParseError::from_response(403, json!({"error": "forbidden"}));
        assert!(matches!(error, ParseError::AuthenticationError(_)));

        let error = ParseError::from_response(302, json!({"code": 137, "error": "moved"}));
        assert!(matches!(
            error,
            ParseError::OtherParseError { status: 302, code: 137, .. }
        ));
    }

    #[test]
    fn large_codes_are_not_truncated() {
        // 65637 wraps to 101 (object not found) as a u16
        let error = ResourceError::from_response(500, br#"{"code":65637,"error":"boom"}"#);
        match error {
            ResourceError::Transport(ParseError::InternalServerError(message)) => {
                assert!(message.contains("(65637) boom"), "message was {}", message);
            }
            other => panic!("expected InternalServerError, got {:?}", other),
        }

        let error = ParseError::from_response(302, json!({"code": 65637}));
        assert!(matches!(
            error,
            ParseError::OtherParseError { code: 65637, .. }
        ));
    }
}
