//! Error type shared by every client operation.
//!
//! Failures fall into three groups: the request was never sent (validation),
//! the server answered with a complaint, or the transport failed. Every
//! variant collapses to one message via [`ApiError::toast_message`].

use bazaar_core::FieldMessage;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Message shown when the failure carries nothing the user can act on.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when talking to the Bazaar API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input failed client-side validation; no request was made.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The server rejected the request.
    #[error("Server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        field_errors: Vec<FieldMessage>,
    },

    /// The bearer token is missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP transport failed (DNS, connection, TLS, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request could not be built (bad URL, unserialisable body, unreadable file).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The single user-facing string for a toast.
    #[must_use]
    pub fn toast_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors
                .first()
                .map_or_else(|| FALLBACK_MESSAGE.to_string(), |e| e.message.clone()),
            Self::Server {
                message,
                field_errors,
                ..
            } => {
                let fields = field_errors
                    .iter()
                    .map(|e| e.message.trim())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
                    .join("; ");
                match (message.trim(), fields.is_empty()) {
                    (message, true) => message.to_string(),
                    ("", false) => fields,
                    (message, false) => format!("{message}: {fields}"),
                }
            }
            Self::Unauthorized(message) | Self::NotFound(message) => message.clone(),
            Self::Network(_) | Self::Decode(_) | Self::InvalidRequest(_) => {
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    /// Whether the request reached the server and was answered.
    #[must_use]
    pub const fn is_server_reported(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Unauthorized(_) | Self::NotFound(_)
        )
    }

    /// Whether the failure should be reported to error tracking.
    ///
    /// User mistakes (validation, 4xx) are not.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Server { status, .. } => *status >= 500,
            Self::Network(_) | Self::Decode(_) | Self::InvalidRequest(_) => true,
            Self::Validation(_) | Self::Unauthorized(_) | Self::NotFound(_) => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validation::Validator;

    #[test]
    fn test_validation_toast_uses_first_message() {
        let mut v = Validator::new();
        v.required("email", "").required("password", "");
        let err = ApiError::from(v.finish().unwrap_err());
        assert_eq!(err.toast_message(), "Email is required");
        assert!(!err.is_server_reported());
    }

    #[test]
    fn test_server_toast_includes_field_messages() {
        let err = ApiError::Server {
            status: 400,
            message: "Validation Error".to_string(),
            field_errors: vec![
                FieldMessage {
                    path: "code".to_string(),
                    message: "Coupon already exists".to_string(),
                },
                FieldMessage {
                    path: "discount".to_string(),
                    message: "Discount too large".to_string(),
                },
            ],
        };
        assert_eq!(
            err.toast_message(),
            "Validation Error: Coupon already exists; Discount too large"
        );
        assert!(!err.is_unexpected());
    }

    #[test]
    fn test_server_toast_without_message_lists_fields() {
        let err = ApiError::Server {
            status: 422,
            message: "  ".to_string(),
            field_errors: vec![FieldMessage {
                path: "phone".to_string(),
                message: "Enter a valid phone number".to_string(),
            }],
        };
        assert_eq!(err.toast_message(), "Enter a valid phone number");
    }

    #[test]
    fn test_server_toast_plain_message() {
        let err = ApiError::Server {
            status: 503,
            message: "Maintenance".to_string(),
            field_errors: vec![],
        };
        assert_eq!(err.toast_message(), "Maintenance");
        assert!(err.is_unexpected());
    }

    #[test]
    fn test_decode_toast_is_generic() {
        let err = ApiError::Decode("missing field `data`".to_string());
        assert_eq!(err.toast_message(), FALLBACK_MESSAGE);
    }
}
