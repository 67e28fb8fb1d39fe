//! Transient notifications.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// A notification. `id` is assigned when the toast is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    /// The toast a finished request produces: `success` on `Ok`, the
    /// error's user-facing message on `Err`.
    #[must_use]
    pub fn from_result<T>(result: &Result<T, ApiError>, success: &str) -> Self {
        match result {
            Ok(_) => Self::success(success),
            Err(err) => Self::error(err.toast_message()),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, ToastKind::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: Result<(), ApiError> = Ok(());
        assert_eq!(Toast::from_result(&ok, "Saved").message, "Saved");

        let err: Result<(), ApiError> = Err(ApiError::Unauthorized("Session expired".into()));
        let toast = Toast::from_result(&err, "Saved");
        assert!(toast.is_error());
        assert_eq!(toast.message, "Session expired");
    }
}
