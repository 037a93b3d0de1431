use thiserror::Error;

use crate::api::ApiError;

// User-facing messages
pub(crate) const EMPTY_FIELDS_MESSAGE: &str = "Please fill in all fields";
pub(crate) const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub(crate) const DEFAULT_REJECTION_MESSAGE: &str = "Invalid email or password";
pub(crate) const CONNECTIVITY_MESSAGE: &str =
    "Unable to connect to server. Check your internet connection.";
pub(crate) const TIMEOUT_MESSAGE: &str = "Connection timed out. Please try again.";
pub(crate) const SERVER_ERROR_MESSAGE: &str = "The server had a problem. Please try again later.";
pub(crate) const RATE_LIMITED_MESSAGE: &str = "Too many attempts. Please wait before retrying.";
pub(crate) const MALFORMED_RESPONSE_MESSAGE: &str = "Unexpected response from server";
pub(crate) const SAVE_FAILED_MESSAGE: &str = "Unable to save credentials on this device";
pub(crate) const SIGN_OUT_FAILED_MESSAGE: &str = "Trouble logging out";
pub(crate) const INTERRUPTED_MESSAGE: &str = "Sign-in was interrupted. Please try again.";

/// Every way a session operation can fail. `Display` is the message shown
/// to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Missing or malformed local input; no I/O was attempted.
    #[error("{0}")]
    Validation(String),

    /// The server explicitly refused the credentials. Carries the server's
    /// own message, shown as-is.
    #[error("{0}")]
    AuthRejected(String),

    /// No usable answer from the server: unreachable, timed out, or malformed.
    #[error("{0}")]
    Transport(String),

    /// The secure store could not be read, written, or cleared.
    #[error("{0}")]
    Persistence(String),
}

impl SessionError {
    /// Whether trying again with the same input could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Validation(_) => "validation",
            SessionError::AuthRejected(_) => "auth_rejected",
            SessionError::Transport(_) => "transport",
            SessionError::Persistence(_) => "persistence",
        }
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized | ApiError::AccessDenied(_) => {
                SessionError::AuthRejected(DEFAULT_REJECTION_MESSAGE.to_string())
            }
            ApiError::Timeout => SessionError::Transport(TIMEOUT_MESSAGE.to_string()),
            ApiError::Unreachable(_) | ApiError::NetworkError(_) => {
                SessionError::Transport(CONNECTIVITY_MESSAGE.to_string())
            }
            ApiError::RateLimited => SessionError::Transport(RATE_LIMITED_MESSAGE.to_string()),
            ApiError::ServerError(_) => SessionError::Transport(SERVER_ERROR_MESSAGE.to_string()),
            ApiError::NotFound(_) | ApiError::InvalidResponse(_) => {
                SessionError::Transport(MALFORMED_RESPONSE_MESSAGE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_classification() {
        assert_eq!(
            SessionError::from(ApiError::Unauthorized),
            SessionError::AuthRejected(DEFAULT_REJECTION_MESSAGE.to_string())
        );
        assert_eq!(
            SessionError::from(ApiError::Unreachable("refused".into())),
            SessionError::Transport(CONNECTIVITY_MESSAGE.to_string())
        );
        assert_eq!(
            SessionError::from(ApiError::Timeout),
            SessionError::Transport(TIMEOUT_MESSAGE.to_string())
        );
        assert_eq!(
            SessionError::from(ApiError::InvalidResponse("garbage".into())),
            SessionError::Transport(MALFORMED_RESPONSE_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_retryable() {
        assert!(SessionError::Transport("x".into()).is_retryable());
        assert!(!SessionError::AuthRejected("x".into()).is_retryable());
        assert!(!SessionError::Validation("x".into()).is_retryable());
        assert_eq!(SessionError::Persistence("x".into()).kind(), "persistence");
    }

    #[test]
    fn test_rejection_displays_server_message() {
        let err = SessionError::AuthRejected("Account locked".into());
        assert_eq!(err.to_string(), "Account locked");
    }
}
