use thiserror::Error;

/// Failure taxonomy for everything the engine asks a server to do.
///
/// Every variant renders a human-readable message. `Clone` so spawned tasks
/// can ship results through internal events and tests can preload mock slots.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Validation(String),

    /// 401: missing or expired session.
    #[error("{0}")]
    Auth(String),

    /// Transport-level failure: DNS, refused connection, timeout, dropped socket.
    #[error("{0}")]
    Network(String),

    /// The server answered and said no, or answered garbage.
    #[error("{0}")]
    Server(String),

    /// Non-2xx with no message body. Logs keep the status; the user sees the
    /// operation's fallback text instead.
    #[error("request failed with status {0}")]
    Status(u16),
}

impl ApiError {
    /// Map a non-2xx response to the taxonomy. `message` is the server's
    /// `{"message": ...}` body field when it sent one.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match (status, message) {
            (401, Some(msg)) => ApiError::Auth(msg),
            (401, None) => ApiError::Auth("Unauthorized".into()),
            (_, Some(msg)) => ApiError::Server(msg),
            (status, None) => ApiError::Status(status),
        }
    }

    /// The string to surface to the user: the server's own message when it
    /// sent one, otherwise the operation's generic fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation(msg) | ApiError::Auth(msg) | ApiError::Server(msg) => msg.clone(),
            ApiError::Network(_) | ApiError::Status(_) => fallback.to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_splits_auth_from_server() {
        assert_eq!(
            ApiError::from_status(401, Some("Unauthorized".into())),
            ApiError::Auth("Unauthorized".into())
        );
        assert_eq!(
            ApiError::from_status(500, Some("boom".into())),
            ApiError::Server("boom".into())
        );
        assert_eq!(ApiError::from_status(404, None), ApiError::Status(404));
        assert_eq!(
            ApiError::from_status(401, None),
            ApiError::Auth("Unauthorized".into())
        );
    }

    #[test]
    fn user_message_prefers_server_text_over_fallback() {
        let err = ApiError::Server("Cannot send message to yourself".into());
        assert_eq!(err.user_message("Failed to send message."), "Cannot send message to yourself");

        let err = ApiError::Network("connection refused".into());
        assert_eq!(err.user_message("Failed to send message."), "Failed to send message.");
    }

    #[test]
    fn message_less_statuses_keep_logs_but_not_toasts() {
        let err = ApiError::from_status(500, None);
        assert_eq!(err.to_string(), "request failed with status 500");
        assert_eq!(err.user_message("Failed to send message."), "Failed to send message.");
    }
}
