//! Error types shared by the backend client, the token store and the session
//! manager. Messages may reach the terminal, so they never carry token or
//! password material.

use thiserror::Error;

/// Failures of a single backend call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
}

/// Failures of the durable token store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("token store is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
    #[error("token store {0} does not hold a JSON object")]
    NotAnObject(String),
}

/// Failures surfaced by the session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {reason}")]
    AuthenticationFailed { reason: String },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuthError {
    pub(crate) fn rejected(err: &ClientError) -> Self {
        let reason = match err {
            ClientError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self::AuthenticationFailed { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_prefers_backend_message() {
        let err = AuthError::rejected(&ClientError::Http {
            status: 401,
            message: "wrong password".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid credentials: wrong password");
    }

    #[test]
    fn rejected_keeps_transport_detail() {
        let err = AuthError::rejected(&ClientError::Network("connection refused".to_string()));
        assert!(matches!(
            err,
            AuthError::AuthenticationFailed { ref reason } if reason.contains("connection refused")
        ));
    }
}
