//! Unified client error handling.
//!
//! Every failure a caller can observe is a [`ClientError`]. Errors are grouped
//! into an [`ErrorKind`] so the presentation layer can decide how to surface
//! them: validation errors stay local to the form that produced them, while
//! application, authentication and network errors are shown as notifications.

use serde::Serialize;
use std::collections::BTreeMap;

/// Generic message used when the server gave no better explanation.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";
/// Fallback message for a failing envelope without a `message` field.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";
/// Notice shown when the backend rejects the current token.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please log in again";

/// Error categories surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Local input checks failed; nothing was sent
    Validation,
    /// Transport succeeded but the envelope code signals failure
    Application,
    /// Credentials rejected or session expired
    Authentication,
    /// No usable response from the server
    Network,
    /// Local faults: storage, decoding, configuration
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Application => "application",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Network => "network",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Envelope code outside the success set
    #[error("{message}")]
    Api { code: i64, message: String },

    /// Non-2xx transport status other than an expired session
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    #[error("{0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("A login request is already in progress")]
    LoginInProgress,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Api { .. } => ErrorKind::Application,
            ClientError::Http { status: 401, .. }
            | ClientError::SessionExpired
            | ClientError::Authentication(_)
            | ClientError::NotAuthenticated => ErrorKind::Authentication,
            ClientError::Http { .. } | ClientError::Network(_) => ErrorKind::Network,
            ClientError::LoginInProgress
            | ClientError::Storage(_)
            | ClientError::Decode(_)
            | ClientError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for a transient notification.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }

    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut builder = ValidationErrorBuilder::new();
        builder.add(field, message);
        ClientError::Validation(builder.into_errors())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fields.len() == 1 {
            let first = self.fields.values().next().and_then(|v| v.first());
            match first {
                Some(message) => write!(f, "{}", message),
                None => write!(f, "Validation failed"),
            }
        } else {
            write!(f, "Validation failed for {} fields", self.fields.len())
        }
    }
}

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: ValidationErrors,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .fields
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error of a `Result<(), String>` check under `field`.
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    /// Return Ok(()) if no errors, or Err(ClientError::Validation) otherwise
    pub fn finish(self) -> Result<(), ClientError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ClientError::validation_field("username", "Username is required").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ClientError::Api {
                code: 400,
                message: "bad".to_string()
            }
            .kind(),
            ErrorKind::Application
        );
        assert_eq!(ClientError::SessionExpired.kind(), ErrorKind::Authentication);
        assert_eq!(
            ClientError::Http {
                status: 401,
                message: "invalid credentials".to_string()
            }
            .kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            ClientError::Http {
                status: 502,
                message: NETWORK_ERROR_MESSAGE.to_string()
            }
            .kind(),
            ErrorKind::Network
        );
        assert_eq!(ClientError::Storage("disk".to_string()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_api_error_message_is_envelope_message() {
        let err = ClientError::Api {
            code: 409,
            message: "Project name already taken".to_string(),
        };
        assert_eq!(err.user_message(), "Project name already taken");
    }

    #[test]
    fn test_validation_single_field_message() {
        let err = ClientError::validation_field("password", "Password must be at least 6 characters");
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }

    #[test]
    fn test_validation_error_builder() {
        let mut builder = ValidationErrorBuilder::new();
        builder.add("username", "Username is required");
        builder.add("password", "Password is required");
        builder.add("username", "Username must be at least 3 characters");
        builder.check("email", Ok(()));

        assert!(!builder.is_empty());

        let errors = builder.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.field("username").unwrap().len(), 2);
        assert!(errors.field("email").is_none());
        assert_eq!(errors.to_string(), "Validation failed for 2 fields");
    }

    #[test]
    fn test_empty_builder_finishes_ok() {
        assert!(ValidationErrorBuilder::new().finish().is_ok());
    }
}
