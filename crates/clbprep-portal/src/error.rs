//! Portal error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortalError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("invalid email or password")]
    Unauthorized,

    #[error("role '{role}' may not access {area}")]
    Forbidden { role: String, area: String },

    #[error("session expired or revoked")]
    SessionExpired,
}

impl PortalError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        PortalError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        PortalError::InvalidInput {
            field,
            message: message.into(),
        }
    }
}
