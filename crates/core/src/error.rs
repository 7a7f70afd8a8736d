//! Error taxonomy shared by every crate in the workspace
//!
//! Pure scoring code never produces these; they surface from the boundary
//! (service operations) and from injected collaborators.

use thiserror::Error;

/// Coarse classification used by transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::BadRequest => "bad_request",
            Self::Internal => "internal",
        }
    }
}

/// Growth engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Entity missing, or owned by another practice
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Duplicate active assignment, outreach inside a cooldown, stale write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid state transition or inapplicable request
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Message delivery error: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Storage(_) | Self::Delivery(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(Error::not_found("lead", "abc").kind(), ErrorKind::NotFound);
        assert_eq!(Error::Conflict("x".into()).kind(), ErrorKind::Conflict);
        assert_eq!(Error::BadRequest("x".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(Error::Storage("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("lead", "42");
        assert_eq!(err.to_string(), "lead not found: 42");
    }
}
