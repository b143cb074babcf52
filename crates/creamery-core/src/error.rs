//! Error types for the creamery catalog.

use thiserror::Error;

use crate::messages;

/// Result type alias using creamery's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for catalog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No product row matches the business key
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Field name outside the recognized field set
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Lookup reclamation sweep failed
    #[error("Reclaim error: {0}")]
    Reclaim(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-facing classification of an [`Error`].
///
/// The API layer renders `Validation` as a bad request, `NotFound` as
/// "no such item" and everything else as a generic service failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before any storage access.
    Validation,
    /// The business key has no matching row.
    NotFound,
    /// Storage, commit, or internal failure.
    Storage,
}

impl Error {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) | Error::UnknownField(_) | Error::Serialization(_) => {
                ErrorKind::Validation
            }
            Error::ItemNotFound(_) => ErrorKind::NotFound,
            Error::Database(_) | Error::Reclaim(_) | Error::Internal(_) => ErrorKind::Storage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Message safe to hand to external callers.
    ///
    /// Validation details are echoed back; storage errors collapse to a
    /// generic message so raw driver text never leaves the engine.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation => format!("{}: {}", messages::REQUEST_INVALID, self.detail()),
            ErrorKind::NotFound => messages::NO_RECORDS_FOUND.to_string(),
            ErrorKind::Storage => messages::GENERIC_ERROR.to_string(),
        }
    }

    fn detail(&self) -> String {
        match self {
            Error::InvalidInput(msg) | Error::Serialization(msg) => msg.clone(),
            Error::UnknownField(name) => format!("unknown field '{}'", name),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_item_not_found() {
        let err = Error::ItemNotFound("p1".to_string());
        assert_eq!(err.to_string(), "Item not found: p1");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("field mask is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: field mask is empty");
    }

    #[test]
    fn test_error_display_unknown_field() {
        let err = Error::UnknownField("flavour".to_string());
        assert_eq!(err.to_string(), "Unknown field: flavour");
    }

    #[test]
    fn test_error_display_reclaim() {
        let err = Error::Reclaim("ingredient sweep failed".to_string());
        assert_eq!(err.to_string(), "Reclaim error: ingredient sweep failed");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::InvalidInput("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::UnknownField("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(Error::ItemNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::Database(sqlx::Error::RowNotFound).kind(),
            ErrorKind::Storage
        );
        assert_eq!(Error::Internal("x".into()).kind(), ErrorKind::Storage);
        assert_eq!(Error::Reclaim("x".into()).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_public_message_hides_storage_detail() {
        let err = Error::Database(sqlx::Error::Protocol(
            "UNIQUE constraint failed: product.product_id".to_string(),
        ));
        let msg = err.public_message();
        assert_eq!(msg, messages::GENERIC_ERROR);
        assert!(!msg.contains("UNIQUE"));
    }

    #[test]
    fn test_public_message_not_found() {
        let err = Error::ItemNotFound("p1".to_string());
        assert_eq!(err.public_message(), messages::NO_RECORDS_FOUND);
    }

    #[test]
    fn test_public_message_echoes_validation_detail() {
        let err = Error::UnknownField("flavour".to_string());
        assert_eq!(
            err.public_message(),
            "Request invalid: unknown field 'flavour'"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
