//! Error types for apiseed
//!
//! Errors are split in two tiers: [`Error`] is the crate-wide base type and
//! [`DataError`] carries the data-layer failures callers usually branch on.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Data-layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} with {field} '{value}' already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Invalid data: {0}")]
    Invalid(String),
}

impl Error {
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    pub fn migration(msg: impl Into<String>) -> Self {
        Error::Migration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::Data(DataError::NotFound {
            entity,
            id: id.to_string(),
        })
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::Data(DataError::Invalid(msg.into()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Data(DataError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = Error::not_found("DataLog", 42);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "DataLog 42 not found");
    }

    #[test]
    fn conflict_is_not_a_not_found() {
        let err: Error = DataError::Conflict {
            entity: "User",
            field: "email",
            value: "a@b.io".into(),
        }
        .into();
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "User with email 'a@b.io' already exists");
    }
}
