//! Sink error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SinkError>;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A configured field has no value in the reading
    #[error("Code {code} [{name}] not present in reading")]
    MissingField { code: u32, name: String },

    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    /// A field would shadow one of the sink's own columns
    #[error("Column name '{0}' is reserved")]
    ReservedColumn(String),

    #[error("No fields configured for table '{0}'")]
    NoFields(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
