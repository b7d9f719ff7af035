//! Errors reported by collaborator implementations

use thiserror::Error;

/// Result alias for collaborator calls
pub type InterfaceResult<T> = Result<T, InterfaceError>;

/// Failure of an external collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterfaceError {
    /// The backing store could not be read
    #[error("Storage error: {0}")]
    Storage(String),

    /// A remote collaborator could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The collaborator rejected the request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<std::io::Error> for InterfaceError {
    fn from(err: std::io::Error) -> Self {
        InterfaceError::Storage(err.to_string())
    }
}
