//! Domain-level errors.
//!
//! These errors represent failures to shape stored payloads into domain
//! types. They are independent of the document store that produced them.

use thiserror::Error;

/// Domain-specific errors.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Stored payload does not match the expected shape
    #[error("Malformed document {id}: {reason}")]
    MalformedDocument { id: String, reason: String },
}

impl DomainError {
    /// Create a malformed document error
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::MalformedDocument {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
