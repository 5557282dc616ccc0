//! Error taxonomy for document ingestion.
//!
//! Every stage of the per-document pipeline returns [`IngestError`]. The
//! batch driver wraps failures in [`DocumentError`] so the offending path
//! always travels with the cause.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while ingesting a single document.
#[derive(Debug, Error)]
pub enum IngestError {
    /// None of the candidate two-byte encodings decoded the input cleanly.
    #[error("no candidate encoding decoded cleanly (tried {tried})")]
    Decode { tried: String },

    /// The decoded text is not well-formed markup.
    #[error("malformed markup at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// A container the walker requires is absent.
    #[error("required element <{0}> not found")]
    Structure(String),

    /// The store rejected a write because of a uniqueness, foreign-key or
    /// check constraint.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::ForeignKeyViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation => {
                    return IngestError::Constraint(db_err.message().to_string());
                }
                _ => {}
            }
        }
        IngestError::Database(err)
    }
}

/// A per-document failure with the document path attached.
#[derive(Debug, Error)]
#[error("{}: {source}", path.display())]
pub struct DocumentError {
    pub path: PathBuf,
    #[source]
    pub source: IngestError,
}

impl DocumentError {
    pub fn new(path: impl Into<PathBuf>, source: IngestError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}
