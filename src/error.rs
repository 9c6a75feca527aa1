//! Error types for TandemDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TandemError
pub type Result<T> = std::result::Result<T, TandemError>;

/// Unified error type for TandemDB operations
#[derive(Debug, Error)]
pub enum TandemError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// End of the data file reached on a record boundary.
    ///
    /// Only used to terminate sequential scans; public operations never
    /// return it.
    #[error("end of file")]
    Eof,

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("{table} record with ID {id} already exists")]
    DuplicateId { table: &'static str, id: u32 },

    #[error("{table} record with ID {id} was not found")]
    NotFound { table: &'static str, id: u32 },

    #[error("{table} offset {offset} does not hold a record")]
    DanglingOffset { table: &'static str, offset: u32 },

    #[error("Malformed data: {0}")]
    Malformed(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Shell Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Command(String),
}

impl TandemError {
    /// True for lookups that failed because a record or slot is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TandemError::NotFound { .. } | TandemError::DanglingOffset { .. }
        )
    }
}
