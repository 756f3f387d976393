//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kinphase operations
#[derive(Error, Debug)]
pub enum KinphaseError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse errors in streamed input (malformed record, bad genotype cell)
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid data errors (sample count mismatch, non-monotone positions)
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Pedigree errors (missing parent referenced, ancestry cycle)
    #[error("Pedigree error: {message}")]
    Pedigree { message: String },

    /// Genetic map errors (non-monotone positions, mismatched chromosome)
    #[error("Genetic map error: {message}")]
    Map { message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File not found errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Internal invariant violations; always fatal
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using KinphaseError
pub type Result<T> = std::result::Result<T, KinphaseError>;

impl KinphaseError {
    /// Create a parse error with the offending line number
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a pedigree error
    pub fn pedigree(message: impl Into<String>) -> Self {
        Self::Pedigree {
            message: message.into(),
        }
    }

    /// Create a genetic map error
    pub fn map(message: impl Into<String>) -> Self {
        Self::Map {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Process exit code for this error: 1 for usage errors, 2 for input
    /// errors, 3 for internal errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            Self::Io(_)
            | Self::Parse { .. }
            | Self::InvalidData { .. }
            | Self::Pedigree { .. }
            | Self::Map { .. }
            | Self::FileNotFound { .. } => 2,
            Self::Internal { .. } => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(KinphaseError::config("bad flag").exit_code(), 1);
        assert_eq!(KinphaseError::parse(7, "truncated record").exit_code(), 2);
        assert_eq!(KinphaseError::map("non-monotone bp").exit_code(), 2);
        assert_eq!(
            KinphaseError::internal("bucket index out of range").exit_code(),
            3
        );
    }
}
