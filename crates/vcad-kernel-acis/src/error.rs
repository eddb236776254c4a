//! Error types for ACIS SAT/SAB operations.

use thiserror::Error;

/// Errors that can occur while loading or exporting ACIS data.
#[derive(Error, Debug)]
pub enum AcisError {
    /// Malformed header, unresolvable pointer or a token that does not fit
    /// the entity layout.
    #[error("Parsing error{}: {message}", record.map(|n| format!(" in record {}", n)).unwrap_or_default())]
    Parsing {
        /// Record number where the error occurred, if known.
        record: Option<usize>,
        /// Error message.
        message: String,
    },

    /// A referenced entity is not part of the exported record set.
    #[error("Invalid link structure: {0}")]
    InvalidLinkStructure(String),

    /// The graph cannot be written without losing data, or the requested
    /// export version is not supported.
    #[error("Export error: {0}")]
    Export(String),

    /// Version code without an entry in the ACIS version table.
    #[error("Invalid ACIS version number: {0}")]
    InvalidVersion(i32),
}

impl AcisError {
    /// Create a parsing error.
    pub fn parsing(record: Option<usize>, message: impl Into<String>) -> Self {
        Self::Parsing {
            record,
            message: message.into(),
        }
    }

    /// Create an export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    /// Attach a record number to a parsing error that has none yet.
    pub fn in_record(self, num: usize) -> Self {
        match self {
            Self::Parsing {
                record: None,
                message,
            } => Self::Parsing {
                record: Some(num),
                message,
            },
            other => other,
        }
    }

    /// Create a type mismatch error for a reference field.
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::parsing(
            None,
            format!("expected entity type '{expected}', got '{actual}'"),
        )
    }
}

/// Result type for ACIS operations.
pub type Result<T> = std::result::Result<T, AcisError>;
