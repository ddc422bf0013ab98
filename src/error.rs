//! Error types for denseid
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using NumberError
pub type Result<T> = std::result::Result<T, NumberError>;

/// Unified error type for numbering operations
#[derive(Debug, Error)]
pub enum NumberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Invocation / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    // -------------------------------------------------------------------------
    // Offset Table Errors
    // -------------------------------------------------------------------------
    #[error("Bucket {bucket} out of range (bucket count {bucket_count})")]
    Range { bucket: u64, bucket_count: u32 },

    #[error("Bucket {bucket} arrived after bucket {previous}; counts must be strictly ascending")]
    Sequencing { previous: u32, bucket: u32 },

    #[error("Record count {0} does not fit in a 32-bit id")]
    Overflow(u64),

    // -------------------------------------------------------------------------
    // Assignment Errors
    // -------------------------------------------------------------------------
    #[error("Count mismatch in bucket {bucket}: expected to end at id {expected}, ended at {actual}")]
    CountMismatch {
        bucket: u32,
        expected: u64,
        actual: u64,
    },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Corrupted data: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Execution Errors
    // -------------------------------------------------------------------------
    #[error("Task {task} of job '{job}' failed after {attempts} attempt(s): {source}")]
    TaskFailed {
        job: String,
        task: String,
        attempts: u32,
        #[source]
        source: Box<NumberError>,
    },

    #[error("Verification failed: {0}")]
    Verification(String),
}

impl NumberError {
    /// Whether re-running the failed task from scratch could succeed.
    ///
    /// Only infrastructure faults qualify. Range, sequencing and count errors
    /// are deterministic and surface to the operator on the first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NumberError::Io(_))
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            NumberError::Argument(_) | NumberError::Config(_) => 2,
            _ => 1,
        }
    }

    /// The innermost error, looking through task failure wrappers
    pub fn root_cause(&self) -> &NumberError {
        match self {
            NumberError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<bincode::Error> for NumberError {
    fn from(e: bincode::Error) -> Self {
        NumberError::Serialization(e.to_string())
    }
}
