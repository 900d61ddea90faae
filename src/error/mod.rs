//! Error types for tunepool.

use std::io;

use thiserror::Error;

use crate::job::JobId;

/// Result type alias for tunepool operations.
pub type Result<T> = std::result::Result<T, TunepoolError>;

/// Failure modes of the job execution layer.
///
/// Configuration errors surface at construction time, submission errors at
/// `submit`, and execution/timeout errors only when a job's result is
/// retrieved.
#[derive(Error, Debug)]
pub enum TunepoolError {
    /// Invalid or missing configuration field. Always raised eagerly, never
    /// deferred to submission time.
    #[error("Invalid executor configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The worker pool has been closed and no longer accepts submissions.
    #[error("Job submission rejected: pool is closed")]
    PoolClosed,

    /// The submitted job raised a failure when it ran.
    #[error("Job execution failed: {message}")]
    ExecutionFailed {
        /// Human-readable failure description.
        message: String,
    },

    /// Result retrieval exceeded the configured wait duration.
    ///
    /// Distinguishable from [`TunepoolError::ExecutionFailed`] so callers can
    /// choose between retrying and abandoning the job.
    #[error("Job timed out after {seconds}s")]
    Timeout {
        /// Wait duration in seconds.
        seconds: u64,
    },

    /// The job's result was already taken by an earlier retrieval.
    #[error("Result of job {id} was already retrieved")]
    ResultRetrieved {
        /// Identifier of the consumed job.
        id: JobId,
    },

    /// Failure reported by the environment service boundary.
    #[error("Environment service error: {message}")]
    Service {
        /// Description from the service.
        message: String,
    },

    /// I/O error from a backend adapter.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
