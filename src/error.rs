//! Error types for the request governor
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Governor Error Enum ==
/// Configuration and input errors.
///
/// These are raised when registering policies or inserting entries, never
/// from inside an admission decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernorError {
    /// Cache key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Endpoint policy has a non-positive quota or window
    #[error("Invalid policy for endpoint '{endpoint}': {reason}")]
    InvalidPolicy { endpoint: String, reason: String },

    /// Configuration value could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Admission Denied ==
/// Quota for an endpoint/client pair is exhausted.
///
/// Recoverable: the caller may retry after `retry_after_ms`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Admission denied for endpoint '{endpoint}' (client '{client_id}'), retry after {retry_after_ms}ms")]
pub struct AdmissionDenied {
    pub endpoint: String,
    pub client_id: String,
    pub retry_after_ms: u64,
}

impl AdmissionDenied {
    /// Suggested retry delay as a `Duration`.
    pub fn retry_after(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_after_ms)
    }
}

// == Governed Call Error ==
/// Outcome of a failed governed call.
///
/// Producer failures are carried unchanged in `Producer`.
#[derive(Error, Debug)]
pub enum GovernedCallError<E> {
    #[error(transparent)]
    AdmissionDenied(#[from] AdmissionDenied),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Producer(E),
}

impl<E> GovernedCallError<E> {
    /// Returns the retry hint when the call was denied by admission control.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            GovernedCallError::AdmissionDenied(denied) => Some(denied.retry_after_ms),
            _ => None,
        }
    }

    /// Returns the producer's own error, if that is what failed.
    pub fn into_producer_error(self) -> Option<E> {
        match self {
            GovernedCallError::Producer(err) => Some(err),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the governor.
pub type Result<T> = std::result::Result<T, GovernorError>;
