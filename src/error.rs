//! Application error types for fwsync
//!
//! This module defines the error taxonomy used throughout the engine.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::models::ObjectKind;

/// Classified faults raised by the device-API collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Request timed out
    #[error("Device request timed out")]
    Timeout,

    /// Connection refused by the management plane
    #[error("Connection refused")]
    ConnectionRefused,

    /// Rate limited by the management plane
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Server-side error
    #[error("Server error: HTTP {0}")]
    Server(u16),

    /// Authentication rejected
    #[error("Unauthorized")]
    Unauthorized,

    /// Target object or endpoint does not exist
    #[error("Not found")]
    NotFound,

    /// API-level failure reported by the device
    #[error("Device API error: {0}")]
    Api(String),

    /// Response could not be decoded
    #[error("Invalid device response: {0}")]
    InvalidResponse(String),
}

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// A device fault surfaced by a single remote call
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A remote operation failed after all retry attempts
    #[error("Operation failed after {attempts} attempts: {source}")]
    Operation {
        /// Number of attempts made before giving up
        attempts: u32,
        /// The last device fault observed
        source: DeviceError,
    },

    /// A bulk read failed
    #[error("Failed to fetch {kind} objects: {source}")]
    Fetch {
        /// Collection that was being refreshed
        kind: ObjectKind,
        /// Underlying device fault
        source: DeviceError,
    },

    /// A commit job did not reach a terminal state in time
    #[error("Job {job_id} did not complete within {timeout_secs} seconds")]
    JobTimeout {
        /// Identifier of the job that was being awaited
        job_id: String,
        /// Configured wait budget in seconds
        timeout_secs: u64,
    },

    /// An object was rejected by local validation
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// A worker task was aborted or panicked
    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl EngineError {
    /// Wrap a retryable failure as a terminal operation error once the
    /// retry budget is spent. Non-device errors pass through unchanged.
    pub(crate) fn into_exhausted(self, attempts: u32) -> EngineError {
        match self {
            EngineError::Device(source) => EngineError::Operation { attempts, source },
            other => other,
        }
    }
}

/// Trait for determining if an error is retryable
pub trait RetryableError {
    /// Returns true if the error is retryable
    fn is_retryable(&self) -> bool;
}

impl RetryableError for DeviceError {
    /// The device layer does not distinguish transient faults from permanent
    /// rejections; every classified device error is eligible for retry.
    /// A stricter per-variant classification would slot in here.
    fn is_retryable(&self) -> bool {
        true
    }
}

impl RetryableError for EngineError {
    fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Device(err) if err.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: DeviceError message formatting
    #[test]
    fn test_device_error_messages() {
        assert_eq!(
            DeviceError::Timeout.to_string(),
            "Device request timed out"
        );
        assert_eq!(
            DeviceError::RateLimited(60).to_string(),
            "Rate limited, retry after 60 seconds"
        );
        assert_eq!(
            DeviceError::Server(503).to_string(),
            "Server error: HTTP 503"
        );
        assert_eq!(
            DeviceError::Api("bad xpath".to_string()).to_string(),
            "Device API error: bad xpath"
        );
    }

    // Test 2: every device fault is retryable under the baseline policy
    #[test]
    fn test_device_error_retryable() {
        assert!(DeviceError::Timeout.is_retryable());
        assert!(DeviceError::ConnectionRefused.is_retryable());
        assert!(DeviceError::RateLimited(30).is_retryable());
        assert!(DeviceError::Server(500).is_retryable());
        assert!(DeviceError::Unauthorized.is_retryable());
        assert!(DeviceError::NotFound.is_retryable());
        assert!(DeviceError::Api("malformed".to_string()).is_retryable());
    }

    // Test 3: only the device wrap is retryable at the engine level
    #[test]
    fn test_engine_error_retryable() {
        assert!(EngineError::Device(DeviceError::Timeout).is_retryable());

        assert!(!EngineError::Operation {
            attempts: 3,
            source: DeviceError::Timeout,
        }
        .is_retryable());
        assert!(!EngineError::InvalidObject("no value".to_string()).is_retryable());
        assert!(!EngineError::Worker("aborted".to_string()).is_retryable());
        assert!(!EngineError::JobTimeout {
            job_id: "17".to_string(),
            timeout_secs: 600,
        }
        .is_retryable());
    }

    // Test 4: From conversion preserves the device fault
    #[test]
    fn test_engine_error_from_device_error() {
        let err: EngineError = DeviceError::ConnectionRefused.into();
        match err {
            EngineError::Device(DeviceError::ConnectionRefused) => (),
            _ => panic!("Expected EngineError::Device(ConnectionRefused)"),
        }
    }

    // Test 5: exhaustion wraps the last device fault with the attempt count
    #[test]
    fn test_into_exhausted() {
        let err = EngineError::Device(DeviceError::Server(503)).into_exhausted(3);
        match err {
            EngineError::Operation { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source, DeviceError::Server(503));
            }
            _ => panic!("Expected EngineError::Operation"),
        }

        // non-device errors are passed through untouched
        let err = EngineError::InvalidObject("x".to_string()).into_exhausted(3);
        assert!(matches!(err, EngineError::InvalidObject(_)));
    }

    // Test 6: operation and timeout error messages
    #[test]
    fn test_engine_error_messages() {
        let err = EngineError::Operation {
            attempts: 3,
            source: DeviceError::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "Operation failed after 3 attempts: Device request timed out"
        );

        let err = EngineError::JobTimeout {
            job_id: "42".to_string(),
            timeout_secs: 10,
        };
        assert_eq!(err.to_string(), "Job 42 did not complete within 10 seconds");
    }
}
