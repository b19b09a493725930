//! Cloud operation error types

use crate::result::BaseDoneResult;
use std::time::Duration;
use thiserror::Error;

/// Cloud operation errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Vendor transport error: {0}")]
    VendorTransport(String),

    #[error("Vendor contract violation: {0}")]
    VendorContractViolation(String),

    #[error("Cloud vendor error: {0}")]
    VendorError(String),

    #[error(
        "Polling timeout after {rounds} rounds ({elapsed:?}), {} task(s) still pending",
        pending.len()
    )]
    PollingTimeout {
        rounds: u32,
        elapsed: Duration,
        /// Task ids that never reached a terminal status
        pending: Vec<String>,
        /// Classification of the ids that did finish before the deadline
        partial: BaseDoneResult,
    },

    #[error("Partially failed: {message}")]
    PartialFailed {
        message: String,
        result: BaseDoneResult,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Vendor not supported: {0}")]
    UnsupportedVendor(String),

    #[error("Client initialization failed: {0}")]
    ClientInit(String),

    #[error("Invalid operation state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidParameter,
    CloudVendorError,
    VendorTransport,
    ContractViolation,
    Timeout,
    PartialFailed,
    Cancelled,
    Unknown,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InvalidParameter => "invalid_parameter",
            ErrorCode::CloudVendorError => "cloud_vendor_error",
            ErrorCode::VendorTransport => "vendor_transport",
            ErrorCode::ContractViolation => "contract_violation",
            ErrorCode::Timeout => "timeout",
            ErrorCode::PartialFailed => "partial_failed",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl CloudError {
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        CloudError::InvalidParameter(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CloudError::InvalidParameter(_) | CloudError::UnsupportedVendor(_) => {
                ErrorCode::InvalidParameter
            }
            CloudError::VendorError(_) => ErrorCode::CloudVendorError,
            CloudError::VendorTransport(_) => ErrorCode::VendorTransport,
            CloudError::VendorContractViolation(_) => ErrorCode::ContractViolation,
            CloudError::PollingTimeout { .. } => ErrorCode::Timeout,
            CloudError::PartialFailed { .. } => ErrorCode::PartialFailed,
            CloudError::Cancelled(_) => ErrorCode::Cancelled,
            _ => ErrorCode::Unknown,
        }
    }

    /// Only transport failures are worth re-invoking; everything else either
    /// failed before the network or carries an authoritative vendor answer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CloudError::VendorTransport(_))
    }

    /// Classification attached to timeout and partial-failure errors
    pub fn partial_result(&self) -> Option<&BaseDoneResult> {
        match self {
            CloudError::PollingTimeout { partial, .. } => Some(partial),
            CloudError::PartialFailed { result, .. } => Some(result),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(CloudError::VendorTransport("reset".into()).is_retryable());
        assert!(!CloudError::VendorContractViolation("no id".into()).is_retryable());
        assert!(!CloudError::invalid_param("port").is_retryable());
        assert!(!CloudError::Cancelled("ctrl-c".into()).is_retryable());
    }

    #[test]
    fn test_timeout_carries_partial() {
        let mut partial = BaseDoneResult::new();
        partial.success_cloud_ids.push("task-1".into());
        let err = CloudError::PollingTimeout {
            rounds: 3,
            elapsed: Duration::from_millis(50),
            pending: vec!["task-2".into()],
            partial,
        };

        assert_eq!(err.code(), ErrorCode::Timeout);
        assert_eq!(err.partial_result().unwrap().success_cloud_ids, vec!["task-1"]);
        assert!(err.to_string().contains("1 task(s) still pending"));
    }
}
