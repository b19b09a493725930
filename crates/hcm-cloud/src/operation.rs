//! Lifecycle of a single vendor-mutating operation

use crate::error::{CloudError, Result};
use crate::kit::Kit;
use crate::result::BaseDoneResult;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Kind of mutation performed on a cloud resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Start,
    Stop,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
            OperationKind::Start => write!(f, "start"),
            OperationKind::Stop => write!(f, "stop"),
        }
    }
}

/// Resource the operation acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Listener,
    UrlRule,
    DomainAttribute,
    Cvm,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Listener => write!(f, "listener"),
            ResourceKind::UrlRule => write!(f, "url_rule"),
            ResourceKind::DomainAttribute => write!(f, "domain_attribute"),
            ResourceKind::Cvm => write!(f, "cvm"),
        }
    }
}

/// Operation state
///
/// `Validated -> Issued -> Polling (-> Polling)* -> terminal`. Any
/// non-terminal state may also jump straight to a failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Validated,
    Issued,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    VendorError,
    Cancelled,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            OperationState::Validated | OperationState::Issued | OperationState::Polling
        )
    }

    fn can_advance_to(&self, next: OperationState) -> bool {
        use OperationState::*;
        match (self, next) {
            (Validated, Issued) | (Issued, Polling) | (Polling, Polling) => true,
            (Polling, Succeeded) => true,
            (from, Failed | TimedOut | VendorError | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Terminal state corresponding to an error
    pub fn from_error(err: &CloudError) -> Self {
        match err {
            CloudError::PollingTimeout { .. } => OperationState::TimedOut,
            CloudError::Cancelled(_) => OperationState::Cancelled,
            CloudError::VendorError(_)
            | CloudError::VendorContractViolation(_)
            | CloudError::PartialFailed { .. } => OperationState::VendorError,
            _ => OperationState::Failed,
        }
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationState::Validated => "validated",
            OperationState::Issued => "issued",
            OperationState::Polling => "polling",
            OperationState::Succeeded => "succeeded",
            OperationState::Failed => "failed",
            OperationState::TimedOut => "timed_out",
            OperationState::VendorError => "vendor_error",
            OperationState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Tracks one orchestration call through its states
#[derive(Debug)]
pub struct Operation {
    rid: String,
    kind: OperationKind,
    resource: ResourceKind,
    state: OperationState,
    started: Instant,
}

impl Operation {
    /// Start tracking an operation whose input already passed validation
    pub fn begin(kt: &Kit, kind: OperationKind, resource: ResourceKind) -> Self {
        Self {
            rid: kt.rid().to_string(),
            kind,
            resource,
            state: OperationState::Validated,
            started: Instant::now(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn advance(&mut self, next: OperationState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(CloudError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(
            rid = %self.rid,
            "{} {}: {} -> {}",
            self.kind,
            self.resource,
            self.state,
            next
        );
        self.state = next;
        Ok(())
    }

    /// Move to the terminal state matching `result` and return it
    ///
    /// Concluding an operation that is already terminal keeps its state.
    pub fn conclude<T>(&mut self, result: &Result<T>) -> OperationState {
        if self.state.is_terminal() {
            return self.state;
        }
        let next = match result {
            Ok(_) if self.state == OperationState::Polling => OperationState::Succeeded,
            Ok(_) => OperationState::Failed,
            Err(err) => OperationState::from_error(err),
        };
        self.state = next;

        let elapsed = self.started.elapsed();
        match result {
            Ok(_) => tracing::info!(
                rid = %self.rid,
                ?elapsed,
                "{} {} {}",
                self.kind,
                self.resource,
                next
            ),
            Err(err) => tracing::error!(
                rid = %self.rid,
                ?elapsed,
                error = %err,
                "{} {} {}",
                self.kind,
                self.resource,
                next
            ),
        }
        next
    }
}

/// Turn a finished batch classification into the caller-facing outcome
///
/// No success at all is a vendor error even when the vendor acknowledged the
/// call; any failed or unknown id makes the batch a partial failure.
pub fn conclude_batch(result: BaseDoneResult, what: &str) -> Result<BaseDoneResult> {
    if result.success_cloud_ids.is_empty() {
        return Err(CloudError::VendorError(format!(
            "no {what} succeeded ({result})"
        )));
    }
    if !result.failed_cloud_ids.is_empty() || !result.unknown_cloud_ids.is_empty() {
        return Err(CloudError::PartialFailed {
            message: format!("{what}: {result}"),
            result,
        });
    }
    Ok(result)
}
