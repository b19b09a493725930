//! HCM Cloud core
//!
//! Vendor-agnostic building blocks shared by every HCM vendor adaptor.
//! Cloud vendor APIs are asynchronous: a mutating call returns a task id and
//! the real outcome must be discovered by polling. This crate provides the
//! polling engine and everything an orchestrator needs around it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │        Operation Orchestrator (vendor crate)       │
//! │  validate → issue call → task id → poll → report   │
//! └───────┬───────────────────┬──────────────────────┘
//!         │                   │
//! ┌───────▼────────┐  ┌───────▼────────────────────────┐
//! │ Poller<H>      │  │ AuditSink / ResourceStore       │
//! │ PollingHandler │  │ (collaborators, orchestrator)   │
//! └───────┬────────┘  └────────────────────────────────┘
//!         │ poll / done
//! ┌───────▼───────────────────────────┐
//! │ vendor task client (tcloud, huawei)│
//! └───────────────────────────────────┘
//! ```

pub mod audit;
pub mod classifier;
pub mod error;
pub mod kit;
pub mod operation;
pub mod poller;
pub mod result;
pub mod retry;
pub mod store;
pub mod vendor;

// Re-exports
pub use audit::{AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink, audit_quietly};
pub use classifier::{
    AccountRegion, BATCH_OPERATION_MAX_LIMIT, ResourceBasicInfo, classify_by_account_region,
    classify_by_vendor, classify_slice, ensure_batch_limit,
};
pub use error::{CloudError, ErrorCode, Result};
pub use kit::Kit;
pub use operation::{
    Operation, OperationKind, OperationState, ResourceKind, conclude_batch,
};
pub use poller::{PollState, Poller, PollerOption, PollingHandler, RoundInterval};
pub use result::BaseDoneResult;
pub use retry::{RetryConfig, retry_with_policy};
pub use store::{FileResourceStore, ResourceRecord, ResourceStore, StoreSnapshot};
pub use vendor::Vendor;
