//! Audit collaborator
//!
//! Orchestrators report every concluded operation here. The poller itself
//! never audits.

use crate::error::Result;
use crate::kit::Kit;
use crate::operation::{OperationKind, OperationState, ResourceKind};
use crate::vendor::Vendor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One audited operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub rid: String,
    pub vendor: Vendor,
    pub kind: OperationKind,
    pub resource: ResourceKind,
    /// Cloud ids the operation targeted (or created, for successful creates)
    pub resource_ids: Vec<String>,
    pub outcome: OperationState,
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        kt: &Kit,
        vendor: Vendor,
        kind: OperationKind,
        resource: ResourceKind,
        resource_ids: Vec<String>,
        outcome: OperationState,
    ) -> Self {
        Self {
            rid: kt.rid().to_string(),
            vendor,
            kind,
            resource,
            resource_ids,
            outcome,
            at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<()>;
}

/// Writes audit records to the `audit` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<()> {
        tracing::info!(
            target: "audit",
            rid = %record.rid,
            vendor = %record.vendor,
            kind = %record.kind,
            resource = %record.resource,
            ids = ?record.resource_ids,
            outcome = %record.outcome,
            "cloud operation audited"
        );
        Ok(())
    }
}

/// Keeps audit records in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<()> {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
        Ok(())
    }
}

/// Record an audit entry; a failing sink is logged but never fails the operation
pub async fn audit_quietly(sink: &dyn AuditSink, record: AuditRecord) {
    let rid = record.rid.clone();
    if let Err(e) = sink.record(record).await {
        tracing::warn!(rid = %rid, error = %e, "failed to record audit entry");
    }
}
