//! HuaWei adaptor

use crate::client::{EcsApi, EcsClientSet};
use hcm_cloud::{AuditSink, CloudError, PollerOption, Result, TracingAuditSink};
use std::sync::Arc;

pub struct HuaWei {
    clients: Arc<dyn EcsClientSet>,
    pub(crate) poller_option: PollerOption,
    pub(crate) audit: Arc<dyn AuditSink>,
}

impl HuaWei {
    pub fn new(clients: Arc<dyn EcsClientSet>) -> Self {
        Self {
            clients,
            poller_option: PollerOption::instance_job_default(),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_poller_option(mut self, option: PollerOption) -> Self {
        self.poller_option = option;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn ecs_client(&self, account_id: &str, region: &str) -> Result<Arc<dyn EcsApi>> {
        self.clients
            .ecs_client(account_id, region)
            .map_err(|e| match e {
                CloudError::ClientInit(_) => e,
                other => CloudError::ClientInit(format!(
                    "init huawei ecs client failed, account: {account_id}, region: {region}, err: {other}"
                )),
            })
    }
}
