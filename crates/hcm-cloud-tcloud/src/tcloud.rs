//! TCloud adaptor and the lifecycle shared by every CLB operation

use crate::client::{ClbApi, ClientSet};
use crate::handler::TaskStatusPollingHandler;
use crate::options::DescribeTaskStatusOption;
use crate::status::ClbTaskStatus;
use crate::types::{AsyncTaskResponse, DescribeTaskStatusRequest};
use hcm_cloud::{
    AuditRecord, AuditSink, BaseDoneResult, CloudError, Kit, Operation, OperationKind,
    OperationState, Poller, PollerOption, ResourceKind, Result, TracingAuditSink, Vendor,
    audit_quietly,
};
use std::future::Future;
use std::sync::Arc;

/// TCloud load balancer adaptor
pub struct TCloud {
    clients: Arc<dyn ClientSet>,
    poller_option: PollerOption,
    audit: Arc<dyn AuditSink>,
}

/// What an orchestration call acts on
pub(crate) struct Target<'a> {
    pub kind: OperationKind,
    pub resource: ResourceKind,
    pub region: &'a str,
    /// Ids reported to the audit sink when the call produces none itself
    pub ids: Vec<String>,
}

impl TCloud {
    pub fn new(clients: Arc<dyn ClientSet>) -> Self {
        Self {
            clients,
            poller_option: PollerOption::load_balancer_default(),
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

    pub fn poller_option(&self) -> &PollerOption {
        &self.poller_option
    }

    pub fn clb_client(&self, region: &str) -> Result<Arc<dyn ClbApi>> {
        self.clients.clb_client(region).map_err(|e| match e {
            CloudError::ClientInit(_) => e,
            other => CloudError::ClientInit(format!(
                "init tcloud clb client failed, region: {region}, err: {other}"
            )),
        })
    }

    /// Single status query; `None` when the vendor reports no status yet
    pub async fn describe_task_status(
        &self,
        kt: &Kit,
        opt: &DescribeTaskStatusOption,
    ) -> Result<Option<ClbTaskStatus>> {
        opt.validate()?;
        let api = self.clb_client(&opt.region)?;
        let req = DescribeTaskStatusRequest {
            task_id: opt.task_id.clone(),
        };
        let resp = api.describe_task_status(kt, &req).await?;
        Ok(resp.status.map(ClbTaskStatus::from_code))
    }

    /// Poll arbitrary CLB task ids in `region` until they settle
    ///
    /// The raw classification is returned; no success threshold is applied.
    pub async fn wait_tasks(
        &self,
        kt: &Kit,
        region: &str,
        task_ids: &[String],
    ) -> Result<BaseDoneResult> {
        if region.trim().is_empty() {
            return Err(CloudError::invalid_param("region is required"));
        }
        self.poller(region)
            .poll_until_settled(self, kt, task_ids, &self.poller_option)
            .await
    }

    pub(crate) fn poller(&self, region: &str) -> Poller<TaskStatusPollingHandler> {
        Poller::new(TaskStatusPollingHandler::new(region))
    }

    /// Run one mutating call through issue, polling and audit
    ///
    /// `objects` names the cloud objects the task acted on; the settled task
    /// outcome, and the pending ids of a polling timeout, are reported in
    /// terms of those ids rather than the request id.
    pub(crate) async fn execute<R, F, Fut, O>(
        &self,
        kt: &Kit,
        target: Target<'_>,
        issue: F,
        objects: O,
    ) -> Result<BaseDoneResult>
    where
        R: AsyncTaskResponse,
        F: FnOnce(Arc<dyn ClbApi>) -> Fut,
        Fut: Future<Output = Result<R>>,
        O: FnOnce(&R) -> Result<Vec<String>>,
    {
        let mut op = Operation::begin(kt, target.kind, target.resource);
        let outcome = self.drive(kt, &mut op, &target, issue, objects).await;
        let state = op.conclude(&outcome);

        let ids = match &outcome {
            Ok(result) if !result.success_cloud_ids.is_empty() => result.success_cloud_ids.clone(),
            _ => target.ids.clone(),
        };
        self.audit(kt, &target, ids, state).await;
        outcome
    }

    async fn drive<R, F, Fut, O>(
        &self,
        kt: &Kit,
        op: &mut Operation,
        target: &Target<'_>,
        issue: F,
        objects: O,
    ) -> Result<BaseDoneResult>
    where
        R: AsyncTaskResponse,
        F: FnOnce(Arc<dyn ClbApi>) -> Fut,
        Fut: Future<Output = Result<R>>,
        O: FnOnce(&R) -> Result<Vec<String>>,
    {
        let api = self.clb_client(target.region)?;
        let resp = issue(api).await.inspect_err(|e| {
            tracing::error!(
                rid = kt.rid(),
                region = target.region,
                error = %e,
                "{} tcloud {} failed",
                target.kind,
                target.resource
            );
        })?;
        op.advance(OperationState::Issued)?;

        let request_id = resp
            .request_id()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                CloudError::VendorContractViolation(format!(
                    "{} {} response carries no RequestId",
                    target.kind, target.resource
                ))
            })?
            .to_string();

        op.advance(OperationState::Polling)?;
        let settled = match self
            .poller(target.region)
            .poll_until_settled(self, kt, std::slice::from_ref(&request_id), &self.poller_option)
            .await
        {
            Ok(settled) => settled,
            Err(CloudError::PollingTimeout {
                rounds,
                elapsed,
                pending,
                partial,
            }) => {
                let ids = objects(&resp).unwrap_or_else(|e| {
                    tracing::warn!(
                        rid = kt.rid(),
                        request_id = %request_id,
                        error = %e,
                        "cannot name the objects of a timed out task, reporting requested ids"
                    );
                    target.ids.clone()
                });
                return Err(CloudError::PollingTimeout {
                    rounds,
                    elapsed,
                    pending: pending.iter().flat_map(|_| ids.iter().cloned()).collect(),
                    partial: partial.expand(|_| ids.clone()),
                });
            }
            Err(e) => return Err(e),
        };

        if settled.success_cloud_ids.is_empty() {
            return Err(CloudError::VendorError(format!(
                "no {} {} succeeded, TCloud RequestId: {request_id}",
                target.resource, target.kind
            )));
        }

        let ids = objects(&resp)?;
        Ok(settled.expand(|_| ids.clone()))
    }

    pub(crate) async fn audit(
        &self,
        kt: &Kit,
        target: &Target<'_>,
        ids: Vec<String>,
        outcome: OperationState,
    ) {
        let record = AuditRecord::new(kt, Vendor::TCloud, target.kind, target.resource, ids, outcome);
        audit_quietly(self.audit.as_ref(), record).await;
    }
}
