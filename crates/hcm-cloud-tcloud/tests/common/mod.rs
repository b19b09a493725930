//! Scripted CLB client shared by the orchestrator tests

#![allow(dead_code)]

use async_trait::async_trait;
use hcm_cloud::{CloudError, Kit, MemoryAuditSink, PollerOption, Result, RoundInterval};
use hcm_cloud_tcloud::types::{
    CreateListenerRequest, CreateListenerResponse, CreateRuleRequest, CreateRuleResponse,
    DeleteListenersRequest, DeleteRuleRequest, DescribeTaskStatusRequest,
    DescribeTaskStatusResponse, ModifyDomainAttributesRequest, ModifyListenerRequest,
    ModifyRuleRequest, TaskResponse,
};
use hcm_cloud_tcloud::{ClbApi, ClientSet, TCloud};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SUCCESS: Option<i64> = Some(0);
pub const FAIL: Option<i64> = Some(1);
pub const RUNNING: Option<i64> = Some(2);
pub const NO_STATUS: Option<i64> = None;

/// Fake CLB API
///
/// Mutating calls hand out `req-1`, `req-2`, ... in call order. Task status
/// follows the script registered for the request id; the last scripted
/// status repeats, and unscripted tasks succeed immediately.
#[derive(Default)]
pub struct FakeClb {
    next_request: AtomicU32,
    scripts: Mutex<HashMap<String, VecDeque<Option<i64>>>>,
    actions: Mutex<Vec<String>>,
    describes: AtomicU32,
    fail_issue_after: Mutex<Option<u32>>,
    omit_request_id: Mutex<bool>,
    listener_ids: Mutex<Vec<String>>,
    location_ids: Mutex<Vec<String>>,
}

impl FakeClb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, request_id: &str, statuses: &[Option<i64>]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(request_id.to_string(), statuses.iter().copied().collect());
    }

    /// Mutating calls fail with a transport error once `n` calls succeeded
    pub fn fail_issue_after(&self, n: u32) {
        *self.fail_issue_after.lock().unwrap() = Some(n);
    }

    pub fn omit_request_id(&self) {
        *self.omit_request_id.lock().unwrap() = true;
    }

    pub fn set_listener_ids(&self, ids: &[&str]) {
        *self.listener_ids.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_location_ids(&self, ids: &[&str]) {
        *self.location_ids.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn describes(&self) -> u32 {
        self.describes.load(Ordering::SeqCst)
    }

    fn issue(&self, action: &str) -> Result<Option<String>> {
        self.actions.lock().unwrap().push(action.to_string());
        let issued = self.next_request.load(Ordering::SeqCst);
        if let Some(limit) = *self.fail_issue_after.lock().unwrap() {
            if issued >= limit {
                return Err(CloudError::VendorTransport(format!("{action}: connection reset")));
            }
        }
        let n = self.next_request.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.omit_request_id.lock().unwrap() {
            return Ok(None);
        }
        Ok(Some(format!("req-{n}")))
    }

    fn task(&self, action: &str) -> Result<TaskResponse> {
        Ok(TaskResponse {
            request_id: self.issue(action)?,
        })
    }
}

#[async_trait]
impl ClbApi for FakeClb {
    fn region(&self) -> &str {
        "ap-guangzhou"
    }

    async fn create_listener(
        &self,
        _kt: &Kit,
        _req: &CreateListenerRequest,
    ) -> Result<CreateListenerResponse> {
        let request_id = self.issue("CreateListener")?;
        Ok(CreateListenerResponse {
            listener_ids: self.listener_ids.lock().unwrap().clone(),
            request_id,
        })
    }

    async fn modify_listener(&self, _kt: &Kit, _req: &ModifyListenerRequest) -> Result<TaskResponse> {
        self.task("ModifyListener")
    }

    async fn delete_listeners(
        &self,
        _kt: &Kit,
        _req: &DeleteListenersRequest,
    ) -> Result<TaskResponse> {
        self.task("DeleteLoadBalancerListeners")
    }

    async fn create_rule(&self, _kt: &Kit, _req: &CreateRuleRequest) -> Result<CreateRuleResponse> {
        let request_id = self.issue("CreateRule")?;
        Ok(CreateRuleResponse {
            location_ids: self.location_ids.lock().unwrap().clone(),
            request_id,
        })
    }

    async fn modify_rule(&self, _kt: &Kit, _req: &ModifyRuleRequest) -> Result<TaskResponse> {
        self.task("ModifyRule")
    }

    async fn modify_domain_attributes(
        &self,
        _kt: &Kit,
        _req: &ModifyDomainAttributesRequest,
    ) -> Result<TaskResponse> {
        self.task("ModifyDomainAttributes")
    }

    async fn delete_rule(&self, _kt: &Kit, _req: &DeleteRuleRequest) -> Result<TaskResponse> {
        self.task("DeleteRule")
    }

    async fn describe_task_status(
        &self,
        _kt: &Kit,
        req: &DescribeTaskStatusRequest,
    ) -> Result<DescribeTaskStatusResponse> {
        self.describes.fetch_add(1, Ordering::SeqCst);
        let mut scripts = self.scripts.lock().unwrap();
        let status = match scripts.get_mut(&req.task_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().flatten(),
            Some(queue) => queue.front().copied().flatten(),
            None => SUCCESS,
        };
        Ok(DescribeTaskStatusResponse {
            status,
            request_id: Some(format!("describe-{}", req.task_id)),
        })
    }
}

/// Hands out the same fake for every region except `broken-region`
pub struct FakeClientSet {
    pub clb: Arc<FakeClb>,
}

impl ClientSet for FakeClientSet {
    fn clb_client(&self, region: &str) -> Result<Arc<dyn ClbApi>> {
        if region == "broken-region" {
            return Err(CloudError::ClientInit(format!("no credentials for {region}")));
        }
        let api: Arc<dyn ClbApi> = self.clb.clone();
        Ok(api)
    }
}

pub fn fast_poller() -> PollerOption {
    PollerOption {
        initial_delay: Duration::ZERO,
        round_interval: RoundInterval::Fixed(Duration::from_millis(10)),
        max_elapsed: Some(Duration::from_millis(50)),
        max_rounds: None,
    }
}

pub fn tcloud(clb: &Arc<FakeClb>) -> (TCloud, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    let tcloud = TCloud::new(Arc::new(FakeClientSet { clb: clb.clone() }))
        .with_poller_option(fast_poller())
        .with_audit_sink(audit.clone());
    (tcloud, audit)
}

pub fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}
