//! Scripted ECS clients keyed by account and region

#![allow(dead_code)]

use async_trait::async_trait;
use hcm_cloud::{
    CloudError, Kit, MemoryAuditSink, PollerOption, ResourceBasicInfo, Result, RoundInterval,
    Vendor,
};
use hcm_cloud_huawei::{
    BatchStartServersRequest, BatchStopServersRequest, EcsApi, EcsClientSet, HuaWei,
    JobResponse, ShowJobResponse,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Behaviour of one account/region group
#[derive(Default, Clone)]
pub struct GroupScript {
    /// Job statuses in polling order; the last one repeats
    pub statuses: Vec<Option<&'static str>>,
    pub fail_issue: bool,
}

#[derive(Default)]
pub struct EcsWorld {
    scripts: Mutex<HashMap<String, GroupScript>>,
    jobs: Mutex<HashMap<String, VecDeque<Option<&'static str>>>>,
    broken: Mutex<HashSet<String>>,
    pub requests: Mutex<Vec<(String, Vec<String>)>>,
}

impl EcsWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, account: &str, region: &str, script: GroupScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(format!("{account}/{region}"), script);
    }

    pub fn break_client(&self, account: &str, region: &str) {
        self.broken.lock().unwrap().insert(format!("{account}/{region}"));
    }

    /// Server ids sent per group, sorted by group
    pub fn requests(&self) -> Vec<(String, Vec<String>)> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort();
        requests
    }

    fn issue(&self, group: &str, server_ids: &[String]) -> Result<JobResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((group.to_string(), server_ids.to_vec()));
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(group)
            .cloned()
            .unwrap_or_default();
        if script.fail_issue {
            return Err(CloudError::VendorTransport(format!("{group}: connection reset")));
        }
        let job_id = format!("job-{group}");
        let statuses = if script.statuses.is_empty() {
            vec![Some("SUCCESS")]
        } else {
            script.statuses
        };
        self.jobs
            .lock()
            .unwrap()
            .insert(job_id.clone(), statuses.into_iter().collect());
        Ok(JobResponse {
            job_id: Some(job_id),
        })
    }

    fn show(&self, job_id: &str) -> ShowJobResponse {
        let mut jobs = self.jobs.lock().unwrap();
        let status = match jobs.get_mut(job_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().flatten(),
            Some(queue) => queue.front().copied().flatten(),
            None => None,
        };
        ShowJobResponse {
            job_id: Some(job_id.to_string()),
            status: status.map(str::to_string),
            fail_reason: (status == Some("FAIL")).then(|| "Ecs.0001 quota exceeded".to_string()),
        }
    }
}

pub struct FakeEcs {
    world: Arc<EcsWorld>,
    group: String,
    region: String,
}

#[async_trait]
impl EcsApi for FakeEcs {
    fn region(&self) -> &str {
        &self.region
    }

    async fn batch_start_servers(
        &self,
        _kt: &Kit,
        req: &BatchStartServersRequest,
    ) -> Result<JobResponse> {
        self.world.issue(&self.group, &req.server_ids)
    }

    async fn batch_stop_servers(
        &self,
        _kt: &Kit,
        req: &BatchStopServersRequest,
    ) -> Result<JobResponse> {
        self.world.issue(&self.group, &req.server_ids)
    }

    async fn show_job(&self, _kt: &Kit, job_id: &str) -> Result<ShowJobResponse> {
        Ok(self.world.show(job_id))
    }
}

pub struct FakeEcsClientSet(pub Arc<EcsWorld>);

impl EcsClientSet for FakeEcsClientSet {
    fn ecs_client(&self, account_id: &str, region: &str) -> Result<Arc<dyn EcsApi>> {
        let group = format!("{account_id}/{region}");
        if self.0.broken.lock().unwrap().contains(&group) {
            return Err(CloudError::ClientInit(format!("no secret for {group}")));
        }
        Ok(Arc::new(FakeEcs {
            world: self.0.clone(),
            group,
            region: region.to_string(),
        }))
    }
}

pub fn huawei(world: &Arc<EcsWorld>) -> (HuaWei, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    let option = PollerOption {
        initial_delay: Duration::ZERO,
        round_interval: RoundInterval::Fixed(Duration::from_millis(10)),
        max_elapsed: Some(Duration::from_millis(50)),
        max_rounds: None,
    };
    let huawei = HuaWei::new(Arc::new(FakeEcsClientSet(world.clone())))
        .with_poller_option(option)
        .with_audit_sink(audit.clone());
    (huawei, audit)
}

pub fn cvm(id: &str, account: &str, region: &str) -> ResourceBasicInfo {
    ResourceBasicInfo {
        id: id.to_string(),
        cloud_id: format!("ecs-{id}"),
        vendor: Vendor::HuaWei,
        account_id: account.to_string(),
        region: region.to_string(),
    }
}

pub fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}
