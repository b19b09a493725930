//! Batch start and stop of ECS instances
//!
//! Instances are grouped by account and region because the ECS batch API
//! only acts within one of each. Every group gets one job; groups run
//! concurrently and each job's outcome applies to all instances of its group.

use crate::client::{BatchStartServersRequest, BatchStopServersRequest, JobResponse, StopType};
use crate::handler::JobStatusPollingHandler;
use crate::huawei::HuaWei;
use futures_util::future::join_all;
use hcm_cloud::{
    AccountRegion, AuditRecord, BATCH_OPERATION_MAX_LIMIT, BaseDoneResult, CloudError, Kit,
    Operation, OperationKind, OperationState, Poller, ResourceBasicInfo, ResourceKind, Result,
    Vendor, audit_quietly, classify_by_account_region, conclude_batch, ensure_batch_limit,
};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerAction {
    Start,
    Stop(StopType),
}

impl PowerAction {
    fn kind(&self) -> OperationKind {
        match self {
            PowerAction::Start => OperationKind::Start,
            PowerAction::Stop(_) => OperationKind::Stop,
        }
    }
}

struct GroupOutcome {
    cloud_ids: Vec<String>,
    issued: bool,
    result: Result<BaseDoneResult>,
}

impl HuaWei {
    pub async fn batch_start_cvm(
        &self,
        kt: &Kit,
        infos: Vec<ResourceBasicInfo>,
    ) -> Result<BaseDoneResult> {
        self.batch_power(kt, infos, PowerAction::Start).await
    }

    pub async fn batch_stop_cvm(
        &self,
        kt: &Kit,
        infos: Vec<ResourceBasicInfo>,
        stop_type: StopType,
    ) -> Result<BaseDoneResult> {
        self.batch_power(kt, infos, PowerAction::Stop(stop_type)).await
    }

    async fn batch_power(
        &self,
        kt: &Kit,
        infos: Vec<ResourceBasicInfo>,
        action: PowerAction,
    ) -> Result<BaseDoneResult> {
        validate_infos(&infos)?;
        let targets: Vec<String> = infos.iter().map(|i| i.cloud_id.clone()).collect();

        let groups = classify_by_account_region(infos);
        for (key, group) in &groups {
            ensure_batch_limit(group.len(), BATCH_OPERATION_MAX_LIMIT).map_err(|e| {
                CloudError::invalid_param(format!("account/region {key}: {e}"))
            })?;
        }

        let mut op = Operation::begin(kt, action.kind(), ResourceKind::Cvm);
        let outcomes = join_all(
            groups
                .iter()
                .map(|(key, group)| self.run_group(kt, action, key, group)),
        )
        .await;

        let outcome = self.merge_groups(&mut op, outcomes);
        let state = op.conclude(&outcome);

        let ids = match &outcome {
            Ok(result) => result.success_cloud_ids.clone(),
            Err(_) => targets,
        };
        let record = AuditRecord::new(kt, Vendor::HuaWei, action.kind(), ResourceKind::Cvm, ids, state);
        audit_quietly(self.audit.as_ref(), record).await;
        outcome
    }

    fn merge_groups(
        &self,
        op: &mut Operation,
        outcomes: Vec<GroupOutcome>,
    ) -> Result<BaseDoneResult> {
        if outcomes.iter().any(|o| o.issued) {
            op.advance(OperationState::Issued)?;
            op.advance(OperationState::Polling)?;
        }

        let mut merged = BaseDoneResult::new();
        let mut first_error = None;
        for outcome in outcomes {
            match outcome.result {
                Ok(result) => merged.merge(result),
                Err(CloudError::Cancelled(msg)) => return Err(CloudError::Cancelled(msg)),
                Err(err @ CloudError::PollingTimeout { .. }) => {
                    // the job may still finish; its instances are neither done nor failed
                    tracing::warn!(
                        ids = ?outcome.cloud_ids,
                        "cvm job did not finish in time, reporting its instances as unknown"
                    );
                    for id in outcome.cloud_ids {
                        merged.add_unknown(id);
                    }
                    first_error.get_or_insert(err);
                }
                Err(err) => {
                    for id in outcome.cloud_ids {
                        merged.add_failed(id);
                    }
                    first_error.get_or_insert(err);
                }
            }
        }

        // no instance succeeded: report the first group error as is
        if merged.success_cloud_ids.is_empty() {
            if let Some(err) = first_error {
                return Err(err);
            }
        }
        conclude_batch(merged, "cvm power action")
    }

    async fn run_group(
        &self,
        kt: &Kit,
        action: PowerAction,
        key: &AccountRegion,
        group: &[ResourceBasicInfo],
    ) -> GroupOutcome {
        let cloud_ids: Vec<String> = group.iter().map(|i| i.cloud_id.clone()).collect();
        let mut issued = false;

        let result = async {
            let api = self.ecs_client(&key.account_id, &key.region)?;
            let resp: JobResponse = match action {
                PowerAction::Start => {
                    let req = BatchStartServersRequest {
                        server_ids: cloud_ids.clone(),
                    };
                    api.batch_start_servers(kt, &req).await?
                }
                PowerAction::Stop(stop_type) => {
                    let req = BatchStopServersRequest {
                        server_ids: cloud_ids.clone(),
                        stop_type,
                    };
                    api.batch_stop_servers(kt, &req).await?
                }
            };
            let job_id = resp
                .job_id
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| {
                    CloudError::VendorContractViolation(format!(
                        "ecs batch {} response carries no job_id",
                        action.kind()
                    ))
                })?;
            issued = true;

            let poller = Poller::new(JobStatusPollingHandler::new(&key.region));
            let settled = poller
                .poll_until_settled(api.as_ref(), kt, &[job_id], &self.poller_option)
                .await
                .map_err(|e| match e {
                    CloudError::PollingTimeout {
                        rounds,
                        elapsed,
                        pending,
                        partial,
                    } => CloudError::PollingTimeout {
                        rounds,
                        elapsed,
                        pending: pending.iter().flat_map(|_| cloud_ids.iter().cloned()).collect(),
                        partial: partial.expand(|_| cloud_ids.clone()),
                    },
                    other => other,
                })?;
            Ok::<_, CloudError>(settled.expand(|_| cloud_ids.clone()))
        }
        .await;

        if let Err(err) = &result {
            tracing::error!(
                rid = kt.rid(),
                group = %key,
                issued,
                error = %err,
                "huawei batch {} failed",
                action.kind()
            );
        }

        GroupOutcome {
            cloud_ids,
            issued,
            result,
        }
    }
}

fn validate_infos(infos: &[ResourceBasicInfo]) -> Result<()> {
    if infos.is_empty() {
        return Err(CloudError::invalid_param("cvm list is required"));
    }
    let mut seen = HashSet::with_capacity(infos.len());
    for info in infos {
        if info.vendor != Vendor::HuaWei {
            return Err(CloudError::UnsupportedVendor(format!(
                "cvm {} belongs to {}, expected {}",
                info.id,
                info.vendor,
                Vendor::HuaWei
            )));
        }
        if info.cloud_id.trim().is_empty()
            || info.account_id.trim().is_empty()
            || info.region.trim().is_empty()
        {
            return Err(CloudError::invalid_param(format!(
                "cvm {} lacks cloud id, account or region",
                info.id
            )));
        }
        if !seen.insert(info.cloud_id.as_str()) {
            return Err(CloudError::invalid_param(format!(
                "duplicate cvm cloud id: {}",
                info.cloud_id
            )));
        }
    }
    Ok(())
}
