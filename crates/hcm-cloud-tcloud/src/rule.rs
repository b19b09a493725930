//! Layer-7 rule and domain orchestrators

use crate::options::{CreateRuleOption, DeleteRuleOption, UpdateDomainAttrOption, UpdateRuleOption};
use crate::tcloud::{TCloud, Target};
use crate::types::AsyncTaskResponse;
use hcm_cloud::{
    BATCH_OPERATION_MAX_LIMIT, BaseDoneResult, CloudError, Kit, Operation, OperationKind,
    OperationState, ResourceKind, Result, conclude_batch, ensure_batch_limit,
};
use std::collections::{HashMap, HashSet};

impl TCloud {
    /// Create layer-7 rules on a listener
    ///
    /// The created rule ids come from the `LocationIds` of the create response.
    pub async fn create_rule(&self, kt: &Kit, opt: &CreateRuleOption) -> Result<BaseDoneResult> {
        opt.validate()?;

        let req = opt.to_request();
        let target = Target {
            kind: OperationKind::Create,
            resource: ResourceKind::UrlRule,
            region: &opt.region,
            ids: vec![opt.listener_id.clone()],
        };
        self.execute(
            kt,
            target,
            |api| async move { api.create_rule(kt, &req).await },
            |resp| {
                if resp.location_ids.is_empty() {
                    return Err(CloudError::VendorContractViolation(
                        "create rule response carries no LocationIds".to_string(),
                    ));
                }
                Ok(resp.location_ids.clone())
            },
        )
        .await
    }

    pub async fn update_rule(&self, kt: &Kit, opt: &UpdateRuleOption) -> Result<BaseDoneResult> {
        opt.validate()?;

        let req = opt.to_request();
        let target = Target {
            kind: OperationKind::Update,
            resource: ResourceKind::UrlRule,
            region: &opt.region,
            ids: vec![opt.location_id.clone()],
        };
        self.execute(
            kt,
            target,
            |api| async move { api.modify_rule(kt, &req).await },
            |_| Ok(vec![opt.location_id.clone()]),
        )
        .await
    }

    /// Update the attributes of a domain on an HTTPS listener
    pub async fn update_domain_attr(
        &self,
        kt: &Kit,
        opt: &UpdateDomainAttrOption,
    ) -> Result<BaseDoneResult> {
        opt.validate()?;

        let req = opt.to_request();
        let domain = opt.new_domain.clone().unwrap_or_else(|| opt.domain.clone());
        let target = Target {
            kind: OperationKind::Update,
            resource: ResourceKind::DomainAttribute,
            region: &opt.region,
            ids: vec![opt.domain.clone()],
        };
        self.execute(
            kt,
            target,
            |api| async move { api.modify_domain_attributes(kt, &req).await },
            |_| Ok(vec![domain]),
        )
        .await
    }

    pub async fn delete_rule(&self, kt: &Kit, opt: &DeleteRuleOption) -> Result<BaseDoneResult> {
        opt.validate()?;

        let req = opt.to_request();
        let target = Target {
            kind: OperationKind::Delete,
            resource: ResourceKind::UrlRule,
            region: &opt.region,
            ids: opt.targets(),
        };
        self.execute(
            kt,
            target,
            |api| async move { api.delete_rule(kt, &req).await },
            |_| Ok(opt.targets()),
        )
        .await
    }

    /// Delete several rule sets in one region, polling all tasks as one batch
    ///
    /// Each request's outcome is attributed to the rules it addressed. When
    /// issuing stops on an error, rules whose request was never accepted are
    /// reported as failed alongside the polled ones.
    pub async fn batch_delete_rules(
        &self,
        kt: &Kit,
        opts: &[DeleteRuleOption],
    ) -> Result<BaseDoneResult> {
        let Some(first) = opts.first() else {
            return Err(CloudError::invalid_param("delete rule options are required"));
        };
        for opt in opts {
            opt.validate()?;
            if opt.region != first.region {
                return Err(CloudError::invalid_param(format!(
                    "batch delete spans regions {} and {}",
                    first.region, opt.region
                )));
            }
        }
        let all_targets: Vec<String> = opts.iter().flat_map(DeleteRuleOption::targets).collect();
        ensure_batch_limit(all_targets.len(), BATCH_OPERATION_MAX_LIMIT)?;
        let mut seen = HashSet::with_capacity(all_targets.len());
        if let Some(dup) = all_targets.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(CloudError::invalid_param(format!(
                "url rule {dup} is addressed by more than one delete option"
            )));
        }

        let target = Target {
            kind: OperationKind::Delete,
            resource: ResourceKind::UrlRule,
            region: &first.region,
            ids: all_targets,
        };
        let mut op = Operation::begin(kt, target.kind, target.resource);
        let outcome = self.drive_batch_delete(kt, &mut op, &target, opts).await;
        let state = op.conclude(&outcome);

        let ids = match &outcome {
            Ok(result) => result.success_cloud_ids.clone(),
            Err(err) => err
                .partial_result()
                .map(|r| r.success_cloud_ids.clone())
                .filter(|ids| !ids.is_empty())
                .unwrap_or_else(|| target.ids.clone()),
        };
        self.audit(kt, &target, ids, state).await;
        outcome
    }

    async fn drive_batch_delete(
        &self,
        kt: &Kit,
        op: &mut Operation,
        target: &Target<'_>,
        opts: &[DeleteRuleOption],
    ) -> Result<BaseDoneResult> {
        let api = self.clb_client(target.region)?;

        let mut task_ids: Vec<String> = Vec::with_capacity(opts.len());
        let mut rules_by_task: HashMap<String, Vec<String>> = HashMap::new();
        let mut not_issued = BaseDoneResult::new();

        for (idx, opt) in opts.iter().enumerate() {
            let issued = api
                .delete_rule(kt, &opt.to_request())
                .await
                .and_then(|resp| {
                    resp.request_id()
                        .filter(|id| !id.trim().is_empty())
                        .map(str::to_string)
                        .ok_or_else(|| {
                            CloudError::VendorContractViolation(
                                "delete rule response carries no RequestId".to_string(),
                            )
                        })
                });

            match issued {
                Ok(request_id) => {
                    rules_by_task.insert(request_id.clone(), opt.targets());
                    task_ids.push(request_id);
                }
                Err(err) if task_ids.is_empty() => {
                    tracing::error!(rid = kt.rid(), error = %err, "delete tcloud url rule failed");
                    return Err(err);
                }
                Err(err) => {
                    tracing::error!(
                        rid = kt.rid(),
                        error = %err,
                        issued = task_ids.len(),
                        "delete tcloud url rule failed, polling the requests already accepted"
                    );
                    for rest in &opts[idx..] {
                        for id in rest.targets() {
                            not_issued.add_failed(id);
                        }
                    }
                    break;
                }
            }
        }

        op.advance(OperationState::Issued)?;
        op.advance(OperationState::Polling)?;

        let rules_of = |task_id: &str| rules_by_task.get(task_id).cloned().unwrap_or_default();
        let settled = self
            .poller(target.region)
            .poll_until_settled(self, kt, &task_ids, self.poller_option())
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
                    pending: pending.iter().flat_map(|t| rules_of(t)).collect(),
                    partial: partial.expand(rules_of),
                },
                other => other,
            })?;

        let mut result = settled.expand(rules_of);
        result.merge(not_issued);
        conclude_batch(result, "url rule delete")
    }
}
