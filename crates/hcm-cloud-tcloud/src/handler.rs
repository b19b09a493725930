//! Polling handler over `DescribeTaskStatus`

use crate::status::ClbTaskStatus;
use crate::tcloud::TCloud;
use crate::types::DescribeTaskStatusRequest;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use hcm_cloud::{BaseDoneResult, CloudError, Kit, PollState, PollingHandler, Result};
use std::collections::HashMap;

/// Reads CLB task status in one region
///
/// `None` means the vendor answered without a status for the task.
#[derive(Debug, Clone)]
pub struct TaskStatusPollingHandler {
    region: String,
}

impl TaskStatusPollingHandler {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl PollingHandler for TaskStatusPollingHandler {
    type Client = TCloud;
    type Status = Option<ClbTaskStatus>;

    async fn poll(
        &self,
        client: &TCloud,
        kt: &Kit,
        task_ids: &[String],
    ) -> Result<HashMap<String, Option<ClbTaskStatus>>> {
        if task_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CloudError::invalid_param("empty request id"));
        }

        let api = client.clb_client(&self.region)?;
        let queries = task_ids.iter().map(|task_id| {
            let api = api.clone();
            async move {
                let req = DescribeTaskStatusRequest {
                    task_id: task_id.clone(),
                };
                let resp = api.describe_task_status(kt, &req).await?;
                Ok::<_, CloudError>((task_id.clone(), resp.status.map(ClbTaskStatus::from_code)))
            }
        });

        Ok(try_join_all(queries).await?.into_iter().collect())
    }

    fn done(&self, statuses: &HashMap<String, Option<ClbTaskStatus>>) -> PollState {
        let mut result = BaseDoneResult::new();
        let mut running = false;

        for (task_id, status) in statuses {
            match status {
                None | Some(ClbTaskStatus::Running) => running = true,
                Some(ClbTaskStatus::Success) => result.add_success(task_id.clone()),
                Some(ClbTaskStatus::Fail) => result.add_failed(task_id.clone()),
                Some(ClbTaskStatus::Unrecognized(code)) => {
                    tracing::warn!(task_id = %task_id, code, "unrecognized clb task status");
                    result.add_unknown(task_id.clone());
                }
            }
        }

        if running {
            PollState::Pending(result)
        } else {
            PollState::Done(result)
        }
    }
}
