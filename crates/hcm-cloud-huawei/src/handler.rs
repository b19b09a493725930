//! Polling handler over `ShowJob`

use crate::client::EcsApi;
use crate::status::JobStatus;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use hcm_cloud::{BaseDoneResult, CloudError, Kit, PollState, PollingHandler, Result};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct JobStatusPollingHandler {
    region: String,
}

impl JobStatusPollingHandler {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

#[async_trait]
impl PollingHandler for JobStatusPollingHandler {
    type Client = dyn EcsApi;
    type Status = Option<JobStatus>;

    async fn poll(
        &self,
        client: &Self::Client,
        kt: &Kit,
        job_ids: &[String],
    ) -> Result<HashMap<String, Option<JobStatus>>> {
        if job_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CloudError::invalid_param("empty job id"));
        }

        let queries = job_ids.iter().map(|job_id| async move {
            let job = client.show_job(kt, job_id).await?;
            let status = job.status.as_deref().map(JobStatus::parse);
            if status == Some(JobStatus::Fail) {
                tracing::warn!(
                    rid = kt.rid(),
                    region = %self.region,
                    job_id = %job_id,
                    reason = job.fail_reason.as_deref().unwrap_or("unknown"),
                    "ecs job failed"
                );
            }
            Ok::<_, CloudError>((job_id.clone(), status))
        });

        Ok(try_join_all(queries).await?.into_iter().collect())
    }

    fn done(&self, statuses: &HashMap<String, Option<JobStatus>>) -> PollState {
        let mut result = BaseDoneResult::new();
        let mut running = false;

        for (job_id, status) in statuses {
            match status {
                None => running = true,
                Some(s) if s.is_in_progress() => running = true,
                Some(JobStatus::Success) => result.add_success(job_id.clone()),
                Some(JobStatus::Fail) => result.add_failed(job_id.clone()),
                Some(other) => {
                    tracing::warn!(job_id = %job_id, status = %other, "unrecognized ecs job status");
                    result.add_unknown(job_id.clone());
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
