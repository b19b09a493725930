//! ECS client surface

use async_trait::async_trait;
use hcm_cloud::{Kit, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStartServersRequest {
    pub server_ids: Vec<String>,
}

/// How running instances are shut down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StopType {
    #[default]
    Soft,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStopServersRequest {
    pub server_ids: Vec<String>,
    #[serde(rename = "type")]
    pub stop_type: StopType,
}

/// Answer to a batch action: the id of the job carrying it out
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobResponse {
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShowJobResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fail_reason: Option<String>,
}

/// ECS API bound to one account and region
#[async_trait]
pub trait EcsApi: Send + Sync {
    fn region(&self) -> &str;

    async fn batch_start_servers(
        &self,
        kt: &Kit,
        req: &BatchStartServersRequest,
    ) -> Result<JobResponse>;

    async fn batch_stop_servers(&self, kt: &Kit, req: &BatchStopServersRequest)
    -> Result<JobResponse>;

    async fn show_job(&self, kt: &Kit, job_id: &str) -> Result<ShowJobResponse>;
}

/// Factory for account and region scoped ECS clients
pub trait EcsClientSet: Send + Sync {
    fn ecs_client(&self, account_id: &str, region: &str) -> Result<Arc<dyn EcsApi>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_request_shape() {
        let req = BatchStopServersRequest {
            server_ids: vec!["ecs-1".into()],
            stop_type: StopType::Hard,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "HARD");
        assert_eq!(json["server_ids"][0], "ecs-1");
    }
}
