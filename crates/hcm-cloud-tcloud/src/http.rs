//! HTTP JSON client for the CLB API
//!
//! Requests are posted as JSON with the action, version and region carried in
//! `X-TC-*` headers. Request signing is left to a gateway in front of the
//! endpoint: when a token is configured it is sent as a bearer token.

use crate::client::{ClbApi, ClientSet};
use crate::error::TCloudError;
use crate::types::{
    CreateListenerRequest, CreateListenerResponse, CreateRuleRequest, CreateRuleResponse,
    DeleteListenersRequest, DeleteRuleRequest, DescribeTaskStatusRequest,
    DescribeTaskStatusResponse, ModifyDomainAttributesRequest, ModifyListenerRequest,
    ModifyRuleRequest, TaskResponse,
};
use async_trait::async_trait;
use hcm_cloud::{CloudError, Kit, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://clb.tencentcloudapi.com";
pub const API_VERSION: &str = "2018-03-17";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds [`HttpClbApi`] clients that share one connection pool
#[derive(Clone)]
pub struct HttpClientSet {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpClientSet {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
    ) -> std::result::Result<Self, TCloudError> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(TCloudError::InvalidConfig(format!(
                "endpoint must be an http(s) url: {endpoint}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    /// Read the gateway token from `token_env`; a missing variable means no token
    pub fn from_env(
        endpoint: impl Into<String>,
        token_env: &str,
    ) -> std::result::Result<Self, TCloudError> {
        let token = std::env::var(token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::debug!(token_env, "no tcloud gateway token configured");
        }
        Self::new(endpoint, token)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ClientSet for HttpClientSet {
    fn clb_client(&self, region: &str) -> Result<Arc<dyn ClbApi>> {
        if region.trim().is_empty() {
            return Err(CloudError::ClientInit(
                "tcloud clb client requires a region".to_string(),
            ));
        }
        Ok(Arc::new(HttpClbApi {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            region: region.to_string(),
            token: self.token.clone(),
        }))
    }
}

pub struct HttpClbApi {
    client: reqwest::Client,
    endpoint: String,
    region: String,
    token: Option<String>,
}

impl HttpClbApi {
    async fn call<Req, Resp>(&self, kt: &Kit, action: &'static str, req: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("X-TC-Action", action)
            .header("X-TC-Version", API_VERSION)
            .header("X-TC-Region", &self.region)
            .header("X-TC-Timestamp", chrono::Utc::now().timestamp().to_string())
            .header("X-TC-RequestClient", "hcm")
            .json(req);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(rid = kt.rid(), action, region = %self.region, "calling tcloud api");

        let body = tokio::select! {
            biased;
            _ = kt.cancelled() => {
                return Err(CloudError::Cancelled(format!("{action} cancelled, rid: {}", kt.rid())));
            }
            res = async {
                let response = builder.send().await?;
                let status = response.status();
                let bytes = response.bytes().await?;
                Ok::<_, TCloudError>((status, bytes))
            } => res,
        };

        let (status, bytes) = body.map_err(|e| {
            tracing::error!(rid = kt.rid(), action, error = %e, "tcloud api call failed");
            CloudError::from(e)
        })?;
        parse_response(status, &bytes).map_err(|e| {
            tracing::error!(rid = kt.rid(), action, error = %e, "tcloud api returned an error");
            CloudError::from(e)
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Unwrap the `{"Response": {...}}` envelope
pub(crate) fn parse_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<T, TCloudError> {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) if !status.is_success() => {
            return Err(TCloudError::HttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(body).chars().take(256).collect(),
            });
        }
        Err(e) => {
            return Err(TCloudError::MalformedResponse(format!(
                "response body is not JSON: {e}"
            )));
        }
    };

    let Some(response) = value.get("Response") else {
        if !status.is_success() {
            return Err(TCloudError::HttpStatus {
                status: status.as_u16(),
                body: value.to_string(),
            });
        }
        return Err(TCloudError::MalformedResponse(
            "missing Response envelope".to_string(),
        ));
    };

    if let Some(error) = response.get("Error") {
        let error: ApiError = serde_json::from_value(error.clone())
            .map_err(|e| TCloudError::MalformedResponse(format!("invalid Error object: {e}")))?;
        let request_id = response
            .get("RequestId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        return Err(TCloudError::Api {
            code: error.code,
            message: error.message,
            request_id,
        });
    }

    serde_json::from_value(response.clone())
        .map_err(|e| TCloudError::MalformedResponse(format!("unexpected Response shape: {e}")))
}

#[async_trait]
impl ClbApi for HttpClbApi {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_listener(
        &self,
        kt: &Kit,
        req: &CreateListenerRequest,
    ) -> Result<CreateListenerResponse> {
        self.call(kt, "CreateListener", req).await
    }

    async fn modify_listener(&self, kt: &Kit, req: &ModifyListenerRequest) -> Result<TaskResponse> {
        self.call(kt, "ModifyListener", req).await
    }

    async fn delete_listeners(
        &self,
        kt: &Kit,
        req: &DeleteListenersRequest,
    ) -> Result<TaskResponse> {
        self.call(kt, "DeleteLoadBalancerListeners", req).await
    }

    async fn create_rule(&self, kt: &Kit, req: &CreateRuleRequest) -> Result<CreateRuleResponse> {
        self.call(kt, "CreateRule", req).await
    }

    async fn modify_rule(&self, kt: &Kit, req: &ModifyRuleRequest) -> Result<TaskResponse> {
        self.call(kt, "ModifyRule", req).await
    }

    async fn modify_domain_attributes(
        &self,
        kt: &Kit,
        req: &ModifyDomainAttributesRequest,
    ) -> Result<TaskResponse> {
        self.call(kt, "ModifyDomainAttributes", req).await
    }

    async fn delete_rule(&self, kt: &Kit, req: &DeleteRuleRequest) -> Result<TaskResponse> {
        self.call(kt, "DeleteRule", req).await
    }

    async fn describe_task_status(
        &self,
        kt: &Kit,
        req: &DescribeTaskStatusRequest,
    ) -> Result<DescribeTaskStatusResponse> {
        self.call(kt, "DescribeTaskStatus", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_envelope() {
        let body = br#"{"Response":{"ListenerIds":["lbl-1"],"RequestId":"req-1"}}"#;
        let resp: CreateListenerResponse = parse_response(StatusCode::OK, body).unwrap();
        assert_eq!(resp.listener_ids, vec!["lbl-1"]);
        assert_eq!(resp.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = br#"{"Response":{"Error":{"Code":"InvalidParameter.FormatError","Message":"bad port"},"RequestId":"req-2"}}"#;
        let err = parse_response::<TaskResponse>(StatusCode::OK, body).unwrap_err();
        match err {
            TCloudError::Api {
                code, request_id, ..
            } => {
                assert_eq!(code, "InvalidParameter.FormatError");
                assert_eq!(request_id, "req-2");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_envelope() {
        let err = parse_response::<TaskResponse>(StatusCode::OK, br#"{"RequestId":"x"}"#)
            .unwrap_err();
        assert!(matches!(err, TCloudError::MalformedResponse(_)));

        let err = parse_response::<TaskResponse>(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
            .unwrap_err();
        assert!(matches!(err, TCloudError::HttpStatus { status: 502, .. }));
    }

    #[test]
    fn test_client_set_rules() {
        assert!(HttpClientSet::new("clb.tencentcloudapi.com", None).is_err());

        let set = HttpClientSet::new(DEFAULT_ENDPOINT, None).unwrap();
        assert!(matches!(set.clb_client(""), Err(CloudError::ClientInit(_))));
        let api = set.clb_client("ap-guangzhou").unwrap();
        assert_eq!(api.region(), "ap-guangzhou");
    }
}
