//! CLB API 2018-03-17 request and response payloads
//!
//! Field names follow the vendor's PascalCase JSON. Optional fields are left
//! out of the request body when unset.

use serde::{Deserialize, Serialize};

/// Health check settings shared by listeners and layer-7 rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_switch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_out: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub un_health_num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_check_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_check_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_check_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip_type: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertInfo {
    pub cert_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MultiCertInfo {
    #[serde(rename = "SSLMode", skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,
    pub cert_list: Vec<CertInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateListenerRequest {
    pub load_balancer_id: String,
    pub ports: Vec<u16>,
    pub protocol: String,
    pub listener_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_cert_info: Option<MultiCertInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_expire_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni_switch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyListenerRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_expire_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_cert_info: Option<MultiCertInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni_switch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteListenersRequest {
    pub load_balancer_id: String,
    pub listener_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleInput {
    pub domain: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_expire_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_cert_info: Option<MultiCertInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRuleRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
    pub rules: Vec<RuleInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyRuleRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_expire_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyDomainAttributesRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<MultiCertInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_server: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_default_server_domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRuleRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub location_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_default_server_domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTaskStatusRequest {
    pub task_id: String,
}

/// Response of a mutating call whose only payload is the async task id
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskResponse {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateListenerResponse {
    #[serde(default)]
    pub listener_ids: Vec<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRuleResponse {
    #[serde(default)]
    pub location_ids: Vec<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTaskStatusResponse {
    /// 0 success, 1 fail, 2 running
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Mutating responses that hand back an asynchronous task id
pub trait AsyncTaskResponse {
    fn request_id(&self) -> Option<&str>;
}

impl AsyncTaskResponse for TaskResponse {
    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl AsyncTaskResponse for CreateListenerResponse {
    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl AsyncTaskResponse for CreateRuleResponse {
    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}
