//! Validated operation options
//!
//! Every option must pass `validate()` before a request is built from it.

use crate::types::{
    CertInfo, CreateListenerRequest, CreateRuleRequest, DeleteListenersRequest,
    DeleteRuleRequest, HealthCheck, ModifyDomainAttributesRequest, ModifyListenerRequest,
    ModifyRuleRequest, MultiCertInfo, RuleInput,
};
use hcm_cloud::{BATCH_OPERATION_MAX_LIMIT, CloudError, Result, ensure_batch_limit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Listener protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "TCP_SSL")]
    TcpSsl,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "HTTPS")]
    Https,
    #[serde(rename = "QUIC")]
    Quic,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::TcpSsl => "TCP_SSL",
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Quic => "QUIC",
        }
    }

    /// Protocols that need a server certificate
    pub fn requires_certificate(&self) -> bool {
        matches!(self, Protocol::Https | Protocol::TcpSsl | Protocol::Quic)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            "TCP_SSL" => Ok(Protocol::TcpSsl),
            "HTTP" => Ok(Protocol::Http),
            "HTTPS" => Ok(Protocol::Https),
            "QUIC" => Ok(Protocol::Quic),
            other => Err(CloudError::invalid_param(format!("unknown protocol: {other}"))),
        }
    }
}

/// Certificate binding of a listener, rule or domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// `UNIDIRECTIONAL` or `MUTUAL`
    pub ssl_mode: Option<String>,
    /// Client CA certificate, required for mutual authentication
    pub ca_cloud_id: Option<String>,
    /// Server certificates
    #[serde(default)]
    pub cert_cloud_ids: Vec<String>,
}

impl CertificateInfo {
    pub fn validate(&self) -> Result<()> {
        if self.cert_cloud_ids.is_empty() {
            return Err(CloudError::invalid_param("certificate requires at least one cert id"));
        }
        if self.cert_cloud_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CloudError::invalid_param("certificate id must not be empty"));
        }
        match self.ssl_mode.as_deref() {
            None | Some("UNIDIRECTIONAL") => Ok(()),
            Some("MUTUAL") if self.ca_cloud_id.is_some() => Ok(()),
            Some("MUTUAL") => Err(CloudError::invalid_param(
                "mutual authentication requires a CA certificate",
            )),
            Some(other) => Err(CloudError::invalid_param(format!("unknown ssl mode: {other}"))),
        }
    }

    fn to_multi_cert(&self) -> MultiCertInfo {
        let cert_list = self
            .ca_cloud_id
            .iter()
            .chain(&self.cert_cloud_ids)
            .map(|id| CertInfo { cert_id: id.clone() })
            .collect();
        MultiCertInfo {
            ssl_mode: self.ssl_mode.clone(),
            cert_list,
        }
    }
}

fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CloudError::invalid_param(format!("{field} is required")));
    }
    Ok(())
}

fn validate_port(port: u32) -> Result<()> {
    if !(1..=65535).contains(&port) {
        return Err(CloudError::invalid_param(format!(
            "port {port} is out of range 1-65535"
        )));
    }
    Ok(())
}

fn validate_session_expire_time(secs: Option<i64>) -> Result<()> {
    match secs {
        None | Some(0) => Ok(()),
        Some(s) if (30..=3600).contains(&s) => Ok(()),
        Some(s) => Err(CloudError::invalid_param(format!(
            "session expire time {s} must be 0 or within 30-3600"
        ))),
    }
}

fn validate_ids(field: &str, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Err(CloudError::invalid_param(format!("{field} is required")));
    }
    ensure_batch_limit(ids.len(), BATCH_OPERATION_MAX_LIMIT)?;
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if id.trim().is_empty() {
            return Err(CloudError::invalid_param(format!("{field} contains an empty id")));
        }
        if !seen.insert(id.as_str()) {
            return Err(CloudError::invalid_param(format!("{field} repeats id {id}")));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateListenerOption {
    pub region: String,
    pub load_balancer_id: String,
    pub listener_name: String,
    pub protocol: Protocol,
    pub port: u32,
    pub scheduler: Option<String>,
    pub session_type: Option<String>,
    pub session_expire_time: Option<i64>,
    pub sni_switch: Option<bool>,
    pub health_check: Option<HealthCheck>,
    pub certificate: Option<CertificateInfo>,
}

impl CreateListenerOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("load_balancer_id", &self.load_balancer_id)?;
        required("listener_name", &self.listener_name)?;
        validate_port(self.port)?;
        validate_session_expire_time(self.session_expire_time)?;

        let sni = self.sni_switch.unwrap_or(false);
        if sni && self.protocol != Protocol::Https {
            return Err(CloudError::invalid_param("sni is only supported on HTTPS listeners"));
        }
        match &self.certificate {
            Some(cert) => cert.validate()?,
            None if self.protocol.requires_certificate() && !sni => {
                return Err(CloudError::invalid_param(format!(
                    "{} listener without sni requires a certificate",
                    self.protocol
                )));
            }
            None => {}
        }
        Ok(())
    }

    pub(crate) fn to_request(&self) -> CreateListenerRequest {
        CreateListenerRequest {
            load_balancer_id: self.load_balancer_id.clone(),
            ports: vec![self.port as u16],
            protocol: self.protocol.as_str().to_string(),
            listener_names: vec![self.listener_name.clone()],
            health_check: self.health_check.clone(),
            multi_cert_info: self.certificate.as_ref().map(CertificateInfo::to_multi_cert),
            session_expire_time: self.session_expire_time,
            scheduler: self.scheduler.clone(),
            sni_switch: self.sni_switch.map(i64::from),
            session_type: self.session_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateListenerOption {
    pub region: String,
    pub load_balancer_id: String,
    pub listener_id: String,
    pub listener_name: Option<String>,
    pub scheduler: Option<String>,
    pub session_type: Option<String>,
    pub session_expire_time: Option<i64>,
    pub sni_switch: Option<bool>,
    pub health_check: Option<HealthCheck>,
    pub certificate: Option<CertificateInfo>,
}

impl UpdateListenerOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("load_balancer_id", &self.load_balancer_id)?;
        required("listener_id", &self.listener_id)?;
        if let Some(name) = &self.listener_name {
            required("listener_name", name)?;
        }
        validate_session_expire_time(self.session_expire_time)?;
        if let Some(cert) = &self.certificate {
            cert.validate()?;
        }
        Ok(())
    }

    pub(crate) fn to_request(&self) -> ModifyListenerRequest {
        ModifyListenerRequest {
            load_balancer_id: self.load_balancer_id.clone(),
            listener_id: self.listener_id.clone(),
            listener_name: self.listener_name.clone(),
            session_expire_time: self.session_expire_time,
            health_check: self.health_check.clone(),
            multi_cert_info: self.certificate.as_ref().map(CertificateInfo::to_multi_cert),
            scheduler: self.scheduler.clone(),
            sni_switch: self.sni_switch.map(i64::from),
            session_type: self.session_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteListenerOption {
    pub region: String,
    pub load_balancer_id: String,
    pub cloud_ids: Vec<String>,
}

impl DeleteListenerOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("load_balancer_id", &self.load_balancer_id)?;
        validate_ids("cloud_ids", &self.cloud_ids)
    }

    pub(crate) fn to_request(&self) -> DeleteListenersRequest {
        DeleteListenersRequest {
            load_balancer_id: self.load_balancer_id.clone(),
            listener_ids: self.cloud_ids.clone(),
        }
    }
}

/// One layer-7 forwarding rule to create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub domain: String,
    pub url: String,
    pub scheduler: Option<String>,
    pub session_expire_time: Option<i64>,
    pub forward_type: Option<String>,
    pub health_check: Option<HealthCheck>,
    pub certificate: Option<CertificateInfo>,
}

impl RuleSpec {
    fn validate(&self) -> Result<()> {
        required("rule domain", &self.domain)?;
        required("rule url", &self.url)?;
        validate_session_expire_time(self.session_expire_time)?;
        if let Some(cert) = &self.certificate {
            cert.validate()?;
        }
        Ok(())
    }

    fn to_input(&self) -> RuleInput {
        RuleInput {
            domain: self.domain.clone(),
            url: self.url.clone(),
            session_expire_time: self.session_expire_time,
            health_check: self.health_check.clone(),
            multi_cert_info: self.certificate.as_ref().map(CertificateInfo::to_multi_cert),
            scheduler: self.scheduler.clone(),
            forward_type: self.forward_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRuleOption {
    pub region: String,
    pub load_balancer_id: String,
    pub listener_id: String,
    pub rules: Vec<RuleSpec>,
}

impl CreateRuleOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("load_balancer_id", &self.load_balancer_id)?;
        required("listener_id", &self.listener_id)?;
        if self.rules.is_empty() {
            return Err(CloudError::invalid_param("at least one rule is required"));
        }
        ensure_batch_limit(self.rules.len(), BATCH_OPERATION_MAX_LIMIT)?;
        self.rules.iter().try_for_each(RuleSpec::validate)
    }

    pub(crate) fn to_request(&self) -> CreateRuleRequest {
        CreateRuleRequest {
            load_balancer_id: self.load_balancer_id.clone(),
            listener_id: self.listener_id.clone(),
            rules: self.rules.iter().map(RuleSpec::to_input).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRuleOption {
    pub region: String,
    pub load_balancer_id: String,
    pub listener_id: String,
    pub location_id: String,
    pub url: Option<String>,
    pub scheduler: Option<String>,
    pub session_expire_time: Option<i64>,
    pub forward_type: Option<String>,
    pub health_check: Option<HealthCheck>,
}

impl UpdateRuleOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("load_balancer_id", &self.load_balancer_id)?;
        required("listener_id", &self.listener_id)?;
        required("location_id", &self.location_id)?;
        if let Some(url) = &self.url {
            required("url", url)?;
        }
        validate_session_expire_time(self.session_expire_time)
    }

    pub(crate) fn to_request(&self) -> ModifyRuleRequest {
        ModifyRuleRequest {
            load_balancer_id: self.load_balancer_id.clone(),
            listener_id: self.listener_id.clone(),
            location_id: self.location_id.clone(),
            url: self.url.clone(),
            health_check: self.health_check.clone(),
            scheduler: self.scheduler.clone(),
            session_expire_time: self.session_expire_time,
            forward_type: self.forward_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateDomainAttrOption {
    pub region: String,
    pub load_balancer_id: String,
    pub listener_id: String,
    pub domain: String,
    pub new_domain: Option<String>,
    pub default_server: Option<bool>,
    pub new_default_server_domain: Option<String>,
    pub certificate: Option<CertificateInfo>,
}

impl UpdateDomainAttrOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("load_balancer_id", &self.load_balancer_id)?;
        required("listener_id", &self.listener_id)?;
        required("domain", &self.domain)?;
        if self.new_domain.is_none()
            && self.default_server.is_none()
            && self.new_default_server_domain.is_none()
            && self.certificate.is_none()
        {
            return Err(CloudError::invalid_param(
                "nothing to update on the domain attributes",
            ));
        }
        if self.default_server == Some(false) && self.new_default_server_domain.is_none() {
            return Err(CloudError::invalid_param(
                "new_default_server_domain is required when unsetting the default server",
            ));
        }
        if let Some(cert) = &self.certificate {
            cert.validate()?;
        }
        Ok(())
    }

    pub(crate) fn to_request(&self) -> ModifyDomainAttributesRequest {
        ModifyDomainAttributesRequest {
            load_balancer_id: self.load_balancer_id.clone(),
            listener_id: self.listener_id.clone(),
            domain: self.domain.clone(),
            new_domain: self.new_domain.clone(),
            certificate: self.certificate.as_ref().map(CertificateInfo::to_multi_cert),
            default_server: self.default_server,
            new_default_server_domain: self.new_default_server_domain.clone(),
        }
    }
}

/// Delete layer-7 rules, addressed either by location ids or by domain and url
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteRuleOption {
    pub region: String,
    pub load_balancer_id: String,
    pub listener_id: String,
    #[serde(default)]
    pub cloud_ids: Vec<String>,
    pub domain: Option<String>,
    pub url: Option<String>,
    pub new_default_server_domain: Option<String>,
}

impl DeleteRuleOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("load_balancer_id", &self.load_balancer_id)?;
        required("listener_id", &self.listener_id)?;
        if self.cloud_ids.is_empty() {
            match (&self.domain, &self.url) {
                (Some(domain), Some(url)) => {
                    required("domain", domain)?;
                    required("url", url)
                }
                _ => Err(CloudError::invalid_param(
                    "either cloud_ids or both domain and url are required",
                )),
            }
        } else {
            validate_ids("cloud_ids", &self.cloud_ids)
        }
    }

    /// Identifiers reported for this deletion
    pub fn targets(&self) -> Vec<String> {
        if !self.cloud_ids.is_empty() {
            return self.cloud_ids.clone();
        }
        vec![format!(
            "{}{}",
            self.domain.as_deref().unwrap_or_default(),
            self.url.as_deref().unwrap_or_default()
        )]
    }

    pub(crate) fn to_request(&self) -> DeleteRuleRequest {
        DeleteRuleRequest {
            load_balancer_id: self.load_balancer_id.clone(),
            listener_id: self.listener_id.clone(),
            location_ids: self.cloud_ids.clone(),
            domain: self.domain.clone(),
            url: self.url.clone(),
            new_default_server_domain: self.new_default_server_domain.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeTaskStatusOption {
    pub region: String,
    pub task_id: String,
}

impl DescribeTaskStatusOption {
    pub fn validate(&self) -> Result<()> {
        required("region", &self.region)?;
        required("task_id", &self.task_id)
    }
}
