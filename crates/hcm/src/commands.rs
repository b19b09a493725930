pub mod domain;
pub mod listener;
pub mod rule;
pub mod task;

use anyhow::Context as _;
use clap::Args;
use colored::Colorize;
use hcm_cloud::{
    BaseDoneResult, CloudError, FileResourceStore, Kit, ResourceKind, ResourceRecord,
    ResourceStore, RetryConfig, Vendor,
};
use hcm_cloud_tcloud::{CertificateInfo, HealthCheck, HttpClientSet, TCloud};
use hcm_config::HcmConfig;
use std::sync::Arc;

/// Everything a command needs to talk to the vendor and record results
pub struct Context {
    pub tcloud: TCloud,
    pub store: FileResourceStore,
    pub retry: RetryConfig,
    pub kt: Kit,
}

impl Context {
    pub fn new(config: &HcmConfig, kt: Kit) -> anyhow::Result<Self> {
        let clients = HttpClientSet::from_env(&config.tcloud.endpoint, &config.tcloud.token_env)
            .context("failed to build the tcloud client")?;
        let tcloud =
            TCloud::new(Arc::new(clients)).with_poller_option(config.poller_option());
        let root = config.state_root(&std::env::current_dir()?);

        Ok(Self {
            tcloud,
            store: FileResourceStore::new(root),
            retry: config.retry_config(),
            kt,
        })
    }

    /// Record resources locally; a store failure never fails the command
    pub async fn remember(&self, records: Vec<ResourceRecord>) {
        if records.is_empty() {
            return;
        }
        if let Err(e) = self.store.upsert(records).await {
            tracing::warn!(rid = self.kt.rid(), error = %e, "failed to update local state");
        }
    }

    pub async fn forget(&self, resource: ResourceKind, cloud_ids: &[String]) {
        if cloud_ids.is_empty() {
            return;
        }
        if let Err(e) = self.store.remove(Vendor::TCloud, resource, cloud_ids).await {
            tracing::warn!(rid = self.kt.rid(), error = %e, "failed to update local state");
        }
    }
}

/// Certificate flags shared by listener, rule and domain commands
#[derive(Args, Debug, Default)]
pub struct CertArgs {
    /// UNIDIRECTIONAL or MUTUAL
    #[arg(long)]
    pub ssl_mode: Option<String>,
    /// Client CA certificate id (mutual TLS)
    #[arg(long = "ca")]
    pub ca_cloud_id: Option<String>,
    /// Server certificate id (repeatable)
    #[arg(long = "cert")]
    pub cert_cloud_ids: Vec<String>,
}

impl CertArgs {
    pub fn into_info(self) -> Option<CertificateInfo> {
        if self.ssl_mode.is_none() && self.ca_cloud_id.is_none() && self.cert_cloud_ids.is_empty()
        {
            return None;
        }
        Some(CertificateInfo {
            ssl_mode: self.ssl_mode,
            ca_cloud_id: self.ca_cloud_id,
            cert_cloud_ids: self.cert_cloud_ids,
        })
    }
}

/// Health check switch; finer settings stay at vendor defaults
pub fn health_check(enabled: Option<bool>) -> Option<HealthCheck> {
    enabled.map(|on| HealthCheck {
        health_switch: Some(i64::from(on)),
        ..Default::default()
    })
}

/// Print an outcome and return the ids that are known to have succeeded
pub fn report(what: &str, outcome: &hcm_cloud::Result<BaseDoneResult>) -> Vec<String> {
    match outcome {
        Ok(result) => {
            println!("{}", format!("✓ {what}: {result}").green().bold());
            print_ids(result);
            result.success_cloud_ids.clone()
        }
        Err(err) => {
            eprintln!(
                "{}",
                format!("✗ {what} failed [{}]: {err}", err.code()).red().bold()
            );
            match err {
                CloudError::PartialFailed { result, .. } => {
                    print_ids(result);
                    result.success_cloud_ids.clone()
                }
                CloudError::PollingTimeout {
                    pending, partial, ..
                } => {
                    print_ids(partial);
                    for id in pending {
                        println!("  {} {}", "pending".yellow(), id);
                    }
                    partial.success_cloud_ids.clone()
                }
                _ => Vec::new(),
            }
        }
    }
}

fn print_ids(result: &BaseDoneResult) {
    for id in &result.success_cloud_ids {
        println!("  {} {}", "success".green(), id);
    }
    for id in &result.failed_cloud_ids {
        println!("  {} {}", "failed".red(), id);
    }
    for id in &result.unknown_cloud_ids {
        println!("  {} {}", "unknown".yellow(), id);
    }
}

pub fn finish(outcome: hcm_cloud::Result<BaseDoneResult>) -> anyhow::Result<()> {
    outcome.map(|_| ()).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cert_args_without_flags_is_none() {
        assert!(CertArgs::default().into_info().is_none());

        let info = CertArgs {
            cert_cloud_ids: vec!["cert-1".into()],
            ..Default::default()
        }
        .into_info()
        .unwrap();
        assert_eq!(info.cert_cloud_ids, vec!["cert-1"]);
    }

    #[test]
    fn test_health_check_switch() {
        assert!(health_check(None).is_none());
        assert_eq!(health_check(Some(false)).unwrap().health_switch, Some(0));
        assert_eq!(health_check(Some(true)).unwrap().health_switch, Some(1));
    }

    #[test]
    fn test_report_keeps_partial_successes() {
        let mut result = BaseDoneResult::new();
        result.add_success("loc-1");
        result.add_failed("loc-2");
        let outcome = Err(CloudError::PartialFailed {
            message: "url rule delete".into(),
            result,
        });
        assert_eq!(report("rule delete", &outcome), vec!["loc-1"]);

        let mut partial = BaseDoneResult::new();
        partial.add_success("loc-3");
        let timeout: hcm_cloud::Result<BaseDoneResult> = Err(CloudError::PollingTimeout {
            rounds: 3,
            elapsed: std::time::Duration::from_secs(1),
            pending: vec!["loc-4".into()],
            partial,
        });
        assert_eq!(report("rule delete", &timeout), vec!["loc-3"]);

        let transport: hcm_cloud::Result<BaseDoneResult> =
            Err(CloudError::VendorTransport("connection reset".into()));
        assert!(report("rule delete", &transport).is_empty());
    }
}
