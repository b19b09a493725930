//! TCloud load balancer adaptor for HCM
//!
//! Every mutating CLB API call (listener, layer-7 rule, domain attribute)
//! answers with a `RequestId` naming an asynchronous task. The orchestrators
//! on [`TCloud`] issue the call, poll `DescribeTaskStatus` through
//! [`TaskStatusPollingHandler`] until the task settles, and report the
//! outcome in terms of the cloud objects the task touched.
//!
//! # Example
//!
//! ```ignore
//! use hcm_cloud::Kit;
//! use hcm_cloud_tcloud::{DeleteListenerOption, HttpClientSet, TCloud};
//! use std::sync::Arc;
//!
//! let clients = HttpClientSet::from_env("https://clb.tencentcloudapi.com", "HCM_TCLOUD_TOKEN")?;
//! let tcloud = TCloud::new(Arc::new(clients));
//!
//! let result = tcloud
//!     .delete_listener(
//!         &Kit::new(),
//!         &DeleteListenerOption {
//!             region: "ap-guangzhou".into(),
//!             load_balancer_id: "lb-abc".into(),
//!             cloud_ids: vec!["lbl-1".into()],
//!         },
//!     )
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod handler;
pub mod http;
mod listener;
pub mod options;
mod rule;
pub mod status;
pub mod tcloud;
pub mod types;

pub use client::{ClbApi, ClientSet};
pub use error::TCloudError;
pub use handler::TaskStatusPollingHandler;
pub use http::{API_VERSION, DEFAULT_ENDPOINT, HttpClbApi, HttpClientSet};
pub use options::{
    CertificateInfo, CreateListenerOption, CreateRuleOption, DeleteListenerOption,
    DeleteRuleOption, DescribeTaskStatusOption, Protocol, RuleSpec, UpdateDomainAttrOption,
    UpdateListenerOption, UpdateRuleOption,
};
pub use status::ClbTaskStatus;
pub use tcloud::TCloud;
pub use types::HealthCheck;
