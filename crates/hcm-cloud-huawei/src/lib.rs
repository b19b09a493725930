//! HuaWei ECS adaptor for HCM
//!
//! Batch power actions on ECS instances are asynchronous jobs. [`HuaWei`]
//! partitions the instances by account and region, starts one job per group
//! and polls each job with [`JobStatusPollingHandler`].

mod cvm;
pub mod client;
pub mod handler;
pub mod huawei;
pub mod status;

pub use client::{
    BatchStartServersRequest, BatchStopServersRequest, EcsApi, EcsClientSet, JobResponse,
    ShowJobResponse, StopType,
};
pub use handler::JobStatusPollingHandler;
pub use huawei::HuaWei;
pub use status::JobStatus;
