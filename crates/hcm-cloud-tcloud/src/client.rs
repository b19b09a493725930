//! Region-scoped CLB client surface

use crate::types::{
    CreateListenerRequest, CreateListenerResponse, CreateRuleRequest, CreateRuleResponse,
    DeleteListenersRequest, DeleteRuleRequest, DescribeTaskStatusRequest,
    DescribeTaskStatusResponse, ModifyDomainAttributesRequest, ModifyListenerRequest,
    ModifyRuleRequest, TaskResponse,
};
use async_trait::async_trait;
use hcm_cloud::{Kit, Result};
use std::sync::Arc;

/// CLB API bound to one region
///
/// Every mutating call answers with the id of an asynchronous task; the
/// outcome has to be read with [`ClbApi::describe_task_status`].
#[async_trait]
pub trait ClbApi: Send + Sync {
    fn region(&self) -> &str;

    async fn create_listener(
        &self,
        kt: &Kit,
        req: &CreateListenerRequest,
    ) -> Result<CreateListenerResponse>;

    async fn modify_listener(&self, kt: &Kit, req: &ModifyListenerRequest) -> Result<TaskResponse>;

    async fn delete_listeners(
        &self,
        kt: &Kit,
        req: &DeleteListenersRequest,
    ) -> Result<TaskResponse>;

    async fn create_rule(&self, kt: &Kit, req: &CreateRuleRequest) -> Result<CreateRuleResponse>;

    async fn modify_rule(&self, kt: &Kit, req: &ModifyRuleRequest) -> Result<TaskResponse>;

    async fn modify_domain_attributes(
        &self,
        kt: &Kit,
        req: &ModifyDomainAttributesRequest,
    ) -> Result<TaskResponse>;

    async fn delete_rule(&self, kt: &Kit, req: &DeleteRuleRequest) -> Result<TaskResponse>;

    async fn describe_task_status(
        &self,
        kt: &Kit,
        req: &DescribeTaskStatusRequest,
    ) -> Result<DescribeTaskStatusResponse>;
}

/// Factory for region-scoped clients
pub trait ClientSet: Send + Sync {
    /// Client for `region`; failure is reported as `ClientInit`
    fn clb_client(&self, region: &str) -> Result<Arc<dyn ClbApi>>;
}
