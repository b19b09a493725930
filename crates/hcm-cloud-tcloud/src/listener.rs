//! Listener orchestrators

use crate::options::{CreateListenerOption, DeleteListenerOption, UpdateListenerOption};
use crate::tcloud::{TCloud, Target};
use hcm_cloud::{BaseDoneResult, CloudError, Kit, OperationKind, ResourceKind, Result};

impl TCloud {
    /// Create a listener
    ///
    /// The polled task only confirms that creation succeeded; the created
    /// listener ids come from the `ListenerIds` of the create response.
    pub async fn create_listener(
        &self,
        kt: &Kit,
        opt: &CreateListenerOption,
    ) -> Result<BaseDoneResult> {
        opt.validate()?;

        let req = opt.to_request();
        let target = Target {
            kind: OperationKind::Create,
            resource: ResourceKind::Listener,
            region: &opt.region,
            ids: vec![opt.listener_name.clone()],
        };
        self.execute(
            kt,
            target,
            |api| async move { api.create_listener(kt, &req).await },
            |resp| {
                if resp.listener_ids.is_empty() {
                    return Err(CloudError::VendorContractViolation(
                        "create listener response carries no ListenerIds".to_string(),
                    ));
                }
                Ok(resp.listener_ids.clone())
            },
        )
        .await
    }

    pub async fn update_listener(
        &self,
        kt: &Kit,
        opt: &UpdateListenerOption,
    ) -> Result<BaseDoneResult> {
        opt.validate()?;

        let req = opt.to_request();
        let target = Target {
            kind: OperationKind::Update,
            resource: ResourceKind::Listener,
            region: &opt.region,
            ids: vec![opt.listener_id.clone()],
        };
        self.execute(
            kt,
            target,
            |api| async move { api.modify_listener(kt, &req).await },
            |_| Ok(vec![opt.listener_id.clone()]),
        )
        .await
    }

    /// Delete listeners of one load balancer with a single task
    pub async fn delete_listener(
        &self,
        kt: &Kit,
        opt: &DeleteListenerOption,
    ) -> Result<BaseDoneResult> {
        opt.validate()?;

        let req = opt.to_request();
        let target = Target {
            kind: OperationKind::Delete,
            resource: ResourceKind::Listener,
            region: &opt.region,
            ids: opt.cloud_ids.clone(),
        };
        self.execute(
            kt,
            target,
            |api| async move { api.delete_listeners(kt, &req).await },
            |_| Ok(opt.cloud_ids.clone()),
        )
        .await
    }
}
