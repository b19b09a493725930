//! Listener orchestration against a scripted CLB

mod common;

use common::*;
use hcm_cloud::{CloudError, Kit, OperationKind, OperationState, ResourceKind};
use hcm_cloud_tcloud::{
    CertificateInfo, CreateListenerOption, DeleteListenerOption, Protocol, UpdateListenerOption,
};

fn create_option() -> CreateListenerOption {
    CreateListenerOption {
        region: "ap-guangzhou".into(),
        load_balancer_id: "lb-1".into(),
        listener_name: "web".into(),
        protocol: Protocol::Https,
        port: 443,
        scheduler: Some("WRR".into()),
        session_type: None,
        session_expire_time: None,
        sni_switch: Some(false),
        health_check: None,
        certificate: Some(CertificateInfo {
            ssl_mode: Some("UNIDIRECTIONAL".into()),
            ca_cloud_id: None,
            cert_cloud_ids: vec!["cert-1".into()],
        }),
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_listener_running_then_success() {
    let clb = FakeClb::new();
    clb.set_listener_ids(&["lbl-1"]);
    clb.script("req-1", &[RUNNING, SUCCESS]);
    let (tcloud, audit) = tcloud(&clb);

    let result = tcloud
        .create_listener(&Kit::new(), &create_option())
        .await
        .unwrap();

    assert_eq!(result.success_cloud_ids, ids(&["lbl-1"]));
    assert!(result.failed_cloud_ids.is_empty());
    assert!(result.unknown_cloud_ids.is_empty());
    assert_eq!(clb.describes(), 2);

    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, OperationKind::Create);
    assert_eq!(records[0].resource, ResourceKind::Listener);
    assert_eq!(records[0].resource_ids, ids(&["lbl-1"]));
    assert_eq!(records[0].outcome, OperationState::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_create_listener_reports_response_ids() {
    let clb = FakeClb::new();
    clb.set_listener_ids(&["lbl-a", "lbl-b"]);
    let (tcloud, _) = tcloud(&clb);

    let result = tcloud
        .create_listener(&Kit::new(), &create_option())
        .await
        .unwrap();
    assert_eq!(result.success_cloud_ids, ids(&["lbl-a", "lbl-b"]));
}

#[tokio::test(start_paused = true)]
async fn test_failed_task_is_vendor_error() {
    let clb = FakeClb::new();
    clb.set_listener_ids(&["lbl-1"]);
    clb.script("req-1", &[FAIL]);
    let (tcloud, audit) = tcloud(&clb);

    let err = tcloud
        .create_listener(&Kit::new(), &create_option())
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::VendorError(_)));
    assert!(err.to_string().contains("req-1"));
    assert_eq!(audit.records()[0].outcome, OperationState::VendorError);
}

#[tokio::test(start_paused = true)]
async fn test_missing_request_id_is_contract_violation() {
    let clb = FakeClb::new();
    clb.omit_request_id();
    let (tcloud, _) = tcloud(&clb);

    let err = tcloud
        .create_listener(&Kit::new(), &create_option())
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::VendorContractViolation(_)));
    assert_eq!(clb.describes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_listener_ids_is_contract_violation() {
    let clb = FakeClb::new();
    let (tcloud, _) = tcloud(&clb);

    let err = tcloud
        .create_listener(&Kit::new(), &create_option())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::VendorContractViolation(_)));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_option_never_reaches_network() {
    let clb = FakeClb::new();
    let (tcloud, audit) = tcloud(&clb);

    let mut bad_port = create_option();
    bad_port.port = 70000;
    let mut no_cert = create_option();
    no_cert.certificate = None;

    for opt in [bad_port, no_cert] {
        let err = tcloud.create_listener(&Kit::new(), &opt).await.unwrap_err();
        assert!(matches!(err, CloudError::InvalidParameter(_)));
    }
    assert!(clb.actions().is_empty());
    assert!(audit.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_client_init_failure_is_fatal() {
    let clb = FakeClb::new();
    let (tcloud, audit) = tcloud(&clb);
    let mut opt = create_option();
    opt.region = "broken-region".into();

    let err = tcloud.create_listener(&Kit::new(), &opt).await.unwrap_err();

    assert!(matches!(err, CloudError::ClientInit(_)));
    assert!(clb.actions().is_empty());
    assert_eq!(audit.records()[0].outcome, OperationState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_on_issue() {
    let clb = FakeClb::new();
    clb.fail_issue_after(0);
    let (tcloud, _) = tcloud(&clb);

    let err = tcloud
        .create_listener(&Kit::new(), &create_option())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(clb.describes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_task_never_finishes_times_out() {
    let clb = FakeClb::new();
    clb.script("req-1", &[RUNNING]);
    let (tcloud, audit) = tcloud(&clb);

    let opt = UpdateListenerOption {
        region: "ap-guangzhou".into(),
        load_balancer_id: "lb-1".into(),
        listener_id: "lbl-1".into(),
        listener_name: Some("renamed".into()),
        ..Default::default()
    };
    let err = tcloud.update_listener(&Kit::new(), &opt).await.unwrap_err();

    match err {
        CloudError::PollingTimeout { pending, partial, .. } => {
            assert_eq!(pending, ids(&["lbl-1"]));
            assert_eq!(partial.total(), 0);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(audit.records()[0].outcome, OperationState::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_delete_listener_attributes_task_to_listeners() {
    let clb = FakeClb::new();
    clb.script("req-1", &[NO_STATUS, RUNNING, SUCCESS]);
    let (tcloud, _) = tcloud(&clb);

    let opt = DeleteListenerOption {
        region: "ap-guangzhou".into(),
        load_balancer_id: "lb-1".into(),
        cloud_ids: ids(&["lbl-1", "lbl-2"]),
    };
    let result = tcloud.delete_listener(&Kit::new(), &opt).await.unwrap();

    assert_eq!(result.success_cloud_ids, ids(&["lbl-1", "lbl-2"]));
    assert_eq!(clb.actions(), vec!["DeleteLoadBalancerListeners"]);
    assert_eq!(clb.describes(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_kit_stops_polling() {
    let clb = FakeClb::new();
    clb.set_listener_ids(&["lbl-1"]);
    clb.script("req-1", &[RUNNING]);
    let (tcloud, audit) = tcloud(&clb);

    let kt = Kit::new();
    let canceller = kt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(15)).await;
        canceller.cancel();
    });

    let err = tcloud.create_listener(&kt, &create_option()).await.unwrap_err();
    assert!(matches!(err, CloudError::Cancelled(_)));
    assert_eq!(audit.records()[0].outcome, OperationState::Cancelled);
}
