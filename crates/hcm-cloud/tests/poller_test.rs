//! Poller engine behaviour against a scripted vendor

use async_trait::async_trait;
use hcm_cloud::{
    BaseDoneResult, CloudError, Kit, PollState, Poller, PollerOption, PollingHandler,
    RoundInterval,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// One scripted round: task id -> status (`None` = no status reported yet)
type Round = Vec<(&'static str, Option<&'static str>)>;

/// Vendor client replaying scripted rounds; the last round repeats forever
struct ScriptedClient {
    rounds: Mutex<VecDeque<Round>>,
    last: Mutex<Option<Round>>,
    calls: AtomicU32,
    fail_transport: bool,
}

impl ScriptedClient {
    fn new(rounds: Vec<Round>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            fail_transport: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail_transport: true,
            ..Self::new(Vec::new())
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_round(&self) -> Round {
        let mut rounds = self.rounds.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(round) = rounds.pop_front() {
            *last = Some(round.clone());
            round
        } else {
            last.clone().unwrap_or_default()
        }
    }
}

struct ScriptedHandler;

#[async_trait]
impl PollingHandler for ScriptedHandler {
    type Client = ScriptedClient;
    type Status = Option<String>;

    async fn poll(
        &self,
        client: &ScriptedClient,
        _kt: &Kit,
        task_ids: &[String],
    ) -> hcm_cloud::Result<HashMap<String, Option<String>>> {
        client.calls.fetch_add(1, Ordering::SeqCst);
        if client.fail_transport {
            return Err(CloudError::VendorTransport("connection refused".into()));
        }
        let round: HashMap<&str, Option<&str>> = client.next_round().into_iter().collect();
        Ok(task_ids
            .iter()
            .map(|id| {
                let status = round.get(id.as_str()).copied().flatten().map(str::to_string);
                (id.clone(), status)
            })
            .collect())
    }

    fn done(&self, statuses: &HashMap<String, Option<String>>) -> PollState {
        let mut result = BaseDoneResult::new();
        let mut pending = false;
        for (id, status) in statuses {
            match status.as_deref() {
                None | Some("running") => pending = true,
                Some("success") => result.add_success(id.clone()),
                Some("failed") => result.add_failed(id.clone()),
                Some(_) => result.add_unknown(id.clone()),
            }
        }
        if pending {
            PollState::Pending(result)
        } else {
            PollState::Done(result)
        }
    }
}

fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn fast_option() -> PollerOption {
    PollerOption {
        initial_delay: Duration::ZERO,
        round_interval: RoundInterval::Fixed(Duration::from_millis(10)),
        max_elapsed: Some(Duration::from_millis(50)),
        max_rounds: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_running_then_success() {
    let client = ScriptedClient::new(vec![
        vec![("lbl-1", Some("running"))],
        vec![("lbl-1", Some("success"))],
    ]);
    let poller = Poller::new(ScriptedHandler);

    let result = poller
        .poll_until_done(&client, &Kit::new(), &ids(&["lbl-1"]), &fast_option())
        .await
        .unwrap();

    assert_eq!(result.success_cloud_ids, ids(&["lbl-1"]));
    assert!(result.failed_cloud_ids.is_empty());
    assert!(result.unknown_cloud_ids.is_empty());
    assert_eq!(client.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_one_unresolved_task_blocks_the_round() {
    let client = ScriptedClient::new(vec![
        vec![("r1", Some("success")), ("r2", Some("success")), ("r3", None)],
        vec![("r1", Some("success")), ("r2", Some("success")), ("r3", Some("failed"))],
    ]);
    let poller = Poller::new(ScriptedHandler);

    let result = poller
        .poll_until_done(&client, &Kit::new(), &ids(&["r1", "r2", "r3"]), &fast_option())
        .await
        .unwrap()
        .sorted();

    assert_eq!(client.calls(), 2);
    assert_eq!(result.success_cloud_ids, ids(&["r1", "r2"]));
    assert_eq!(result.failed_cloud_ids, ids(&["r3"]));
}

#[tokio::test(start_paused = true)]
async fn test_classification_is_exhaustive_and_disjoint() {
    let task_ids = ids(&["a", "b", "c", "d", "e"]);
    let client = ScriptedClient::new(vec![
        vec![("a", Some("running")), ("b", None), ("c", Some("success"))],
        vec![
            ("a", Some("success")),
            ("b", Some("failed")),
            ("c", Some("success")),
            ("d", Some("weird")),
            ("e", Some("failed")),
        ],
    ]);
    let poller = Poller::new(ScriptedHandler);

    let result = poller
        .poll_until_done(&client, &Kit::new(), &task_ids, &fast_option())
        .await
        .unwrap();

    assert_eq!(result.total(), task_ids.len());
    assert!(result.check_partition(&task_ids).is_ok());
    assert_eq!(result.unknown_cloud_ids, ids(&["d"]));
}

#[tokio::test(start_paused = true)]
async fn test_never_done_times_out() {
    let client = ScriptedClient::new(vec![vec![("t1", Some("success")), ("t2", Some("running"))]]);
    let poller = Poller::new(ScriptedHandler);
    let started = tokio::time::Instant::now();

    let err = poller
        .poll_until_done(&client, &Kit::new(), &ids(&["t1", "t2"]), &fast_option())
        .await
        .unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(50));
    match err {
        CloudError::PollingTimeout {
            rounds,
            pending,
            partial,
            ..
        } => {
            assert_eq!(rounds, 5);
            assert_eq!(pending, ids(&["t2"]));
            assert_eq!(partial.success_cloud_ids, ids(&["t1"]));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_max_rounds_bound() {
    let client = ScriptedClient::new(vec![vec![("t1", Some("running"))]]);
    let poller = Poller::new(ScriptedHandler);
    let option = PollerOption {
        max_elapsed: None,
        max_rounds: Some(3),
        ..fast_option()
    };

    let err = poller
        .poll_until_done(&client, &Kit::new(), &ids(&["t1"]), &option)
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::PollingTimeout { rounds: 3, .. }));
    assert_eq!(client.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_kit_deadline_bounds_polling() {
    let client = ScriptedClient::new(vec![vec![("t1", Some("running"))]]);
    let poller = Poller::new(ScriptedHandler);
    let option = PollerOption {
        max_elapsed: Some(Duration::from_secs(3600)),
        ..fast_option()
    };
    let kt = Kit::new().with_timeout(Duration::from_millis(25));

    let err = poller
        .poll_until_done(&client, &kt, &ids(&["t1"]), &option)
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::PollingTimeout { .. }));
    assert_eq!(client.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_the_sleep() {
    let client = ScriptedClient::new(vec![vec![("t1", Some("running"))]]);
    let poller = Poller::new(ScriptedHandler);
    let option = PollerOption {
        initial_delay: Duration::ZERO,
        round_interval: RoundInterval::Fixed(Duration::from_secs(600)),
        max_elapsed: Some(Duration::from_secs(3600)),
        max_rounds: None,
    };
    let kt = Kit::new();
    let canceller = kt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = poller
        .poll_until_done(&client, &kt, &ids(&["t1"]), &option)
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::Cancelled(_)));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(client.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_aborts_without_retry() {
    let client = ScriptedClient::failing();
    let poller = Poller::new(ScriptedHandler);

    let err = poller
        .poll_until_done(&client, &Kit::new(), &ids(&["t1"]), &fast_option())
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::VendorTransport(_)));
    assert_eq!(client.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_never_polls() {
    let client = ScriptedClient::new(vec![vec![("t1", Some("success"))]]);
    let poller = Poller::new(ScriptedHandler);

    for bad in [ids(&[]), ids(&[""]), ids(&["t1", "t1"])] {
        let err = poller
            .poll_until_done(&client, &Kit::new(), &bad, &fast_option())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::InvalidParameter(_)));
    }
    assert_eq!(client.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_is_requeried_once_then_failed() {
    let client = ScriptedClient::new(vec![
        vec![("a", Some("success")), ("b", Some("weird")), ("c", Some("weird"))],
        vec![("b", Some("success")), ("c", Some("weird"))],
    ]);
    let poller = Poller::new(ScriptedHandler);

    let result = poller
        .poll_until_settled(&client, &Kit::new(), &ids(&["a", "b", "c"]), &fast_option())
        .await
        .unwrap()
        .sorted();

    assert_eq!(result.success_cloud_ids, ids(&["a", "b"]));
    assert_eq!(result.failed_cloud_ids, ids(&["c"]));
    assert!(result.unknown_cloud_ids.is_empty());
    assert_eq!(client.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_requery_shares_the_time_budget() {
    let client = ScriptedClient::new(vec![
        vec![("a", Some("running"))],
        vec![("a", Some("running"))],
        vec![("a", Some("weird"))],
        vec![("a", Some("running"))],
    ]);
    let poller = Poller::new(ScriptedHandler);
    let option = PollerOption {
        initial_delay: Duration::from_millis(5),
        ..fast_option()
    };

    let start = tokio::time::Instant::now();
    let result = poller
        .poll_until_settled(&client, &Kit::new(), &ids(&["a"]), &option)
        .await
        .unwrap();

    assert!(start.elapsed() <= Duration::from_millis(50));
    assert_eq!(result.failed_cloud_ids, ids(&["a"]));
    assert!(result.success_cloud_ids.is_empty());
    assert!(result.unknown_cloud_ids.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_requery_shares_the_round_budget() {
    let client = ScriptedClient::new(vec![
        vec![("a", Some("success")), ("b", Some("running"))],
        vec![("a", Some("success")), ("b", Some("weird"))],
        vec![("b", Some("running"))],
    ]);
    let poller = Poller::new(ScriptedHandler);
    let option = PollerOption {
        max_elapsed: None,
        max_rounds: Some(3),
        ..fast_option()
    };

    let result = poller
        .poll_until_settled(&client, &Kit::new(), &ids(&["a", "b"]), &option)
        .await
        .unwrap();

    assert_eq!(client.calls(), 3);
    assert_eq!(result.success_cloud_ids, ids(&["a"]));
    assert_eq!(result.failed_cloud_ids, ids(&["b"]));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_with_no_budget_left_is_failed_without_requery() {
    let client = ScriptedClient::new(vec![vec![("a", Some("weird"))]]);
    let poller = Poller::new(ScriptedHandler);
    let option = PollerOption {
        max_elapsed: None,
        max_rounds: Some(1),
        ..fast_option()
    };

    let result = poller
        .poll_until_settled(&client, &Kit::new(), &ids(&["a"]), &option)
        .await
        .unwrap();

    assert_eq!(client.calls(), 1);
    assert_eq!(result.failed_cloud_ids, ids(&["a"]));
}

/// Handler that reports a task the caller never asked about
struct LeakyHandler;

#[async_trait]
impl PollingHandler for LeakyHandler {
    type Client = ();
    type Status = ();

    async fn poll(
        &self,
        _client: &(),
        _kt: &Kit,
        task_ids: &[String],
    ) -> hcm_cloud::Result<HashMap<String, ()>> {
        Ok(task_ids.iter().map(|id| (id.clone(), ())).collect())
    }

    fn done(&self, _statuses: &HashMap<String, ()>) -> PollState {
        let mut result = BaseDoneResult::new();
        result.add_success("someone-else");
        PollState::Done(result)
    }
}

#[tokio::test(start_paused = true)]
async fn test_inconsistent_classification_is_a_contract_violation() {
    let poller = Poller::new(LeakyHandler);
    let err = poller
        .poll_until_done(&(), &Kit::new(), &ids(&["t1"]), &fast_option())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::VendorContractViolation(_)));
}
