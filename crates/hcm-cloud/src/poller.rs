//! Vendor-agnostic completion poller for asynchronous cloud tasks
//!
//! Mutating cloud APIs answer immediately with a task (or request) id; the real
//! outcome has to be discovered by querying the task status until it is
//! terminal. A [`PollingHandler`] knows how one vendor reports task status,
//! and [`Poller`] drives it round by round until every task is classified,
//! the time or round budget runs out, or the caller cancels.

use crate::error::{CloudError, Result};
use crate::kit::Kit;
use crate::result::BaseDoneResult;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Outcome of interpreting one polling round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Every task reached a terminal status
    Done(BaseDoneResult),
    /// At least one task is still running or has no status yet; carries the
    /// classification of the tasks that already finished
    Pending(BaseDoneResult),
}

/// Vendor knowledge of how to query task status and how to read it
#[async_trait]
pub trait PollingHandler: Send + Sync {
    /// Client used to issue status queries
    type Client: ?Sized + Send + Sync;

    /// Vendor-native status payload for a single task
    type Status: Send;

    /// Query the status of every task, keyed by task id
    async fn poll(
        &self,
        client: &Self::Client,
        kt: &Kit,
        task_ids: &[String],
    ) -> Result<HashMap<String, Self::Status>>;

    /// Classify a round; must not perform I/O
    fn done(&self, statuses: &HashMap<String, Self::Status>) -> PollState;
}

/// Delay between polling rounds
#[derive(Debug, Clone, PartialEq)]
pub enum RoundInterval {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl RoundInterval {
    /// Delay to wait after the given zero-based round
    pub fn delay_for_round(&self, round: u32) -> Duration {
        match self {
            RoundInterval::Fixed(d) => *d,
            RoundInterval::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let factor = multiplier.powi(round.min(64) as i32);
                let millis = (initial.as_millis() as f64 * factor).min(max.as_millis() as f64);
                Duration::from_millis(millis as u64)
            }
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            RoundInterval::Fixed(d) => d.is_zero(),
            RoundInterval::Exponential { initial, .. } => initial.is_zero(),
        }
    }
}

/// Largest accepted `max_elapsed`
pub const MAX_ELAPSED_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Poller configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PollerOption {
    /// Wait before the first status query so the vendor side can settle
    pub initial_delay: Duration,

    /// Wait between subsequent rounds
    pub round_interval: RoundInterval,

    /// Upper bound on total time spent polling
    pub max_elapsed: Option<Duration>,

    /// Upper bound on the number of rounds
    pub max_rounds: Option<u32>,
}

impl Default for PollerOption {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            round_interval: RoundInterval::Fixed(Duration::from_secs(1)),
            max_elapsed: Some(Duration::from_secs(60)),
            max_rounds: None,
        }
    }
}

impl PollerOption {
    /// Defaults for load-balancer listener and rule tasks
    pub fn load_balancer_default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            round_interval: RoundInterval::Fixed(Duration::from_secs(1)),
            max_elapsed: Some(Duration::from_secs(60)),
            max_rounds: None,
        }
    }

    /// Defaults for instance power jobs, which take longer to settle
    pub fn instance_job_default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            round_interval: RoundInterval::Exponential {
                initial: Duration::from_secs(2),
                multiplier: 1.5,
                max: Duration::from_secs(10),
            },
            max_elapsed: Some(Duration::from_secs(300)),
            max_rounds: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.round_interval.is_zero() {
            return Err(CloudError::invalid_param(
                "poller round interval must be greater than zero",
            ));
        }
        if self.max_elapsed.is_none() && self.max_rounds.is_none() {
            return Err(CloudError::invalid_param(
                "poller requires max_elapsed or max_rounds",
            ));
        }
        if self.max_rounds == Some(0) {
            return Err(CloudError::invalid_param("poller max_rounds must be at least 1"));
        }
        if let Some(max_elapsed) = self.max_elapsed.filter(|d| *d > MAX_ELAPSED_LIMIT) {
            return Err(CloudError::invalid_param(format!(
                "poller max_elapsed {max_elapsed:?} exceeds the limit of {MAX_ELAPSED_LIMIT:?}"
            )));
        }
        Ok(())
    }
}

/// Generic polling loop over a [`PollingHandler`]
///
/// The poller keeps no state between calls and can be shared freely.
pub struct Poller<H> {
    handler: H,
}

impl<H: PollingHandler> Poller<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Poll until every task is classified
    ///
    /// Transport errors from the handler abort immediately. When the time or
    /// round budget runs out first, `PollingTimeout` carries the tasks that
    /// were still pending and the classification observed in the last round.
    pub async fn poll_until_done(
        &self,
        client: &H::Client,
        kt: &Kit,
        task_ids: &[String],
        option: &PollerOption,
    ) -> Result<BaseDoneResult> {
        validate_task_ids(task_ids)?;
        option.validate()?;

        let mut budget = Budget::start(kt, option);
        if !option.initial_delay.is_zero() {
            wait(kt, option.initial_delay, budget.deadline).await?;
        }
        self.poll_rounds(client, kt, task_ids, option, &mut budget).await
    }

    /// Poll until done, then re-query unknown tasks once
    ///
    /// The re-query shares the time and round budget of the first pass.
    /// Tasks that are still unresolved after the second look, or that cannot
    /// be looked at again because the budget is spent, are reported as
    /// failed, so callers only ever see unknown results that were escalated.
    pub async fn poll_until_settled(
        &self,
        client: &H::Client,
        kt: &Kit,
        task_ids: &[String],
        option: &PollerOption,
    ) -> Result<BaseDoneResult> {
        validate_task_ids(task_ids)?;
        option.validate()?;

        let mut budget = Budget::start(kt, option);
        if !option.initial_delay.is_zero() {
            wait(kt, option.initial_delay, budget.deadline).await?;
        }
        let mut result = self
            .poll_rounds(client, kt, task_ids, option, &mut budget)
            .await?;
        if result.unknown_cloud_ids.is_empty() {
            return Ok(result);
        }

        let unknown = std::mem::take(&mut result.unknown_cloud_ids);
        if budget.exhausted(option) {
            tracing::warn!(
                rid = kt.rid(),
                ids = ?unknown,
                "tasks finished with unknown status and no budget is left, treating as failed"
            );
            result.failed_cloud_ids.extend(unknown);
            return Ok(result);
        }

        tracing::warn!(
            rid = kt.rid(),
            ids = ?unknown,
            "tasks finished with unknown status, re-querying once"
        );
        wait(kt, budget.next_delay(option), budget.deadline).await?;

        let unresolved = match self
            .poll_rounds(client, kt, &unknown, option, &mut budget)
            .await
        {
            Ok(retry) => {
                result.success_cloud_ids.extend(retry.success_cloud_ids);
                result.failed_cloud_ids.extend(retry.failed_cloud_ids);
                retry.unknown_cloud_ids
            }
            Err(CloudError::PollingTimeout {
                pending, partial, ..
            }) => {
                result.success_cloud_ids.extend(partial.success_cloud_ids);
                result.failed_cloud_ids.extend(partial.failed_cloud_ids);
                partial.unknown_cloud_ids.into_iter().chain(pending).collect()
            }
            Err(e) => return Err(e),
        };
        if !unresolved.is_empty() {
            tracing::warn!(
                rid = kt.rid(),
                ids = ?unresolved,
                "tasks still unresolved after re-query, treating as failed"
            );
            result.failed_cloud_ids.extend(unresolved);
        }
        Ok(result)
    }

    /// Round loop shared by both entry points; `budget` carries the rounds
    /// already spent so a second pass continues where the first stopped
    async fn poll_rounds(
        &self,
        client: &H::Client,
        kt: &Kit,
        task_ids: &[String],
        option: &PollerOption,
        budget: &mut Budget,
    ) -> Result<BaseDoneResult> {
        let mut last_partial = BaseDoneResult::new();
        loop {
            if kt.is_cancelled() {
                return Err(CloudError::Cancelled(format!("polling cancelled, rid: {}", kt.rid())));
            }
            if budget.past_deadline() {
                return Err(budget.timeout(task_ids, last_partial));
            }

            let statuses = tokio::select! {
                biased;
                _ = kt.cancelled() => {
                    return Err(CloudError::Cancelled(format!(
                        "polling cancelled, rid: {}",
                        kt.rid()
                    )));
                }
                res = self.handler.poll(client, kt, task_ids) => res?,
            };
            budget.rounds += 1;
            let round = budget.rounds;

            match self.handler.done(&statuses) {
                PollState::Done(result) => {
                    result.check_partition(task_ids).map_err(|e| {
                        CloudError::VendorContractViolation(format!(
                            "task status classification is inconsistent: {e}"
                        ))
                    })?;
                    tracing::debug!(
                        rid = kt.rid(),
                        round,
                        "polling finished: {}",
                        result
                    );
                    return Ok(result);
                }
                PollState::Pending(partial) => {
                    tracing::debug!(
                        rid = kt.rid(),
                        round,
                        tasks = task_ids.len(),
                        finished = partial.total(),
                        "tasks still running"
                    );
                    last_partial = partial;
                }
            }

            if budget.out_of_rounds(option) {
                return Err(budget.timeout(task_ids, last_partial));
            }

            wait(kt, budget.next_delay(option), budget.deadline).await?;
        }
    }
}

/// Time and rounds spent by one polling call
struct Budget {
    started: Instant,
    deadline: Option<Instant>,
    rounds: u32,
}

impl Budget {
    fn start(kt: &Kit, option: &PollerOption) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: effective_deadline(kt, started, option),
            rounds: 0,
        }
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn out_of_rounds(&self, option: &PollerOption) -> bool {
        option.max_rounds.is_some_and(|max| self.rounds >= max)
    }

    fn exhausted(&self, option: &PollerOption) -> bool {
        self.past_deadline() || self.out_of_rounds(option)
    }

    fn next_delay(&self, option: &PollerOption) -> Duration {
        option
            .round_interval
            .delay_for_round(self.rounds.saturating_sub(1))
    }

    fn timeout(&self, task_ids: &[String], partial: BaseDoneResult) -> CloudError {
        timeout(self.rounds, self.started, task_ids, partial)
    }
}

fn validate_task_ids(task_ids: &[String]) -> Result<()> {
    if task_ids.is_empty() {
        return Err(CloudError::invalid_param("task ids are required"));
    }
    let mut seen = HashSet::with_capacity(task_ids.len());
    for id in task_ids {
        if id.trim().is_empty() {
            return Err(CloudError::invalid_param("empty task id"));
        }
        if !seen.insert(id.as_str()) {
            return Err(CloudError::invalid_param(format!("duplicate task id: {id}")));
        }
    }
    Ok(())
}

fn effective_deadline(kt: &Kit, started: Instant, option: &PollerOption) -> Option<Instant> {
    let own = option.max_elapsed.and_then(|d| started.checked_add(d));
    match (kt.deadline(), own) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Sleep for `delay` clipped to the deadline; cancellation interrupts the sleep
async fn wait(kt: &Kit, delay: Duration, deadline: Option<Instant>) -> Result<()> {
    let delay = match deadline {
        Some(d) => delay.min(d.saturating_duration_since(Instant::now())),
        None => delay,
    };
    tokio::select! {
        biased;
        _ = kt.cancelled() => Err(CloudError::Cancelled(format!(
            "polling cancelled while waiting, rid: {}",
            kt.rid()
        ))),
        _ = sleep(delay) => Ok(()),
    }
}

fn timeout(
    rounds: u32,
    started: Instant,
    task_ids: &[String],
    partial: BaseDoneResult,
) -> CloudError {
    let pending = task_ids
        .iter()
        .filter(|id| !partial.contains(id))
        .cloned()
        .collect();
    CloudError::PollingTimeout {
        rounds,
        elapsed: started.elapsed(),
        pending,
        partial,
    }
}
