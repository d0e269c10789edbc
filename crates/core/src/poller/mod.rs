//! Bounded polling of an asynchronous provisioning status.
//!
//! A [`StatusPoller`] asks its [`StatusSource`] for the current status until the
//! value lands in one of the policy's terminal sets, the attempt budget runs
//! out, or the caller cancels. Source errors are transient: they are logged and
//! the next attempt proceeds. A failed status reported by the watched system is
//! terminal and is never retried.

pub mod states;

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use states::{PollResult, PollState, StatusClass, UNKNOWN_STATUS};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("status source unavailable: {0}")]
    Unavailable(String),
    #[error("status payload malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn status(&self) -> Result<String, StatusError>;
}

#[async_trait]
impl<S> StatusSource for Arc<S>
where
    S: StatusSource + ?Sized,
{
    async fn status(&self) -> Result<String, StatusError> {
        (**self).status().await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub ready_statuses: BTreeSet<String>,
    pub failed_statuses: BTreeSet<String>,
    pub in_progress_statuses: BTreeSet<String>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 60,
            ready_statuses: to_set(&["READY"]),
            failed_statuses: to_set(&["CREATE_FAILED", "UPDATE_FAILED", "FAILED"]),
            in_progress_statuses: to_set(&["CREATING", "UPDATING", "DELETING"]),
        }
    }
}

impl PollPolicy {
    pub fn new<I, J>(interval: Duration, max_attempts: u32, ready: I, failed: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        Self {
            interval,
            max_attempts,
            ready_statuses: ready.into_iter().map(Into::into).collect(),
            failed_statuses: failed.into_iter().map(Into::into).collect(),
            in_progress_statuses: BTreeSet::new(),
        }
    }

    pub fn classify(&self, status: &str) -> StatusClass {
        if self.ready_statuses.contains(status) {
            StatusClass::Ready
        } else if self.failed_statuses.contains(status) {
            StatusClass::Failed
        } else if self.in_progress_statuses.is_empty() || self.in_progress_statuses.contains(status)
        {
            StatusClass::InProgress
        } else {
            StatusClass::Unrecognized
        }
    }
}

pub struct StatusPoller<S> {
    source: S,
    policy: PollPolicy,
}

impl<S> StatusPoller<S>
where
    S: StatusSource,
{
    pub fn new(source: S, policy: PollPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Polls until a terminal state or the attempt budget is exhausted.
    pub async fn run(&self) -> PollResult {
        let (_keep_open, cancel) = watch::channel(false);
        self.run_until_cancelled(cancel).await
    }

    /// Like [`run`](Self::run), but returns `Cancelled` as soon as `cancel`
    /// carries `true`, either before an attempt or while waiting between two.
    pub async fn run_until_cancelled(&self, mut cancel: watch::Receiver<bool>) -> PollResult {
        let max_attempts = self.policy.max_attempts;
        let mut last_observed = UNKNOWN_STATUS.to_string();
        let mut checks = 0_u32;

        while checks < max_attempts {
            if *cancel.borrow_and_update() {
                return self.finish(PollState::Cancelled, last_observed, checks);
            }

            checks += 1;
            match self.source.status().await {
                Ok(status) => {
                    let class = self.policy.classify(&status);
                    last_observed = status;
                    match class {
                        StatusClass::Ready => {
                            return self.finish(PollState::Ready, last_observed, checks);
                        }
                        StatusClass::Failed => {
                            return self.finish(PollState::Failed, last_observed, checks);
                        }
                        StatusClass::InProgress => info!(
                            event_name = "poller.attempt",
                            attempt = checks,
                            max_attempts,
                            status = %last_observed,
                            "status still in progress"
                        ),
                        StatusClass::Unrecognized => warn!(
                            event_name = "poller.attempt",
                            attempt = checks,
                            max_attempts,
                            status = %last_observed,
                            "unrecognized status; continuing to poll"
                        ),
                    }
                }
                Err(error) => warn!(
                    event_name = "poller.attempt_failed",
                    attempt = checks,
                    max_attempts,
                    error = %error,
                    "status check failed; retrying after interval"
                ),
            }

            if checks < max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.interval) => {}
                    _ = cancellation(&mut cancel) => {
                        return self.finish(PollState::Cancelled, last_observed, checks);
                    }
                }
            }
        }

        self.finish(PollState::Timeout, last_observed, checks)
    }

    fn finish(&self, final_status: PollState, last_observed: String, checks: u32) -> PollResult {
        let result =
            PollResult { final_status, last_observed_status: last_observed, elapsed_checks: checks };
        match final_status {
            PollState::Ready => info!(
                event_name = "poller.finished",
                final_status = final_status.as_str(),
                elapsed_checks = checks,
                "watched resource is ready"
            ),
            PollState::Cancelled => info!(
                event_name = "poller.finished",
                final_status = final_status.as_str(),
                last_observed_status = %result.last_observed_status,
                elapsed_checks = checks,
                "polling cancelled by caller"
            ),
            _ => warn!(
                event_name = "poller.finished",
                final_status = final_status.as_str(),
                last_observed_status = %result.last_observed_status,
                elapsed_checks = checks,
                interval_secs = self.policy.interval.as_secs(),
                "polling stopped without ready status"
            ),
        }
        result
    }
}

/// Resolves once the flag flips to `true`. A closed channel never cancels.
async fn cancellation(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            debug!("cancellation channel closed; polling continues uninterrupted");
            std::future::pending::<()>().await;
        }
    }
}

fn to_set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
