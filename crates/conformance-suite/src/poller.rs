//! Eventually-consistent wait primitive
//!
//! The poller reads one resource at a fixed rate until a predicate holds or
//! the policy's timeout elapses. Reads are scheduled at `start + n * interval`
//! and the final sleep is clamped to the deadline, so a wait with timeout `T`
//! and interval `I` performs between `floor(T/I)` and `ceil(T/I) + 1` reads.
//! There is no backoff.
//!
//! Every read is bounded by `min(request_timeout, poll_interval)`. A failed
//! or timed-out read is a non-match, never an error: the status of a freshly
//! created object is routinely missing for a while. Only the overall deadline
//! fails a wait, and the resulting [`Error::Timeout`] carries the last state
//! that was observed.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use conformance_common::condition::{describe, evaluate, matches_all};
use conformance_common::{
    ConditionExpectation, Error, ResourceRef, ResourceSnapshot, Result, TimeoutPolicy,
};

use crate::client::ResourceClient;
use crate::selector::Selector;

/// Verdict of a caller predicate on one snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    /// The resource reached the awaited state
    Converged,
    /// Not there yet; carries a description of what was observed
    Pending(String),
}

/// Successful outcome of a wait
#[derive(Clone, Debug)]
pub struct Observation<T = ResourceSnapshot> {
    /// The converged snapshot (or other wait-specific result)
    pub value: T,
    /// Reads performed, including the converging one
    pub attempts: u32,
    /// Time from the first read to convergence
    pub elapsed: Duration,
}

/// How a deleted object left the API
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disappearance {
    /// Reads return not-found
    Gone,
    /// An object with the same name but a different uid exists
    Replaced,
}

/// A condition wait, fully described
#[derive(Clone, Debug)]
pub struct ConditionWait {
    /// Resource to read
    pub target: ResourceRef,
    /// Where the conditions live
    pub selector: Selector,
    /// Expectations that must hold together in one selected group
    pub expected: Vec<ConditionExpectation>,
    /// Timeout and poll interval
    pub policy: TimeoutPolicy,
    /// Snapshots at or below this resourceVersion are stale
    pub fence: Option<String>,
}

impl ConditionWait {
    /// Wait on `target` with no expectations yet
    pub fn new(target: ResourceRef, selector: Selector, policy: TimeoutPolicy) -> Self {
        Self {
            target,
            selector,
            expected: Vec::new(),
            policy,
            fence: None,
        }
    }

    /// Add an expectation
    pub fn expect(mut self, expected: ConditionExpectation) -> Self {
        self.expected.push(expected);
        self
    }

    /// Override the policy
    pub fn with_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Only accept snapshots newer than `resource_version`
    pub fn fenced_after(mut self, resource_version: impl Into<String>) -> Self {
        self.fence = Some(resource_version.into());
        self
    }

    /// Expectations in human-readable form, used in timeouts
    pub fn describe_expectation(&self) -> String {
        let expected = self
            .expected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" and ");
        format!("{expected} on {}", self.selector)
    }

    fn probe(&self, snapshot: &ResourceSnapshot) -> Probe {
        let groups = match self.selector.select(snapshot) {
            Ok(groups) => groups,
            Err(e) => return Probe::Pending(format!("unreadable status: {e}")),
        };
        if groups.is_empty() {
            return Probe::Pending(format!("no status for {}", self.selector));
        }
        if groups.iter().any(|g| matches_all(g, &self.expected)) {
            return Probe::Converged;
        }

        let observed = groups
            .iter()
            .map(|g| {
                let outcomes = self
                    .expected
                    .iter()
                    .map(|e| format!("{}: {}", e.type_, evaluate(g, e)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} ({outcomes})", describe(g))
            })
            .collect::<Vec<_>>()
            .join(" | ");
        Probe::Pending(observed)
    }
}

/// Fixed-rate poller over a [`ResourceClient`]
#[derive(Clone)]
pub struct Poller {
    client: Arc<dyn ResourceClient>,
    request_timeout: Duration,
}

impl Poller {
    /// Create a poller; each read is bounded by `request_timeout` (and by the
    /// poll interval of the wait)
    pub fn new(client: Arc<dyn ResourceClient>, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    /// Wait until one expectation holds on the selected conditions
    pub async fn wait_for_condition(
        &self,
        target: &ResourceRef,
        selector: Selector,
        expected: ConditionExpectation,
        policy: TimeoutPolicy,
    ) -> Result<Observation> {
        let wait = ConditionWait::new(target.clone(), selector, policy).expect(expected);
        self.wait(&wait).await
    }

    /// Wait until every expectation holds together in one selected group
    pub async fn wait_for_conditions(
        &self,
        target: &ResourceRef,
        selector: Selector,
        expected: Vec<ConditionExpectation>,
        policy: TimeoutPolicy,
    ) -> Result<Observation> {
        let mut wait = ConditionWait::new(target.clone(), selector, policy);
        wait.expected = expected;
        self.wait(&wait).await
    }

    /// Run a fully described condition wait
    pub async fn wait(&self, wait: &ConditionWait) -> Result<Observation> {
        self.wait_for(
            &wait.target,
            &wait.describe_expectation(),
            wait.policy,
            wait.fence.as_deref(),
            |snapshot| wait.probe(snapshot),
        )
        .await
    }

    /// Wait until a caller predicate converges
    ///
    /// `waiting_for` describes the predicate in timeout errors. With a
    /// `fence`, snapshots whose resourceVersion is not newer than the fence
    /// are treated as stale and never reach the predicate.
    pub async fn wait_for<F>(
        &self,
        target: &ResourceRef,
        waiting_for: &str,
        policy: TimeoutPolicy,
        fence: Option<&str>,
        mut predicate: F,
    ) -> Result<Observation>
    where
        F: FnMut(&ResourceSnapshot) -> Probe,
    {
        self.poll(target, waiting_for, policy, |read| match read {
            Err(e) => ControlFlow::Continue(format!("read error: {e}")),
            Ok(snapshot) => {
                if let Some(fence) = fence {
                    if !snapshot.is_newer_than(fence) {
                        return ControlFlow::Continue(format!(
                            "stale snapshot (resourceVersion {} not newer than {fence})",
                            snapshot.resource_version.as_deref().unwrap_or("<none>")
                        ));
                    }
                }
                match predicate(&snapshot) {
                    Probe::Converged => ControlFlow::Break(snapshot),
                    Probe::Pending(observed) => ControlFlow::Continue(observed),
                }
            }
        })
        .await
    }

    /// Wait until a deleted object is gone
    ///
    /// With `uid`, an object of the same name but a different uid counts as
    /// gone too: it is a replacement, not the object that was deleted.
    pub async fn wait_for_deletion(
        &self,
        target: &ResourceRef,
        uid: Option<&str>,
        policy: TimeoutPolicy,
    ) -> Result<Observation<Disappearance>> {
        self.poll(target, "been deleted", policy, |read| match read {
            Err(e) if e.is_not_found() => ControlFlow::Break(Disappearance::Gone),
            Err(e) => ControlFlow::Continue(format!("read error: {e}")),
            Ok(snapshot) => match (uid, snapshot.uid.as_deref()) {
                (Some(expected), Some(current)) if expected != current => {
                    ControlFlow::Break(Disappearance::Replaced)
                }
                _ => ControlFlow::Continue(format!(
                    "still present (uid {})",
                    snapshot.uid.as_deref().unwrap_or("<none>")
                )),
            },
        })
        .await
    }

    /// Read an object that is expected to exist
    ///
    /// Transient read errors are retried within `policy`; not-found ends the
    /// wait at once with [`Error::NotFound`].
    pub async fn fetch(
        &self,
        target: &ResourceRef,
        policy: TimeoutPolicy,
    ) -> Result<ResourceSnapshot> {
        let observation = self
            .poll(target, "been readable", policy, |read| match read {
                Ok(snapshot) => ControlFlow::Break(Ok(snapshot)),
                Err(e) if e.is_not_found() => ControlFlow::Break(Err(e)),
                Err(e) => ControlFlow::Continue(format!("read error: {e}")),
            })
            .await?;
        observation.value
    }

    /// One read, bounded by the request timeout and by `poll_interval`
    pub async fn read_once(
        &self,
        target: &ResourceRef,
        poll_interval: Duration,
    ) -> Result<ResourceSnapshot> {
        let read_timeout = self.request_timeout.min(poll_interval);
        match tokio::time::timeout(read_timeout, self.client.get(target)).await {
            Ok(read) => read,
            Err(_) => Err(Error::read(
                target.to_string(),
                format!("no response within {read_timeout:?}"),
            )),
        }
    }

    async fn poll<T, F>(
        &self,
        target: &ResourceRef,
        waiting_for: &str,
        policy: TimeoutPolicy,
        mut step: F,
    ) -> Result<Observation<T>>
    where
        F: FnMut(Result<ResourceSnapshot>) -> ControlFlow<T, String>,
    {
        let start = Instant::now();
        let deadline = start.checked_add(policy.timeout).ok_or_else(|| {
            Error::config_for_field(
                "timeout",
                format!("{:?} cannot be represented as a deadline", policy.timeout),
            )
        })?;
        let mut attempts: u32 = 0;
        let mut last_observed = String::from("no read completed");

        loop {
            attempts += 1;
            let read = self.read_once(target, policy.poll_interval).await;
            if let Err(e) = &read {
                if e.is_transient() {
                    debug!(resource = %target, attempt = attempts, error = %e, "read failed, retrying");
                } else {
                    warn!(resource = %target, attempt = attempts, error = %e, "read failed, retrying");
                }
            }

            match step(read) {
                ControlFlow::Break(value) => {
                    let elapsed = start.elapsed();
                    info!(
                        resource = %target,
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "converged: {waiting_for}"
                    );
                    return Ok(Observation {
                        value,
                        attempts,
                        elapsed,
                    });
                }
                ControlFlow::Continue(observed) => {
                    if observed != last_observed {
                        info!(
                            resource = %target,
                            attempt = attempts,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            observed = %observed,
                            "state changed"
                        );
                        last_observed = observed;
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed = now - start;
                warn!(
                    resource = %target,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    last_observed = %last_observed,
                    "timed out waiting for {waiting_for}"
                );
                return Err(Error::Timeout {
                    resource: target.to_string(),
                    waiting_for: waiting_for.to_string(),
                    attempts,
                    elapsed,
                    last_observed,
                });
            }

            let next_read = policy
                .poll_interval
                .checked_mul(attempts)
                .and_then(|offset| start.checked_add(offset))
                .map_or(deadline, |at| at.min(deadline));
            tokio::time::sleep_until(next_read).await;
        }
    }
}
