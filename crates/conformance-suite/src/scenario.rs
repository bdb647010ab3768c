//! Multi-step scenarios: observe, mutate, re-observe
//!
//! A scenario is an ordered list of steps run strictly in sequence. Each
//! step starts only after the previous one succeeded; the first failure
//! aborts the scenario, so later mutations are never issued against a
//! cluster in an unexpected state.
//!
//! Mutations are fenced rather than followed by a fixed sleep:
//!
//! - a Delete records the object's uid, deletes it and waits until reads
//!   return not-found (or a different uid)
//! - an Await added with [`Scenario::await_fresh`] ignores snapshots whose
//!   resourceVersion is not newer than the one read right before the
//!   preceding mutation
//!
//! The configured settle delay (zero by default) is slept after each
//! mutation's fence has passed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use conformance_common::{Error, ResourceRef, ResourceSnapshot, Result};

use crate::poller::ConditionWait;
use crate::suite::ConformanceSuite;

/// Check run by an Inspect step against a single read
pub type InspectFn = dyn Fn(&ResourceSnapshot) -> Result<()> + Send + Sync;

/// One step of a scenario
#[derive(Clone)]
pub enum Step {
    /// Poll until a condition wait converges
    Await {
        /// What the step verifies
        description: String,
        /// The wait to run
        wait: ConditionWait,
        /// Ignore snapshots older than the preceding mutation
        fenced: bool,
    },
    /// Delete an object and wait until it is gone
    Delete {
        /// What the step does
        description: String,
        /// Object to delete
        target: ResourceRef,
    },
    /// Server-side apply a manifest document
    Apply {
        /// What the step does
        description: String,
        /// Document to apply
        manifest: Value,
    },
    /// Read an object once and check it
    Inspect {
        /// What the step verifies
        description: String,
        /// Object to read
        target: ResourceRef,
        /// Check on the read snapshot
        check: Arc<InspectFn>,
    },
}

impl Step {
    /// Human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::Await { description, .. }
            | Self::Delete { description, .. }
            | Self::Apply { description, .. }
            | Self::Inspect { description, .. } => description,
        }
    }

    /// Whether the step changes cluster state
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Delete { .. } | Self::Apply { .. })
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Await { fenced: true, .. } => "AwaitFresh",
            Self::Await { .. } => "Await",
            Self::Delete { .. } => "Delete",
            Self::Apply { .. } => "Apply",
            Self::Inspect { .. } => "Inspect",
        };
        write!(f, "{kind}({:?})", self.description())
    }
}

/// Ordered sequence of steps against one suite
pub struct Scenario<'s> {
    name: String,
    suite: &'s ConformanceSuite,
    steps: Vec<Step>,
}

impl<'s> Scenario<'s> {
    /// Empty scenario
    pub fn new(name: impl Into<String>, suite: &'s ConformanceSuite) -> Self {
        Self {
            name: name.into(),
            suite,
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append an Await step
    pub fn await_condition(self, description: impl Into<String>, wait: ConditionWait) -> Self {
        self.step(Step::Await {
            description: description.into(),
            wait,
            fenced: false,
        })
    }

    /// Append an Await step that only accepts snapshots written after the
    /// preceding mutation
    pub fn await_fresh(self, description: impl Into<String>, wait: ConditionWait) -> Self {
        self.step(Step::Await {
            description: description.into(),
            wait,
            fenced: true,
        })
    }

    /// Append a Delete step
    pub fn delete(self, description: impl Into<String>, target: ResourceRef) -> Self {
        self.step(Step::Delete {
            description: description.into(),
            target,
        })
    }

    /// Append an Apply step
    pub fn apply(self, description: impl Into<String>, manifest: Value) -> Self {
        self.step(Step::Apply {
            description: description.into(),
            manifest,
        })
    }

    /// Append an Inspect step
    pub fn inspect<F>(self, description: impl Into<String>, target: ResourceRef, check: F) -> Self
    where
        F: Fn(&ResourceSnapshot) -> Result<()> + Send + Sync + 'static,
    {
        self.step(Step::Inspect {
            description: description.into(),
            target,
            check: Arc::new(check),
        })
    }

    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run(self) -> Result<()> {
        info!(scenario = %self.name, steps = self.steps.len(), "starting scenario");
        let mut fences: HashMap<ResourceRef, String> = HashMap::new();

        for (i, step) in self.steps.iter().enumerate() {
            let index = i + 1;
            info!(scenario = %self.name, step = index, "{}", step.description());

            if step.is_mutation() {
                fences = self.capture_fences(&self.steps[index..]).await;
            }

            if let Err(e) = self.execute(step, &fences).await {
                warn!(
                    scenario = %self.name,
                    step = index,
                    error = %e,
                    "scenario aborted"
                );
                return Err(Error::step(&self.name, index, step.description(), e));
            }
        }

        info!(scenario = %self.name, "scenario passed");
        Ok(())
    }

    /// Read the current resourceVersion of every fenced Await target up to
    /// the next mutation
    async fn capture_fences(&self, upcoming: &[Step]) -> HashMap<ResourceRef, String> {
        let mut fences = HashMap::new();
        let targets = upcoming
            .iter()
            .take_while(|s| !s.is_mutation())
            .filter_map(|s| match s {
                Step::Await {
                    wait, fenced: true, ..
                } => Some(&wait.target),
                _ => None,
            });

        for target in targets {
            if fences.contains_key(target) {
                continue;
            }
            let poll_interval = self.suite.policy_for(target).poll_interval;
            match self.suite.poller().read_once(target, poll_interval).await {
                Ok(ResourceSnapshot {
                    resource_version: Some(version),
                    ..
                }) => {
                    debug!(resource = %target, resource_version = %version, "fence captured");
                    fences.insert(target.clone(), version);
                }
                Ok(_) => debug!(resource = %target, "no resourceVersion, wait is unfenced"),
                Err(e) => debug!(resource = %target, error = %e, "fence not captured"),
            }
        }
        fences
    }

    async fn execute(&self, step: &Step, fences: &HashMap<ResourceRef, String>) -> Result<()> {
        match step {
            Step::Await { wait, fenced, .. } => {
                let mut wait = wait.clone();
                if *fenced {
                    wait.fence = fences.get(&wait.target).cloned();
                }
                self.suite.poller().wait(&wait).await.map(|_| ())
            }
            Step::Delete { target, .. } => self.execute_delete(target).await,
            Step::Apply { manifest, .. } => self.execute_apply(manifest).await,
            Step::Inspect { target, check, .. } => {
                let snapshot = self
                    .suite
                    .poller()
                    .fetch(target, self.suite.policy_for(target))
                    .await?;
                check(&snapshot)
            }
        }
    }

    /// Delete `target` and wait for it to disappear
    ///
    /// The uid read before the delete retries transient errors within the
    /// deletion policy; only a missing object or a rejected delete is fatal.
    async fn execute_delete(&self, target: &ResourceRef) -> Result<()> {
        let policy = self.suite.timeouts().deletion;
        let uid = match self.suite.poller().fetch(target, policy).await {
            Ok(snapshot) => snapshot.uid,
            Err(e) if e.is_not_found() => {
                return Err(Error::mutation("delete", target.to_string(), e.to_string()))
            }
            Err(e) => return Err(e),
        };

        self.suite.client().delete(target).await.map_err(|e| match e {
            Error::Mutation { .. } => e,
            other => Error::mutation("delete", target.to_string(), other.to_string()),
        })?;

        let observed = self
            .suite
            .poller()
            .wait_for_deletion(target, uid.as_deref(), policy)
            .await?;
        info!(
            resource = %target,
            outcome = ?observed.value,
            attempts = observed.attempts,
            "deletion observed"
        );

        self.settle().await;
        Ok(())
    }

    async fn execute_apply(&self, manifest: &Value) -> Result<()> {
        let reference = self.suite.client().apply(manifest).await.map_err(|e| match e {
            Error::Mutation { .. } => e,
            other => Error::mutation("apply", "manifest", other.to_string()),
        })?;
        info!(resource = %reference, "applied");

        self.settle().await;
        Ok(())
    }

    async fn settle(&self) {
        let delay = self.suite.timeouts().settle_delay;
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "settling after mutation");
            tokio::time::sleep(delay).await;
        }
    }
}
