//! Conformance verification engine for inference gateway implementations
//!
//! Test cases mutate declarative resources and then poll their
//! eventually-consistent status until condition predicates hold or a
//! deadline expires. The layers, leaf to root:
//!
//! - [`selector`] and `conformance_common::condition`: where conditions live
//!   and whether they match
//! - [`poller`]: fixed-rate waits with fences and bounded reads
//! - [`scenario`]: ordered observe/mutate/re-observe steps
//! - [`registry`] and [`cases`]: declared test cases
//! - [`runner`]: manifests, filtering, reporting

#![deny(missing_docs)]

pub mod cases;
pub mod client;
pub mod manifest;
pub mod poller;
pub mod registry;
pub mod runner;
pub mod scenario;
pub mod selector;
pub mod suite;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{KubeResourceClient, ResourceClient};
pub use poller::{ConditionWait, Observation, Poller, Probe};
pub use registry::{Registry, RegistryBuilder, TestCase};
pub use runner::{Outcome, RunReport, Runner, RunnerOptions};
pub use scenario::{Scenario, Step};
pub use selector::Selector;
pub use suite::ConformanceSuite;
