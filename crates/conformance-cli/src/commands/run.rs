//! Run command - execute the conformance tests against a cluster
//!
//! Usage: inference-conformance run --controller-name <name> [options]
//!
//! Applies the base manifests, runs every selected test in registration
//! order, prints a summary and exits non-zero when any test failed.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::info;

use conformance_common::config::{
    DEFAULT_DELETION, DEFAULT_GATEWAY_CONDITION, DEFAULT_MODEL_CONDITION, DEFAULT_POOL_CONDITION,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_ROUTE_CONDITION,
};
use conformance_common::kube_utils;
use conformance_common::{TimeoutConfig, TimeoutPolicy};
use conformance_suite::registry::Registry;
use conformance_suite::runner::DEFAULT_BASE_MANIFEST;
use conformance_suite::suite::features;
use conformance_suite::{cases, ConformanceSuite, KubeResourceClient, Runner, RunnerOptions};

use crate::{Error, Result};

/// Run the conformance tests
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to kubeconfig (defaults to in-cluster or ~/.kube/config)
    #[arg(short = 'k', long, env = "CONFORMANCE_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Controller name the implementation writes into route parent status
    #[arg(long, env = "CONFORMANCE_CONTROLLER_NAME")]
    pub controller_name: String,

    /// Features the implementation supports (comma separated)
    #[arg(long, env = "CONFORMANCE_SUPPORTED_FEATURES", value_delimiter = ',')]
    pub supported_features: Vec<String>,

    /// Claim support for every known feature
    #[arg(long, conflicts_with = "supported_features")]
    pub all_features: bool,

    /// Tests to skip (comma separated or repeated)
    #[arg(long = "skip-test", value_delimiter = ',')]
    pub skip_tests: Vec<String>,

    /// Run only this test
    #[arg(long)]
    pub run_test: Option<String>,

    /// Directory manifest paths are resolved against
    #[arg(long, env = "CONFORMANCE_MANIFEST_DIR", default_value = "conformance")]
    pub manifest_dir: PathBuf,

    /// Manifests applied once before any test (repeatable)
    #[arg(long = "base-manifest", default_value = DEFAULT_BASE_MANIFEST)]
    pub base_manifests: Vec<String>,

    /// Leave each test's resources in place after it ran
    #[arg(long)]
    pub no_cleanup: bool,

    /// Per-class wait timeouts
    #[command(flatten)]
    pub timeouts: TimeoutArgs,
}

/// Wait timeouts and poll intervals, in seconds unless noted
#[derive(Args, Debug, Clone)]
pub struct TimeoutArgs {
    /// InferencePool condition timeout
    #[arg(long, env = "CONFORMANCE_POOL_TIMEOUT_SECS", default_value_t = DEFAULT_POOL_CONDITION.timeout.as_secs())]
    pub pool_timeout_secs: u64,

    /// InferencePool condition poll interval
    #[arg(long, default_value_t = DEFAULT_POOL_CONDITION.poll_interval.as_secs())]
    pub pool_interval_secs: u64,

    /// InferenceModel condition timeout
    #[arg(long, env = "CONFORMANCE_MODEL_TIMEOUT_SECS", default_value_t = DEFAULT_MODEL_CONDITION.timeout.as_secs())]
    pub model_timeout_secs: u64,

    /// InferenceModel condition poll interval
    #[arg(long, default_value_t = DEFAULT_MODEL_CONDITION.poll_interval.as_secs())]
    pub model_interval_secs: u64,

    /// HTTPRoute condition timeout
    #[arg(long, env = "CONFORMANCE_ROUTE_TIMEOUT_SECS", default_value_t = DEFAULT_ROUTE_CONDITION.timeout.as_secs())]
    pub route_timeout_secs: u64,

    /// HTTPRoute condition poll interval
    #[arg(long, default_value_t = DEFAULT_ROUTE_CONDITION.poll_interval.as_secs())]
    pub route_interval_secs: u64,

    /// Gateway condition timeout
    #[arg(long, env = "CONFORMANCE_GATEWAY_TIMEOUT_SECS", default_value_t = DEFAULT_GATEWAY_CONDITION.timeout.as_secs())]
    pub gateway_timeout_secs: u64,

    /// Gateway condition poll interval
    #[arg(long, default_value_t = DEFAULT_GATEWAY_CONDITION.poll_interval.as_secs())]
    pub gateway_interval_secs: u64,

    /// Time allowed for a deleted object to disappear
    #[arg(long, env = "CONFORMANCE_DELETION_TIMEOUT_SECS", default_value_t = DEFAULT_DELETION.timeout.as_secs())]
    pub deletion_timeout_secs: u64,

    /// Deletion poll interval
    #[arg(long, default_value_t = DEFAULT_DELETION.poll_interval.as_secs())]
    pub deletion_interval_secs: u64,

    /// Upper bound for a single read
    #[arg(long, env = "CONFORMANCE_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub request_timeout_secs: u64,

    /// Pause after each mutation, in milliseconds
    #[arg(long, env = "CONFORMANCE_SETTLE_DELAY_MS", default_value_t = 0)]
    pub settle_delay_ms: u64,
}

fn policy(timeout_secs: u64, interval_secs: u64) -> TimeoutPolicy {
    TimeoutPolicy::new(
        Duration::from_secs(timeout_secs),
        Duration::from_secs(interval_secs),
    )
}

impl TimeoutArgs {
    /// Build and validate the timeout configuration
    pub fn to_config(&self) -> Result<TimeoutConfig> {
        let config = TimeoutConfig {
            pool_condition: policy(self.pool_timeout_secs, self.pool_interval_secs),
            model_condition: policy(self.model_timeout_secs, self.model_interval_secs),
            route_condition: policy(self.route_timeout_secs, self.route_interval_secs),
            gateway_condition: policy(self.gateway_timeout_secs, self.gateway_interval_secs),
            deletion: policy(self.deletion_timeout_secs, self.deletion_interval_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        };
        config.validate()?;
        Ok(config)
    }
}

impl RunArgs {
    /// Features to declare on the suite, rejecting unknown names
    pub fn features(&self) -> Result<BTreeSet<String>> {
        if self.all_features {
            return Ok(features::ALL.iter().map(|f| f.to_string()).collect());
        }
        let unknown: Vec<&str> = self
            .supported_features
            .iter()
            .map(String::as_str)
            .filter(|f| !features::ALL.contains(f))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::validation(format!(
                "unknown features: {} (known: {})",
                unknown.join(", "),
                features::ALL.join(", ")
            )));
        }
        Ok(self.supported_features.iter().cloned().collect())
    }

    /// Runner options, rejecting test names the registry does not know
    pub fn runner_options(&self, registry: &Registry) -> Result<RunnerOptions> {
        let named = self.skip_tests.iter().chain(self.run_test.iter());
        for name in named {
            if registry.get(name).is_none() {
                return Err(Error::validation(format!("unknown test: {name}")));
            }
        }
        Ok(RunnerOptions {
            manifest_dir: self.manifest_dir.clone(),
            base_manifests: self.base_manifests.clone(),
            skip_tests: self.skip_tests.iter().cloned().collect(),
            run_test: self.run_test.clone(),
            cleanup: !self.no_cleanup,
        })
    }
}

/// Run the registered tests and fail if any test failed
pub async fn run(args: RunArgs) -> Result<()> {
    let registry = cases::registry();
    let timeouts = args.timeouts.to_config()?;
    let features = args.features()?;
    let options = args.runner_options(&registry)?;

    let client = kube_utils::create_client_with_timeout(
        args.kubeconfig.as_deref(),
        kube_utils::DEFAULT_CONNECT_TIMEOUT,
        timeouts.request_timeout,
    )
    .await?;
    let suite = ConformanceSuite::new(
        Arc::new(KubeResourceClient::new(client)),
        timeouts,
        args.controller_name.as_str(),
    )
    .with_supported_features(features);

    info!(
        controller = %args.controller_name,
        tests = registry.len(),
        manifest_dir = %options.manifest_dir.display(),
        "starting conformance run"
    );

    let report = Runner::new(&suite, options).run(&registry).await?;
    report.finish()?;
    Ok(())
}
