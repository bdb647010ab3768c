//! Run-all-and-report execution of a registry
//!
//! The runner applies the base manifests once, then runs every registered
//! case in order: filtered and unsupported cases are skipped, the case's own
//! manifests are applied, the body runs with panics caught, and the
//! resources it applied are optionally removed again. A failing case never
//! stops the run; [`RunReport::finish`] turns failures into an error.

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{info, warn};

use conformance_common::{Error, ResourceRef, Result};

use crate::manifest;
use crate::registry::{Registry, TestCase};
use crate::suite::ConformanceSuite;

/// Default location of the shared gateways and namespaces, relative to the
/// manifest directory
pub const DEFAULT_BASE_MANIFEST: &str = "resources/manifests/manifests.yaml";

/// Run-level options
#[derive(Clone, Debug)]
pub struct RunnerOptions {
    /// Base directory manifest paths are resolved against
    pub manifest_dir: PathBuf,
    /// Manifests applied once before any case
    pub base_manifests: Vec<String>,
    /// Cases never run
    pub skip_tests: BTreeSet<String>,
    /// Run only this case
    pub run_test: Option<String>,
    /// Delete each case's resources after it ran
    pub cleanup: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("conformance"),
            base_manifests: vec![DEFAULT_BASE_MANIFEST.to_string()],
            skip_tests: BTreeSet::new(),
            run_test: None,
            cleanup: true,
        }
    }
}

/// How one case ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The body returned Ok
    Passed,
    /// Manifests failed to apply, or the body failed or panicked
    Failed(String),
    /// Not run
    Skipped(String),
}

/// Result of one case
#[derive(Clone, Debug)]
pub struct TestResult {
    /// Case short name
    pub name: String,
    /// Outcome
    pub outcome: Outcome,
    /// Wall-clock time including manifest application and cleanup
    pub duration: Duration,
}

/// Results of a whole run, in execution order
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    results: Vec<TestResult>,
}

impl RunReport {
    /// Record one result
    pub fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// All results
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    fn count(&self, f: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| f(&r.outcome)).count()
    }

    /// Number of passed cases
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    /// Number of failed cases
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Number of skipped cases
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    /// Log the summary and fail if any case failed
    pub fn finish(&self) -> Result<()> {
        let total: Duration = self.results.iter().map(|r| r.duration).sum();

        info!("========================================");
        info!("  INFERENCE GATEWAY CONFORMANCE");
        info!("========================================");
        for r in &self.results {
            let (tag, detail) = match &r.outcome {
                Outcome::Passed => ("PASS", None),
                Outcome::Failed(e) => ("FAIL", Some(e)),
                Outcome::Skipped(reason) => ("SKIP", Some(reason)),
            };
            info!("  {tag}  {:50} {:.1}s", r.name, r.duration.as_secs_f64());
            if let Some(detail) = detail {
                info!("        -> {}", truncate(detail, 300));
            }
        }
        info!("----------------------------------------");
        info!(
            "  {} passed, {} failed, {} skipped ({:.1}s total)",
            self.passed(),
            self.failed(),
            self.skipped(),
            total.as_secs_f64()
        );
        info!("========================================");

        if self.failed() == 0 {
            return Ok(());
        }
        let failures: Vec<_> = self
            .results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
            .map(|r| r.name.as_str())
            .collect();
        Err(Error::assertion(
            "conformance run",
            format!("{} test(s) failed: {}", failures.len(), failures.join(", ")),
        ))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Executes a registry against one suite
pub struct Runner<'s> {
    suite: &'s ConformanceSuite,
    options: RunnerOptions,
}

impl<'s> Runner<'s> {
    /// Create a runner
    pub fn new(suite: &'s ConformanceSuite, options: RunnerOptions) -> Self {
        Self { suite, options }
    }

    /// Why a case will not run, if it won't
    pub fn skip_reason(&self, test: &TestCase) -> Option<String> {
        if let Some(only) = &self.options.run_test {
            if only != test.short_name {
                return Some(format!("only {only} selected"));
            }
        }
        if self.options.skip_tests.contains(test.short_name) {
            return Some("listed in skip tests".to_string());
        }
        let missing: Vec<_> = test
            .features
            .iter()
            .filter(|f| !self.suite.supported_features().contains(**f))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Some(format!("unsupported features: {}", missing.join(", ")));
        }
        None
    }

    /// Run every case of the registry in order
    ///
    /// Only a failure to apply the base manifests aborts the run; case
    /// failures are recorded in the report.
    pub async fn run(&self, registry: &Registry) -> Result<RunReport> {
        if !self.options.base_manifests.is_empty() {
            let base: Vec<&str> = self
                .options
                .base_manifests
                .iter()
                .map(String::as_str)
                .collect();
            let mut applied = Vec::new();
            self.apply_manifests(&base, &mut applied).await?;
            info!(resources = applied.len(), "base manifests applied");
        }

        let mut report = RunReport::default();
        for test in registry.list_all() {
            if let Some(reason) = self.skip_reason(test) {
                info!(test = test.short_name, reason = %reason, "skipping");
                report.record(TestResult {
                    name: test.short_name.to_string(),
                    outcome: Outcome::Skipped(reason),
                    duration: Duration::ZERO,
                });
                continue;
            }
            report.record(self.run_one(test).await);
        }
        Ok(report)
    }

    async fn run_one(&self, test: &TestCase) -> TestResult {
        info!(test = test.short_name, "{}", test.description);
        let start = Instant::now();
        let mut applied = Vec::new();

        let outcome = match self.apply_manifests(test.manifests, &mut applied).await {
            Err(e) => Outcome::Failed(format!("applying manifests: {e}")),
            Ok(()) => match AssertUnwindSafe(test.run(self.suite)).catch_unwind().await {
                Ok(Ok(())) => Outcome::Passed,
                Ok(Err(e)) => Outcome::Failed(e.to_string()),
                Err(panic) => Outcome::Failed(format!("PANIC: {}", panic_message(&*panic))),
            },
        };

        match &outcome {
            Outcome::Failed(e) => warn!(test = test.short_name, error = %e, "failed"),
            _ => info!(test = test.short_name, "passed"),
        }

        if self.options.cleanup {
            self.cleanup(&applied).await;
        }

        TestResult {
            name: test.short_name.to_string(),
            outcome,
            duration: start.elapsed(),
        }
    }

    /// Apply manifests in dependency order, recording what was applied
    async fn apply_manifests(
        &self,
        manifests: &[&str],
        applied: &mut Vec<ResourceRef>,
    ) -> Result<()> {
        if manifests.is_empty() {
            return Ok(());
        }
        let documents = manifest::load_all(&self.options.manifest_dir, manifests).await?;
        for document in &documents {
            applied.push(self.suite.client().apply(document).await?);
        }
        Ok(())
    }

    /// Delete applied resources in reverse order; missing ones are fine
    async fn cleanup(&self, applied: &[ResourceRef]) {
        for reference in applied.iter().rev() {
            match self.suite.client().delete(reference).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(resource = %reference, error = %e, "cleanup failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockResourceClient;
    use crate::registry::RegistryBuilder;
    use crate::suite::features;
    use conformance_common::{ResourceKind, TimeoutConfig};
    use futures::future::BoxFuture;
    use mockall::Sequence;
    use std::sync::Arc;

    fn passes(_: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn fails(_: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
        async { Err(Error::assertion("InferencePool app/p", "wrong reason")) }.boxed()
    }

    fn panics(_: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
        async { panic!("boom") }.boxed()
    }

    fn case(name: &'static str, body: crate::registry::TestBody) -> TestCase {
        TestCase {
            short_name: name,
            description: "test",
            manifests: &[],
            features: &[],
            body,
        }
    }

    fn options() -> RunnerOptions {
        RunnerOptions {
            base_manifests: Vec::new(),
            ..Default::default()
        }
    }

    fn suite(mock: MockResourceClient) -> ConformanceSuite {
        ConformanceSuite::new(Arc::new(mock), TimeoutConfig::default(), "ctrl")
            .with_supported_features([features::SUPPORT_INFERENCE_POOL])
    }

    /// Story: one broken case does not hide the others
    #[tokio::test]
    async fn story_failures_are_recorded_and_run_continues() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(case("First", passes))
            .register(case("Second", fails))
            .register(case("Third", panics))
            .register(case("Fourth", passes));
        let registry = builder.build();

        let suite = suite(MockResourceClient::new());
        let report = Runner::new(&suite, options()).run(&registry).await.unwrap();

        let outcomes: Vec<_> = report.results().iter().map(|r| &r.outcome).collect();
        assert_eq!(outcomes[0], &Outcome::Passed);
        assert!(matches!(outcomes[1], Outcome::Failed(e) if e.contains("wrong reason")));
        assert!(matches!(outcomes[2], Outcome::Failed(e) if e.contains("PANIC: boom")));
        assert_eq!(outcomes[3], &Outcome::Passed);

        let err = report.finish().unwrap_err();
        assert!(err.to_string().contains("2 test(s) failed: Second, Third"));
    }

    #[tokio::test]
    async fn test_skip_rules() {
        let mut needs_model = case("NeedsModel", passes);
        needs_model.features = &[
            features::SUPPORT_INFERENCE_MODEL,
            features::SUPPORT_INFERENCE_POOL,
        ];
        let mut builder = RegistryBuilder::new();
        builder
            .register(case("Skipped", fails))
            .register(needs_model)
            .register(case("Runs", passes));
        let registry = builder.build();

        let suite = suite(MockResourceClient::new());
        let mut opts = options();
        opts.skip_tests.insert("Skipped".to_string());
        let report = Runner::new(&suite, opts).run(&registry).await.unwrap();

        assert_eq!(report.skipped(), 2);
        assert_eq!(report.passed(), 1);
        match &report.results()[1].outcome {
            Outcome::Skipped(reason) => assert!(reason.contains("SupportInferenceModel")),
            other => panic!("Expected Skipped, got {other:?}"),
        }
        assert!(report.finish().is_ok());
    }

    #[tokio::test]
    async fn test_single_test_filter() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(case("A", fails))
            .register(case("B", passes));
        let registry = builder.build();

        let suite = suite(MockResourceClient::new());
        let mut opts = options();
        opts.run_test = Some("B".to_string());
        let report = Runner::new(&suite, opts).run(&registry).await.unwrap();

        assert_eq!(report.passed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_manifests_applied_then_cleaned_up_in_reverse() {
        let dir = std::env::temp_dir().join(format!("conformance-runner-{}", std::process::id()));
        tokio::fs::create_dir_all(dir.join("tests")).await.unwrap();
        tokio::fs::write(
            dir.join("tests/case.yaml"),
            "apiVersion: gateway.networking.k8s.io/v1\nkind: HTTPRoute\nmetadata:\n  name: r\n  namespace: app\n---\napiVersion: inference.networking.x-k8s.io/v1alpha2\nkind: InferencePool\nmetadata:\n  name: p\n  namespace: app\n",
        )
        .await
        .unwrap();

        let mut seq = Sequence::new();
        let mut mock = MockResourceClient::new();
        mock.expect_apply()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|m| m["kind"] == "InferencePool")
            .returning(|_| Ok(ResourceKind::InferencePool.named("p", "app")));
        mock.expect_apply()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|m| m["kind"] == "HTTPRoute")
            .returning(|_| Ok(ResourceKind::HttpRoute.named("r", "app")));
        // The case deleted the route itself
        mock.expect_delete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.kind == "HTTPRoute")
            .returning(|r| Err(Error::not_found(r.to_string())));
        mock.expect_delete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.kind == "InferencePool")
            .returning(|_| Ok(()));

        let mut test = case("WithManifests", passes);
        test.manifests = &["tests/case.yaml"];
        let mut builder = RegistryBuilder::new();
        builder.register(test);

        let suite = suite(mock);
        let mut opts = options();
        opts.manifest_dir = dir.clone();
        let report = Runner::new(&suite, opts)
            .run(&builder.build())
            .await
            .unwrap();
        assert_eq!(report.passed(), 1);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_case_manifest_fails_only_that_case() {
        let mut broken = case("Broken", passes);
        broken.manifests = &["tests/does-not-exist.yaml"];
        let mut builder = RegistryBuilder::new();
        builder.register(broken).register(case("Fine", passes));

        let suite = suite(MockResourceClient::new());
        let mut opts = options();
        opts.manifest_dir = std::env::temp_dir();
        let report = Runner::new(&suite, opts)
            .run(&builder.build())
            .await
            .unwrap();

        assert!(matches!(
            &report.results()[0].outcome,
            Outcome::Failed(e) if e.contains("applying manifests")
        ));
        assert_eq!(report.results()[1].outcome, Outcome::Passed);
    }

    #[tokio::test]
    async fn test_missing_base_manifest_aborts_run() {
        let mut builder = RegistryBuilder::new();
        builder.register(case("Never", passes));

        let suite = suite(MockResourceClient::new());
        let opts = RunnerOptions {
            manifest_dir: std::env::temp_dir().join("conformance-no-such-dir"),
            ..Default::default()
        };
        let err = Runner::new(&suite, opts)
            .run(&builder.build())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 300), "short");
    }
}
