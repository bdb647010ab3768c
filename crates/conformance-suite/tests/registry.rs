//! Public contract of the built-in registry and the suite types

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use conformance_common::{
    ConditionExpectation, Error, NamespacedName, ResourceKind, ResourceRef, ResourceSnapshot,
    Result, TimeoutConfig, TimeoutPolicy,
};
use conformance_suite::suite::features;
use conformance_suite::{
    cases, ConformanceSuite, Outcome, RegistryBuilder, ResourceClient, Runner, RunnerOptions,
    TestCase,
};

/// Client for a cluster where nothing exists
struct EmptyCluster;

#[async_trait]
impl ResourceClient for EmptyCluster {
    async fn get(&self, reference: &ResourceRef) -> Result<ResourceSnapshot> {
        Err(Error::not_found(reference.to_string()))
    }

    async fn delete(&self, reference: &ResourceRef) -> Result<()> {
        Err(Error::not_found(reference.to_string()))
    }

    async fn apply(&self, _manifest: &Value) -> Result<ResourceRef> {
        Err(Error::internal("read-only cluster"))
    }
}

fn suite() -> ConformanceSuite {
    ConformanceSuite::new(
        Arc::new(EmptyCluster),
        TimeoutConfig::default(),
        "example.com/gateway-controller",
    )
}

#[test]
fn builtin_registry_lists_cases_in_declaration_order() {
    let registry = cases::registry();
    assert_eq!(registry.len(), 5);
    assert_eq!(
        registry.list_all()[0].short_name,
        "InferencePoolResolvedRefsCondition"
    );
    assert_eq!(
        registry.list_all()[4].short_name,
        "InferenceModelAccepted"
    );
    assert!(registry.get("InferencePoolStatusNoMatchingPods").is_some());
}

#[test]
fn builtin_features_are_known() {
    for case in cases::registry().list_all() {
        for feature in case.features {
            assert!(
                features::ALL.contains(feature),
                "{} requires unknown feature {feature}",
                case.short_name
            );
        }
    }
}

fn custom_body(suite: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
    async move {
        let gateway = NamespacedName::new("gw", "infra");
        suite
            .poller()
            .wait(&suite.gateway_condition(&gateway, ConditionExpectation::accepted()))
            .await
            .map(|_| ())
    }
    .boxed()
}

/// Story: a downstream crate registers its own case next to the built-ins
///
/// Against an empty cluster the custom case times out within its class
/// policy and is reported as failed; the feature-gated built-in is skipped.
#[tokio::test(start_paused = true)]
async fn custom_case_runs_through_public_api() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(TestCase {
            short_name: "GatewayAccepted",
            description: "gateway accepted",
            manifests: &[],
            features: &[],
            body: custom_body,
        })
        .register(cases::INFERENCE_MODEL_ACCEPTED);
    let registry = builder.build();

    let timeouts = TimeoutConfig {
        gateway_condition: TimeoutPolicy::new(Duration::from_secs(5), Duration::from_secs(1)),
        ..Default::default()
    };
    let suite = ConformanceSuite::new(Arc::new(EmptyCluster), timeouts, "ctrl");
    let options = RunnerOptions {
        base_manifests: Vec::new(),
        ..Default::default()
    };

    let report = Runner::new(&suite, options).run(&registry).await.unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 1);
    match &report.results()[0].outcome {
        Outcome::Failed(message) => {
            assert!(message.contains("Gateway infra/gw"));
            assert!(message.contains("not found"));
        }
        other => panic!("Expected failure, got {other:?}"),
    }
    assert!(report.finish().is_err());
}

#[test]
fn suite_exposes_configuration() {
    let suite = suite().with_supported_features(features::ALL.iter().copied());
    assert_eq!(suite.controller_name(), "example.com/gateway-controller");
    assert!(suite.supports_all(cases::INFERENCE_MODEL_ACCEPTED.features));
    assert_eq!(
        suite
            .pool_condition(
                &NamespacedName::new("p", "app"),
                ConditionExpectation::accepted()
            )
            .target,
        ResourceKind::InferencePool.named("p", "app")
    );
}
