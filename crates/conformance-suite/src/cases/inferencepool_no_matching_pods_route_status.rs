//! Route and Gateway status for a pool whose selector matches no pods
//!
//! The expected reasons and message fragments are those a GKE Gateway
//! reports when the endpoint picker service has no NEG status.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use conformance_common::condition::{
    CONDITION_ACCEPTED, CONDITION_PROGRAMMED, CONDITION_RECONCILED,
};
use conformance_common::{
    ConditionExpectation, ConditionStatus, NamespacedName, Result, TimeoutPolicy,
    APP_BACKEND_NAMESPACE, INFRA_NAMESPACE, SHARED_GATEWAY_NAME,
};

use crate::registry::TestCase;
use crate::suite::ConformanceSuite;

const SHORT_NAME: &str = "InferencePoolNoMatchingPodsRouteStatus";

const POOL_NAME: &str = "pool-no-pods";
const ROUTE_NAME: &str = "httproute-for-pool-no-pods";

const REASON_RECONCILIATION_FAILED: &str = "ReconciliationFailed";
const REASON_INVALID: &str = "Invalid";
const MISSING_NEG_STATUS: &str = "missing neg status in annotation of extension service";
const MISSING_PORT: &str = "port 9002 does not exist";

const POLICY: TimeoutPolicy = TimeoutPolicy::new(Duration::from_secs(120), Duration::from_secs(5));

/// The route is accepted but fails reconciliation, and the gateway reports
/// it cannot be programmed
pub const INFERENCE_POOL_NO_MATCHING_PODS_ROUTE_STATUS: TestCase = TestCase {
    short_name: SHORT_NAME,
    description: "Tests HTTPRoute and Gateway status when an HTTPRoute references an InferencePool whose modelServerSelector does not match any running pods.",
    manifests: &["tests/basic/inferencepool_no_matching_pods_route_status.yaml"],
    features: &[],
    body: run,
};

fn run(suite: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
    async move {
        let pool = NamespacedName::new(POOL_NAME, APP_BACKEND_NAMESPACE);
        let route = NamespacedName::new(ROUTE_NAME, APP_BACKEND_NAMESPACE);
        let gateway = NamespacedName::new(SHARED_GATEWAY_NAME, INFRA_NAMESPACE);
        let epp_service = format!("{APP_BACKEND_NAMESPACE}/{POOL_NAME}-epp");

        let reconciliation_failed =
            ConditionExpectation::new(CONDITION_RECONCILED, ConditionStatus::False)
                .with_reason(REASON_RECONCILIATION_FAILED)
                .with_message(MISSING_NEG_STATUS)
                .with_message(epp_service.clone());
        let not_programmed = ConditionExpectation::new(CONDITION_PROGRAMMED, ConditionStatus::False)
            .with_reason(REASON_INVALID)
            .with_any_message([epp_service, MISSING_PORT.to_string(), ROUTE_NAME.to_string()]);

        suite
            .scenario(SHORT_NAME)
            .await_condition(
                format!("InferencePool {pool} accepted by its parent"),
                suite.pool_condition(&pool, ConditionExpectation::accepted()),
            )
            .await_condition(
                format!("HTTPRoute {route} accepted but not reconciled for Gateway {gateway}"),
                suite
                    .route_condition(
                        &route,
                        &gateway,
                        ConditionExpectation::new(CONDITION_ACCEPTED, ConditionStatus::True),
                    )
                    .expect(reconciliation_failed)
                    .with_policy(POLICY),
            )
            .await_condition(
                format!("Gateway {gateway} not programmed"),
                suite
                    .gateway_condition(&gateway, not_programmed)
                    .with_policy(POLICY),
            )
            .run()
            .await
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::fixtures::*;
    use crate::testing::FakeCluster;
    use conformance_common::{ResourceKind, TimeoutConfig};
    use serde_json::Value;
    use std::sync::Arc;

    const NEG_MESSAGE: &str = "error cause: no-error-isolation: missing neg status in annotation of extension service gateway-conformance-app-backend/pool-no-pods-epp";

    fn cluster(route_message: &str) -> Arc<FakeCluster> {
        cluster_with_route_acceptance(accepted(), route_message)
    }

    fn cluster_with_route_acceptance(
        route_accepted: Value,
        route_message: &str,
    ) -> Arc<FakeCluster> {
        let cluster = Arc::new(FakeCluster::new());
        let gateway = shared_gateway();

        cluster.insert(
            app(ResourceKind::InferencePool, POOL_NAME),
            Value::Null,
            pool_status(&gateway, vec![accepted()]),
        );
        cluster.script(
            app(ResourceKind::HttpRoute, ROUTE_NAME),
            Value::Null,
            vec![
                Value::Null,
                route_status(&gateway, vec![route_accepted.clone()]),
                route_status(
                    &gateway,
                    vec![
                        route_accepted,
                        condition("Reconciled", "False", "ReconciliationFailed", route_message),
                    ],
                ),
            ],
        );
        cluster.insert(
            ResourceKind::Gateway.at(gateway),
            Value::Null,
            conditions_status(vec![
                accepted(),
                condition(
                    "Programmed",
                    "False",
                    "Invalid",
                    "translateInferencePoolLbTrafficExtension for gateway-conformance-app-backend/pool-no-pods: port 9002 does not exist in service",
                ),
            ]),
        );
        cluster
    }

    fn suite(cluster: Arc<FakeCluster>) -> ConformanceSuite {
        ConformanceSuite::new(cluster, TimeoutConfig::default(), CONTROLLER)
    }

    #[tokio::test(start_paused = true)]
    async fn story_route_and_gateway_report_backend_failure() {
        let suite = suite(cluster(NEG_MESSAGE));
        INFERENCE_POOL_NO_MATCHING_PODS_ROUTE_STATUS
            .run(&suite)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_acceptance_reason_is_not_checked() {
        let suite = suite(cluster_with_route_acceptance(
            condition("Accepted", "True", "RouteAccepted", ""),
            NEG_MESSAGE,
        ));
        INFERENCE_POOL_NO_MATCHING_PODS_ROUTE_STATUS
            .run(&suite)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_message_must_name_epp_service() {
        let suite = suite(cluster("missing neg status in annotation of extension service"));
        let start = tokio::time::Instant::now();

        let err = INFERENCE_POOL_NO_MATCHING_PODS_ROUTE_STATUS
            .run(&suite)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("step 2"));
        assert!(err.to_string().contains("message mismatch"));
        // Bounded by the case-local policy, not the route default
        assert!(start.elapsed() <= Duration::from_secs(121));
        assert!(start.elapsed() >= Duration::from_secs(120));
    }
}
