//! InferencePool status when its selector matches no running pods

use futures::future::BoxFuture;
use futures::FutureExt;

use conformance_common::condition::CONDITION_ACCEPTED;
use conformance_common::{
    ConditionExpectation, ConditionStatus, NamespacedName, Result, APP_BACKEND_NAMESPACE,
    INFRA_NAMESPACE, SHARED_GATEWAY_NAME,
};

use crate::registry::TestCase;
use crate::suite::ConformanceSuite;

const SHORT_NAME: &str = "InferencePoolStatusNoMatchingPods";

const POOL_NAME: &str = "pool-no-pods";
const ROUTE_NAME: &str = "httproute-for-pool-no-pods";
const REASON_NO_MATCHING_PODS: &str = "NoMatchingPods";

/// The pool is first accepted, then reports Accepted=False/NoMatchingPods
pub const INFERENCE_POOL_STATUS_NO_MATCHING_PODS: TestCase = TestCase {
    short_name: SHORT_NAME,
    description: "Validate InferencePool status when modelServerSelector does not match any running pods.",
    manifests: &["tests/basic/inferencepool_status_no_matching_pods.yaml"],
    features: &[],
    body: run,
};

fn run(suite: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
    async move {
        let pool = NamespacedName::new(POOL_NAME, APP_BACKEND_NAMESPACE);
        let route = NamespacedName::new(ROUTE_NAME, APP_BACKEND_NAMESPACE);
        let gateway = NamespacedName::new(SHARED_GATEWAY_NAME, INFRA_NAMESPACE);

        let no_matching_pods = ConditionExpectation::new(CONDITION_ACCEPTED, ConditionStatus::False)
            .with_reason(REASON_NO_MATCHING_PODS);

        suite
            .scenario(SHORT_NAME)
            .await_condition(
                format!("Gateway {gateway} accepted"),
                suite.gateway_condition(
                    &gateway,
                    ConditionExpectation::new(CONDITION_ACCEPTED, ConditionStatus::True),
                ),
            )
            .await_condition(
                format!("HTTPRoute {route} accepted by Gateway {gateway}"),
                suite.route_condition(&route, &gateway, ConditionExpectation::accepted()),
            )
            .await_condition(
                format!("InferencePool {pool} accepted"),
                suite.pool_condition(&pool, ConditionExpectation::accepted()),
            )
            .await_condition(
                format!("InferencePool {pool} reports no matching pods"),
                suite.pool_condition(&pool, no_matching_pods),
            )
            .run()
            .await
    }
    .boxed()
}
