//! InferencePool ResolvedRefs tracks the routes that reference the pool

use futures::future::BoxFuture;
use futures::FutureExt;

use conformance_common::condition::CONDITION_RESOLVED_REFS;
use conformance_common::{
    ConditionExpectation, ConditionStatus, NamespacedName, ResourceKind, Result,
    APP_BACKEND_NAMESPACE, INFRA_NAMESPACE, SHARED_GATEWAY_NAME,
};

use crate::registry::TestCase;
use crate::suite::ConformanceSuite;

const SHORT_NAME: &str = "InferencePoolResolvedRefsCondition";

const POOL_NAME: &str = "multi-gateway-pool";
const GATEWAY_2_NAME: &str = "gateway-2";
const ROUTE_1_NAME: &str = "httproute-for-gw1";
const ROUTE_2_NAME: &str = "httproute-for-gw2";

const REASON_REFS_RESOLVED: &str = "RefsResolved";
const REASON_NO_REFS_FOUND: &str = "NoRefsFound";

/// ResolvedRefs stays True while any referencing HTTPRoute remains and turns
/// False/NoRefsFound once the last one is deleted
pub const INFERENCE_POOL_RESOLVED_REFS_CONDITION: TestCase = TestCase {
    short_name: SHORT_NAME,
    description: "Verify that an InferencePool correctly surfaces the 'ResolvedRefs' condition type, indicating whether it is successfully referenced by other Gateway API resources.",
    manifests: &["tests/basic/inferencepool_resolvedrefs_condition.yaml"],
    features: &[],
    body: run,
};

fn run(suite: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
    async move {
        let pool = NamespacedName::new(POOL_NAME, APP_BACKEND_NAMESPACE);
        let route_1 = NamespacedName::new(ROUTE_1_NAME, APP_BACKEND_NAMESPACE);
        let route_2 = NamespacedName::new(ROUTE_2_NAME, APP_BACKEND_NAMESPACE);
        let gateway_1 = NamespacedName::new(SHARED_GATEWAY_NAME, INFRA_NAMESPACE);
        let gateway_2 = NamespacedName::new(GATEWAY_2_NAME, APP_BACKEND_NAMESPACE);

        let refs_resolved = ConditionExpectation::new(CONDITION_RESOLVED_REFS, ConditionStatus::True)
            .with_reason(REASON_REFS_RESOLVED);
        let no_refs = ConditionExpectation::new(CONDITION_RESOLVED_REFS, ConditionStatus::False)
            .with_reason(REASON_NO_REFS_FOUND);

        suite
            .scenario(SHORT_NAME)
            .await_condition(
                format!("HTTPRoute {route_1} accepted by Gateway {gateway_1}"),
                suite.route_condition(&route_1, &gateway_1, ConditionExpectation::accepted()),
            )
            .await_condition(
                format!("HTTPRoute {route_2} accepted by Gateway {gateway_2}"),
                suite.route_condition(&route_2, &gateway_2, ConditionExpectation::accepted()),
            )
            .await_condition(
                format!("InferencePool {pool} has ResolvedRefs=True with two routes"),
                suite.pool_condition(&pool, refs_resolved.clone()),
            )
            .delete(
                format!("delete HTTPRoute {route_1}"),
                ResourceKind::HttpRoute.at(route_1.clone()),
            )
            .await_condition(
                format!("InferencePool {pool} still has ResolvedRefs=True with one route"),
                suite.pool_condition(&pool, refs_resolved),
            )
            .delete(
                format!("delete HTTPRoute {route_2}"),
                ResourceKind::HttpRoute.at(route_2.clone()),
            )
            .await_fresh(
                format!("InferencePool {pool} has ResolvedRefs=False after all routes are gone"),
                suite.pool_condition(&pool, no_refs),
            )
            .run()
            .await
    }
    .boxed()
}
