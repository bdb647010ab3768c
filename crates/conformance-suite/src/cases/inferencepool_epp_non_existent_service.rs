//! InferencePool whose extensionRef names a service that does not exist

use futures::future::BoxFuture;
use futures::FutureExt;

use conformance_common::condition::CONDITION_ACCEPTED;
use conformance_common::{
    ConditionExpectation, ConditionStatus, NamespacedName, Result, APP_BACKEND_NAMESPACE,
    INFRA_NAMESPACE, SHARED_GATEWAY_NAME,
};

use crate::registry::TestCase;
use crate::suite::ConformanceSuite;

const SHORT_NAME: &str = "InferencePoolEPPReferenceNonExistentServiceStatus";

const POOL_NAME: &str = "pool-non-existent-epp";
const ROUTE_NAME: &str = "httproute-for-pool-non-existent-epp";
const REASON_EPP_SERVICE_NOT_FOUND: &str = "EPPServiceNotFound";

/// The pool reports Accepted=False/EPPServiceNotFound
pub const INFERENCE_POOL_EPP_REFERENCE_NON_EXISTENT_SERVICE_STATUS: TestCase = TestCase {
    short_name: SHORT_NAME,
    description: "Validate InferencePool status reports an error when extensionRef points to a non-existent EPP service.",
    manifests: &["tests/basic/inference_epp_reference_non_existent_service_status.yaml"],
    features: &[],
    body: run,
};

fn run(suite: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
    async move {
        let pool = NamespacedName::new(POOL_NAME, APP_BACKEND_NAMESPACE);
        let route = NamespacedName::new(ROUTE_NAME, APP_BACKEND_NAMESPACE);
        let gateway = NamespacedName::new(SHARED_GATEWAY_NAME, INFRA_NAMESPACE);

        suite
            .scenario(SHORT_NAME)
            .await_condition(
                format!("HTTPRoute {route} accepted by Gateway {gateway}"),
                suite.route_condition(&route, &gateway, ConditionExpectation::accepted()),
            )
            .await_condition(
                format!("InferencePool {pool} reports its EPP service is missing"),
                suite.pool_condition(
                    &pool,
                    ConditionExpectation::new(CONDITION_ACCEPTED, ConditionStatus::False)
                        .with_reason(REASON_EPP_SERVICE_NOT_FOUND),
                ),
            )
            .run()
            .await
    }
    .boxed()
}
