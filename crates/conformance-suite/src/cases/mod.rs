//! Built-in conformance test cases
//!
//! Each case lives in its own module and is declared as a `TestCase`
//! constant. [`registry`] registers all of them in a fixed order.

mod inferencemodel_accepted;
mod inferencepool_epp_non_existent_service;
mod inferencepool_no_matching_pods_route_status;
mod inferencepool_resolvedrefs_condition;
mod inferencepool_status_no_matching_pods;

pub use inferencemodel_accepted::INFERENCE_MODEL_ACCEPTED;
pub use inferencepool_epp_non_existent_service::INFERENCE_POOL_EPP_REFERENCE_NON_EXISTENT_SERVICE_STATUS;
pub use inferencepool_no_matching_pods_route_status::INFERENCE_POOL_NO_MATCHING_PODS_ROUTE_STATUS;
pub use inferencepool_resolvedrefs_condition::INFERENCE_POOL_RESOLVED_REFS_CONDITION;
pub use inferencepool_status_no_matching_pods::INFERENCE_POOL_STATUS_NO_MATCHING_PODS;

use crate::registry::{Registry, RegistryBuilder};

/// Registry of every built-in case
pub fn registry() -> Registry {
    let mut builder = RegistryBuilder::new();
    builder
        .register(INFERENCE_POOL_RESOLVED_REFS_CONDITION)
        .register(INFERENCE_POOL_NO_MATCHING_PODS_ROUTE_STATUS)
        .register(INFERENCE_POOL_STATUS_NO_MATCHING_PODS)
        .register(INFERENCE_POOL_EPP_REFERENCE_NON_EXISTENT_SERVICE_STATUS)
        .register(INFERENCE_MODEL_ACCEPTED);
    builder.build()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Status documents shared by the case tests

    use serde_json::{json, Value};

    use conformance_common::{
        NamespacedName, ResourceKind, ResourceRef, APP_BACKEND_NAMESPACE, INFRA_NAMESPACE,
        SHARED_GATEWAY_NAME,
    };

    pub(crate) const CONTROLLER: &str = "example.com/gateway-controller";

    pub(crate) fn shared_gateway() -> NamespacedName {
        NamespacedName::new(SHARED_GATEWAY_NAME, INFRA_NAMESPACE)
    }

    pub(crate) fn app(kind: ResourceKind, name: &str) -> ResourceRef {
        kind.named(name, APP_BACKEND_NAMESPACE)
    }

    pub(crate) fn condition(type_: &str, status: &str, reason: &str, message: &str) -> Value {
        json!({"type": type_, "status": status, "reason": reason, "message": message})
    }

    pub(crate) fn conditions_status(conditions: Vec<Value>) -> Value {
        json!({ "conditions": conditions })
    }

    pub(crate) fn route_status(gateway: &NamespacedName, conditions: Vec<Value>) -> Value {
        json!({"parents": [{
            "parentRef": {"name": gateway.name, "namespace": gateway.namespace},
            "controllerName": CONTROLLER,
            "conditions": conditions
        }]})
    }

    pub(crate) fn pool_status(gateway: &NamespacedName, conditions: Vec<Value>) -> Value {
        json!({"parent": [{
            "parentRef": {
                "group": "gateway.networking.k8s.io",
                "kind": "Gateway",
                "name": gateway.name,
                "namespace": gateway.namespace
            },
            "conditions": conditions
        }]})
    }

    pub(crate) fn accepted() -> Value {
        condition("Accepted", "True", "Accepted", "")
    }
}
