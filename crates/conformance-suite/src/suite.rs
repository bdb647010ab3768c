//! Shared context handed to every test body
//!
//! The suite bundles the client, the poller, the timeout configuration and
//! the identity of the implementation under test. It also builds the
//! standard condition waits for each resource kind, so test bodies only
//! state names and expectations.

use std::collections::BTreeSet;
use std::sync::Arc;

use conformance_common::{
    ConditionExpectation, NamespacedName, OperationClass, ResourceKind, ResourceRef,
    TimeoutConfig, TimeoutPolicy,
};

use crate::client::ResourceClient;
use crate::poller::{ConditionWait, Poller};
use crate::scenario::Scenario;
use crate::selector::Selector;

/// Feature names test cases may require
pub mod features {
    /// The implementation supports InferencePool
    pub const SUPPORT_INFERENCE_POOL: &str = "SupportInferencePool";
    /// The implementation supports InferenceModel
    pub const SUPPORT_INFERENCE_MODEL: &str = "SupportInferenceModel";

    /// Every feature the built-in cases know about
    pub const ALL: &[&str] = &[SUPPORT_INFERENCE_POOL, SUPPORT_INFERENCE_MODEL];
}

/// Context shared by all test bodies of one run
#[derive(Clone)]
pub struct ConformanceSuite {
    client: Arc<dyn ResourceClient>,
    poller: Poller,
    timeouts: TimeoutConfig,
    controller_name: String,
    supported_features: BTreeSet<String>,
}

impl ConformanceSuite {
    /// Create a suite for the controller that writes route status as
    /// `controller_name`
    pub fn new(
        client: Arc<dyn ResourceClient>,
        timeouts: TimeoutConfig,
        controller_name: impl Into<String>,
    ) -> Self {
        let poller = Poller::new(client.clone(), timeouts.request_timeout);
        Self {
            client,
            poller,
            timeouts,
            controller_name: controller_name.into(),
            supported_features: BTreeSet::new(),
        }
    }

    /// Declare the features the implementation supports
    pub fn with_supported_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_features = features.into_iter().map(Into::into).collect();
        self
    }

    /// The client talking to the control plane
    pub fn client(&self) -> &dyn ResourceClient {
        self.client.as_ref()
    }

    /// The poller
    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Timeout configuration
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Controller name route parent statuses must carry
    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    /// Supported features
    pub fn supported_features(&self) -> &BTreeSet<String> {
        &self.supported_features
    }

    /// Whether every listed feature is supported
    pub fn supports_all(&self, features: &[&str]) -> bool {
        features.iter().all(|f| self.supported_features.contains(*f))
    }

    /// Start a scenario named `name`
    pub fn scenario(&self, name: impl Into<String>) -> Scenario<'_> {
        Scenario::new(name, self)
    }

    /// Wait description for an InferencePool condition on any parent
    pub fn pool_condition(
        &self,
        pool: &NamespacedName,
        expected: ConditionExpectation,
    ) -> ConditionWait {
        ConditionWait::new(
            ResourceKind::InferencePool.at(pool.clone()),
            Selector::pool_parents(),
            self.timeouts.policy(OperationClass::PoolCondition),
        )
        .expect(expected)
    }

    /// Wait description for an InferenceModel condition
    pub fn model_condition(
        &self,
        model: &NamespacedName,
        expected: ConditionExpectation,
    ) -> ConditionWait {
        ConditionWait::new(
            ResourceKind::InferenceModel.at(model.clone()),
            Selector::Conditions,
            self.timeouts.policy(OperationClass::ModelCondition),
        )
        .expect(expected)
    }

    /// Wait description for an HTTPRoute parent condition written by the
    /// controller under test
    pub fn route_condition(
        &self,
        route: &NamespacedName,
        gateway: &NamespacedName,
        expected: ConditionExpectation,
    ) -> ConditionWait {
        ConditionWait::new(
            ResourceKind::HttpRoute.at(route.clone()),
            Selector::route_parent(gateway.clone(), self.controller_name.clone()),
            self.timeouts.policy(OperationClass::RouteCondition),
        )
        .expect(expected)
    }

    /// Wait description for a Gateway condition
    pub fn gateway_condition(
        &self,
        gateway: &NamespacedName,
        expected: ConditionExpectation,
    ) -> ConditionWait {
        ConditionWait::new(
            ResourceKind::Gateway.at(gateway.clone()),
            Selector::Conditions,
            self.timeouts.policy(OperationClass::GatewayCondition),
        )
        .expect(expected)
    }

    /// Policy for reads of `target` outside a condition wait
    ///
    /// Kinds without a condition class of their own use the route policy.
    pub fn policy_for(&self, target: &ResourceRef) -> TimeoutPolicy {
        let class = match target.kind.as_str() {
            k if k == ResourceKind::InferencePool.kind_str() => OperationClass::PoolCondition,
            k if k == ResourceKind::InferenceModel.kind_str() => OperationClass::ModelCondition,
            k if k == ResourceKind::Gateway.kind_str() => OperationClass::GatewayCondition,
            _ => OperationClass::RouteCondition,
        };
        self.timeouts.policy(class)
    }
}
