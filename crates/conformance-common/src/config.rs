//! Timeout configuration for conformance waits
//!
//! Every wait belongs to an operation class with its own timeout and poll
//! interval. The defaults mirror the upstream Gateway API conformance suite,
//! extended with InferencePool/InferenceModel classes. Configuration is built
//! once at start-up and only read afterwards.

use std::time::Duration;

use crate::{Error, Result};

/// Timeout and poll interval for one wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Maximum time to wait for convergence
    pub timeout: Duration,
    /// Fixed spacing between reads
    pub poll_interval: Duration,
}

impl TimeoutPolicy {
    /// Create a policy
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Reject policies the poller cannot honour
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::config_for_field(
                name,
                "poll interval must be greater than zero",
            ));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(Error::config_for_field(
                name,
                format!(
                    "timeout ({:?}) exceeds the maximum of {:?}",
                    self.timeout, MAX_TIMEOUT
                ),
            ));
        }
        if self.timeout < self.poll_interval {
            return Err(Error::config_for_field(
                name,
                format!(
                    "timeout ({:?}) must not be shorter than the poll interval ({:?})",
                    self.timeout, self.poll_interval
                ),
            ));
        }
        Ok(())
    }
}

/// Longest wait any policy may ask for
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Classes of waits with independently configurable policies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// InferencePool reaches a condition
    PoolCondition,
    /// InferenceModel reaches a condition
    ModelCondition,
    /// HTTPRoute parent status reaches a condition
    RouteCondition,
    /// Gateway reaches a condition
    GatewayCondition,
    /// A deleted object disappears from the API
    Deletion,
}

impl OperationClass {
    /// All classes, for iteration
    pub const ALL: [OperationClass; 5] = [
        OperationClass::PoolCondition,
        OperationClass::ModelCondition,
        OperationClass::RouteCondition,
        OperationClass::GatewayCondition,
        OperationClass::Deletion,
    ];

    /// Stable name used in logs and configuration errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoolCondition => "pool-condition",
            Self::ModelCondition => "model-condition",
            Self::RouteCondition => "route-condition",
            Self::GatewayCondition => "gateway-condition",
            Self::Deletion => "deletion",
        }
    }
}

impl std::fmt::Display for OperationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default InferencePool wait: 300s, polled every 10s
pub const DEFAULT_POOL_CONDITION: TimeoutPolicy =
    TimeoutPolicy::new(Duration::from_secs(300), Duration::from_secs(10));
/// Default InferenceModel wait: same as pools
pub const DEFAULT_MODEL_CONDITION: TimeoutPolicy = DEFAULT_POOL_CONDITION;
/// Default HTTPRoute wait: 60s, polled every second
pub const DEFAULT_ROUTE_CONDITION: TimeoutPolicy =
    TimeoutPolicy::new(Duration::from_secs(60), Duration::from_secs(1));
/// Default Gateway wait: 180s, polled every second
pub const DEFAULT_GATEWAY_CONDITION: TimeoutPolicy =
    TimeoutPolicy::new(Duration::from_secs(180), Duration::from_secs(1));
/// Default deletion wait: 10s, polled every second
pub const DEFAULT_DELETION: TimeoutPolicy =
    TimeoutPolicy::new(Duration::from_secs(10), Duration::from_secs(1));
/// Default upper bound for a single read
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-wide timeout configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// InferencePool condition waits
    pub pool_condition: TimeoutPolicy,
    /// InferenceModel condition waits
    pub model_condition: TimeoutPolicy,
    /// HTTPRoute condition waits
    pub route_condition: TimeoutPolicy,
    /// Gateway condition waits
    pub gateway_condition: TimeoutPolicy,
    /// Waits for deleted objects to disappear
    pub deletion: TimeoutPolicy,
    /// Upper bound for one read; the poller also caps it at the poll interval
    pub request_timeout: Duration,
    /// Extra pause after a mutation's fence has passed
    pub settle_delay: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            pool_condition: DEFAULT_POOL_CONDITION,
            model_condition: DEFAULT_MODEL_CONDITION,
            route_condition: DEFAULT_ROUTE_CONDITION,
            gateway_condition: DEFAULT_GATEWAY_CONDITION,
            deletion: DEFAULT_DELETION,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            settle_delay: Duration::ZERO,
        }
    }
}

impl TimeoutConfig {
    /// Policy for an operation class
    pub fn policy(&self, class: OperationClass) -> TimeoutPolicy {
        match class {
            OperationClass::PoolCondition => self.pool_condition,
            OperationClass::ModelCondition => self.model_condition,
            OperationClass::RouteCondition => self.route_condition,
            OperationClass::GatewayCondition => self.gateway_condition,
            OperationClass::Deletion => self.deletion,
        }
    }

    /// Replace the policy of an operation class
    pub fn with_policy(mut self, class: OperationClass, policy: TimeoutPolicy) -> Self {
        let slot = match class {
            OperationClass::PoolCondition => &mut self.pool_condition,
            OperationClass::ModelCondition => &mut self.model_condition,
            OperationClass::RouteCondition => &mut self.route_condition,
            OperationClass::GatewayCondition => &mut self.gateway_condition,
            OperationClass::Deletion => &mut self.deletion,
        };
        *slot = policy;
        self
    }

    /// Check every policy and the request timeout
    pub fn validate(&self) -> Result<()> {
        for class in OperationClass::ALL {
            self.policy(class).validate(class.as_str())?;
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config_for_field(
                "request-timeout",
                "request timeout must be greater than zero",
            ));
        }
        if self.settle_delay > MAX_TIMEOUT {
            return Err(Error::config_for_field(
                "settle-delay",
                format!("settle delay exceeds the maximum of {MAX_TIMEOUT:?}"),
            ));
        }
        Ok(())
    }
}
