//! Common types for the inference gateway conformance engine: conditions,
//! resource references, timeouts, errors, and Kubernetes utilities

#![deny(missing_docs)]

pub mod condition;
pub mod config;
pub mod error;
pub mod kube_utils;
pub mod resource;
pub mod telemetry;
pub mod yaml;

pub use condition::{Condition, ConditionExpectation, ConditionStatus, MatchOutcome};
pub use config::{OperationClass, TimeoutConfig, TimeoutPolicy};
pub use error::Error;
pub use resource::{NamespacedName, ResourceKind, ResourceRef, ResourceSnapshot};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace holding the shared gateways used by every test
pub const INFRA_NAMESPACE: &str = "gateway-conformance-infra";

/// Namespace holding routes, pools, models and model servers
pub const APP_BACKEND_NAMESPACE: &str = "gateway-conformance-app-backend";

/// Name of the gateway created by the base manifests
pub const SHARED_GATEWAY_NAME: &str = "conformance-gateway";

/// Field manager used for server-side apply of test manifests
pub const FIELD_MANAGER: &str = "inference-conformance";
