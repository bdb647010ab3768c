//! Resource references and status snapshots
//!
//! The engine never holds typed copies of the remote objects. A read yields a
//! [`ResourceSnapshot`]: identity and version metadata plus the raw `spec` and
//! `status` documents, from which selectors extract the conditions they need.
//! Different kinds nest conditions at different depths:
//!
//! - Gateway, InferenceModel: `.status.conditions`
//! - HTTPRoute: `.status.parents[i].conditions`, keyed by parentRef + controllerName
//! - InferencePool (v1alpha2): `.status.parent[i].conditions`, keyed by parentRef

use std::fmt;
use std::str::FromStr;

use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::Condition;
use crate::{Error, Result};

/// Name and namespace identifying one resource instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    /// Resource name
    pub name: String,
    /// Resource namespace
    pub namespace: String,
}

impl NamespacedName {
    /// Create a new name/namespace pair
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            // cluster-scoped
            return f.write_str(&self.name);
        }
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for NamespacedName {
    type Err = Error;

    /// Parse `namespace/name`
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(name, ns))
            }
            _ => Err(Error::config(format!(
                "expected namespace/name, got '{s}'"
            ))),
        }
    }
}

/// Resource kinds the conformance tests read
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// InferencePool (inference.networking.x-k8s.io)
    InferencePool,
    /// InferenceModel (inference.networking.x-k8s.io)
    InferenceModel,
    /// HTTPRoute (gateway.networking.k8s.io)
    HttpRoute,
    /// Gateway (gateway.networking.k8s.io)
    Gateway,
}

/// API group of the inference extension resources
pub const INFERENCE_GROUP: &str = "inference.networking.x-k8s.io";
/// API group of the Gateway API resources
pub const GATEWAY_GROUP: &str = "gateway.networking.k8s.io";

impl ResourceKind {
    /// Full API version (group/version)
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::InferencePool | Self::InferenceModel => "inference.networking.x-k8s.io/v1alpha2",
            Self::HttpRoute | Self::Gateway => "gateway.networking.k8s.io/v1",
        }
    }

    /// Kubernetes Kind string
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::InferencePool => "InferencePool",
            Self::InferenceModel => "InferenceModel",
            Self::HttpRoute => "HTTPRoute",
            Self::Gateway => "Gateway",
        }
    }

    /// Reference an instance of this kind
    pub fn at(&self, key: NamespacedName) -> ResourceRef {
        ResourceRef {
            api_version: self.api_version().to_string(),
            kind: self.kind_str().to_string(),
            key,
        }
    }

    /// Reference an instance of this kind by name and namespace
    pub fn named(&self, name: impl Into<String>, namespace: impl Into<String>) -> ResourceRef {
        self.at(NamespacedName::new(name, namespace))
    }
}

/// A typed reference to one remote object
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// API version (e.g., "gateway.networking.k8s.io/v1")
    pub api_version: String,
    /// Kind (e.g., "HTTPRoute")
    pub kind: String,
    /// Name and namespace
    pub key: NamespacedName,
}

impl ResourceRef {
    /// Create a reference from raw type information
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, key: NamespacedName) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            key,
        }
    }

    /// Resource name
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Resource namespace
    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

/// Reference to a parent object as written in status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    /// API group of the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Kind of the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Parent name
    pub name: String,
    /// Parent namespace; absent means the namespace of the reporting object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Listener section of the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
}

impl ParentReference {
    /// Whether this reference points at `parent`, resolving an absent
    /// namespace to `local_namespace`
    pub fn refers_to(&self, parent: &NamespacedName, local_namespace: &str) -> bool {
        let namespace = self.namespace.as_deref().unwrap_or(local_namespace);
        self.name == parent.name && namespace == parent.namespace
    }
}

/// Per-parent status block reported by a route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParentStatus {
    /// The parent this block reports on
    pub parent_ref: ParentReference,
    /// Controller that wrote this block
    #[serde(default)]
    pub controller_name: String,
    /// Conditions for this parent relationship
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Per-parent status block reported by an InferencePool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolParentStatus {
    /// The gateway this block reports on
    pub parent_ref: ParentReference,
    /// Conditions for this parent relationship
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// One read of a remote object, consistent at a single logical time
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceSnapshot {
    /// What was read
    pub reference: ResourceRef,
    /// Object uid
    pub uid: Option<String>,
    /// Opaque resourceVersion of this snapshot
    pub resource_version: Option<String>,
    /// metadata.generation
    pub generation: Option<i64>,
    /// Raw `.spec`, `Value::Null` when absent
    pub spec: Value,
    /// Raw `.status`, `Value::Null` when absent
    pub status: Value,
}

impl ResourceSnapshot {
    /// Build a snapshot from raw parts
    pub fn new(reference: ResourceRef, spec: Value, status: Value) -> Self {
        Self {
            reference,
            uid: None,
            resource_version: None,
            generation: None,
            spec,
            status,
        }
    }

    /// Set the uid
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Set the resourceVersion
    pub fn with_resource_version(mut self, version: impl Into<String>) -> Self {
        self.resource_version = Some(version.into());
        self
    }

    /// Build a snapshot from a kube dynamic object
    pub fn from_dynamic(reference: ResourceRef, obj: DynamicObject) -> Self {
        let spec = obj.data.get("spec").cloned().unwrap_or(Value::Null);
        let status = obj.data.get("status").cloned().unwrap_or(Value::Null);
        Self {
            reference,
            uid: obj.metadata.uid,
            resource_version: obj.metadata.resource_version,
            generation: obj.metadata.generation,
            spec,
            status,
        }
    }

    /// Deserialize the value at a JSON pointer under `.status`
    ///
    /// Returns `Ok(None)` when the path is absent.
    fn status_field<T: DeserializeOwned>(&self, pointer: &str) -> Result<Option<T>> {
        match self.status.pointer(pointer) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
                Error::serialization_for_kind(
                    self.reference.kind.clone(),
                    format!("invalid status{}: {}", pointer.replace('/', "."), e),
                )
            }),
        }
    }

    /// Top-level `.status.conditions`
    pub fn conditions(&self) -> Result<Vec<Condition>> {
        Ok(self.status_field("/conditions")?.unwrap_or_default())
    }

    /// Route parent statuses under `.status.parents`
    pub fn route_parents(&self) -> Result<Vec<RouteParentStatus>> {
        Ok(self.status_field("/parents")?.unwrap_or_default())
    }

    /// InferencePool parent statuses
    ///
    /// v1alpha2 stores them under `.status.parent`; later API versions use
    /// `.status.parents`. Both are accepted.
    pub fn pool_parents(&self) -> Result<Vec<PoolParentStatus>> {
        if let Some(parents) = self.status_field("/parent")? {
            return Ok(parents);
        }
        Ok(self.status_field("/parents")?.unwrap_or_default())
    }

    /// Conditions a route reports for one parent, written by one controller
    ///
    /// Several controllers may report on the same parent name, so both the
    /// parent reference and the controller name must match. Returns `None`
    /// when no such block exists yet.
    pub fn route_parent_conditions(
        &self,
        parent: &NamespacedName,
        controller_name: &str,
    ) -> Result<Option<Vec<Condition>>> {
        let local_namespace = self.reference.namespace();
        Ok(self
            .route_parents()?
            .into_iter()
            .find(|p| {
                p.controller_name == controller_name
                    && p.parent_ref.refers_to(parent, local_namespace)
            })
            .map(|p| p.conditions))
    }

    /// String value at a JSON pointer under `.spec`
    pub fn spec_str(&self, pointer: &str) -> Option<&str> {
        self.spec.pointer(pointer).and_then(Value::as_str)
    }

    /// Whether this snapshot is strictly newer than a fenced resourceVersion
    ///
    /// resourceVersions are opaque; when both parse as integers (as on every
    /// etcd-backed API server) they are compared numerically, otherwise any
    /// different version counts as newer. A snapshot without a version never
    /// passes a fence.
    pub fn is_newer_than(&self, fence: &str) -> bool {
        let Some(current) = self.resource_version.as_deref() else {
            return false;
        };
        match (current.parse::<u64>(), fence.parse::<u64>()) {
            (Ok(current), Ok(fence)) => current > fence,
            _ => current != fence,
        }
    }
}
