//! Shared Kubernetes utilities using kube-rs
//!
//! Client construction, `ApiResource` building for dynamic access, and
//! manifest metadata extraction. The engine reads and writes every kind
//! through `DynamicObject`, so no generated CRD types are required.

use std::path::Path;
use std::time::Duration;

use kube::api::{Api, DynamicObject};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use serde_json::Value;
use tracing::debug;

use crate::resource::{NamespacedName, ResourceRef};
use crate::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Plural resource names for kinds the suite touches
const KIND_PLURALS: &[(&str, &str)] = &[
    ("inferencepool", "inferencepools"),
    ("inferencemodel", "inferencemodels"),
    ("httproute", "httproutes"),
    ("grpcroute", "grpcroutes"),
    ("gateway", "gateways"),
    ("gatewayclass", "gatewayclasses"),
    ("referencegrant", "referencegrants"),
    ("endpoints", "endpoints"),
];

/// Pluralize a Kubernetes resource kind
///
/// Uses a lookup table for known types, falling back to simple
/// pluralization rules for unknown types.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if let Some((_, plural)) = KIND_PLURALS.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Parse apiVersion into (group, version)
///
/// # Examples
/// ```
/// use conformance_common::kube_utils::parse_api_version;
///
/// let (group, version) = parse_api_version("gateway.networking.k8s.io/v1");
/// assert_eq!(group, "gateway.networking.k8s.io");
/// assert_eq!(version, "v1");
///
/// let (group, version) = parse_api_version("v1");
/// assert_eq!(group, "");
/// assert_eq!(version, "v1");
/// ```
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Build an ApiResource from an apiVersion and kind
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Dynamic API handle for a reference; an empty namespace means cluster-scoped
pub fn dynamic_api(client: &Client, reference: &ResourceRef) -> Api<DynamicObject> {
    let ar = build_api_resource(&reference.api_version, &reference.kind);
    if reference.namespace().is_empty() {
        Api::all_with(client.clone(), &ar)
    } else {
        Api::namespaced_with(client.clone(), reference.namespace(), &ar)
    }
}

/// Extract the reference a manifest document describes
pub fn manifest_reference(manifest: &Value) -> Result<ResourceRef, Error> {
    let api_version = manifest
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::serialization("manifest missing apiVersion"))?;
    let kind = manifest
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::serialization("manifest missing kind"))?;
    let name = manifest
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::serialization_for_kind(kind, "manifest missing metadata.name"))?;
    let namespace = manifest
        .pointer("/metadata/namespace")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(ResourceRef::new(
        api_version,
        kind,
        NamespacedName::new(name, namespace),
    ))
}

/// Create a kube client from optional kubeconfig path with custom timeouts
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig {}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    debug!(
        cluster_url = %config.cluster_url,
        namespace = %config.default_namespace,
        "kube client configured"
    );
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}
