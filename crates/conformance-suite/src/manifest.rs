//! Loading test manifests from disk
//!
//! Manifest paths are relative to a base directory. A leading `/` or `./`
//! is ignored so paths written either way resolve the same. Documents are
//! ordered so dependencies are applied first (namespaces before the
//! gateways, routes and pools that live in them).

use std::path::{Path, PathBuf};

use serde_json::Value;

use conformance_common::yaml::parse_documents;
use conformance_common::{Error, Result};

/// Apply priority of a kind; lower applies first
pub fn kind_priority(kind: &str) -> u8 {
    match kind {
        "Namespace" => 0,
        "CustomResourceDefinition" => 1,
        "ServiceAccount" => 2,
        "ClusterRole" | "Role" => 3,
        "ClusterRoleBinding" | "RoleBinding" => 4,
        "ConfigMap" | "Secret" => 5,
        "Service" => 6,
        "Deployment" | "DaemonSet" | "StatefulSet" => 7,
        "GatewayClass" => 8,
        "Gateway" => 9,
        "InferencePool" => 10,
        "InferenceModel" => 11,
        "HTTPRoute" | "GRPCRoute" => 12,
        _ => 13,
    }
}

/// Resolve a manifest path against the base directory
pub fn resolve(base: &Path, manifest: &str) -> PathBuf {
    let relative = manifest.trim_start_matches("./").trim_start_matches('/');
    base.join(relative)
}

/// Read and parse one manifest file
pub async fn load(base: &Path, manifest: &str) -> Result<Vec<Value>> {
    let path = resolve(base, manifest);
    let origin = path.display().to_string();
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| Error::manifest(&origin, e.to_string()))?;
    parse_documents(&content, &origin)
}

/// Read every listed manifest, returning documents in apply order
pub async fn load_all(base: &Path, manifests: &[&str]) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for manifest in manifests {
        documents.extend(load(base, manifest).await?);
    }
    sort_for_apply(&mut documents);
    Ok(documents)
}

/// Stable sort by [`kind_priority`]
pub fn sort_for_apply(documents: &mut [Value]) {
    documents.sort_by_key(|doc| kind_priority(doc.get("kind").and_then(Value::as_str).unwrap_or("")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_ignores_leading_separators() {
        let base = Path::new("/conformance");
        let expected = PathBuf::from("/conformance/tests/basic/a.yaml");
        assert_eq!(resolve(base, "tests/basic/a.yaml"), expected);
        assert_eq!(resolve(base, "/tests/basic/a.yaml"), expected);
        assert_eq!(resolve(base, "./tests/basic/a.yaml"), expected);
    }

    #[test]
    fn test_sort_applies_dependencies_first() {
        let mut docs = vec![
            json!({"kind": "HTTPRoute", "metadata": {"name": "r1"}}),
            json!({"kind": "InferencePool", "metadata": {"name": "p"}}),
            json!({"kind": "Namespace", "metadata": {"name": "ns"}}),
            json!({"kind": "HTTPRoute", "metadata": {"name": "r2"}}),
            json!({"kind": "Gateway", "metadata": {"name": "gw"}}),
        ];
        sort_for_apply(&mut docs);

        let names: Vec<_> = docs
            .iter()
            .map(|d| d["metadata"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ns", "gw", "p", "r1", "r2"]);
    }

    #[tokio::test]
    async fn test_load_all_reads_and_orders_documents() {
        let dir = std::env::temp_dir().join(format!("conformance-manifest-{}", std::process::id()));
        tokio::fs::create_dir_all(dir.join("tests")).await.unwrap();
        tokio::fs::write(
            dir.join("tests/pool.yaml"),
            "kind: HTTPRoute\nmetadata:\n  name: r\n---\nkind: InferencePool\nmetadata:\n  name: p\n",
        )
        .await
        .unwrap();

        let docs = load_all(&dir, &["/tests/pool.yaml"]).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["kind"], "InferencePool");

        let err = load_all(&dir, &["tests/missing.yaml"]).await.unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));
        assert!(err.to_string().contains("missing.yaml"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
