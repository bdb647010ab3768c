//! Access to the control plane under test
//!
//! Everything the engine does to the cluster goes through [`ResourceClient`]:
//! point reads, deletes and server-side applies. The production
//! implementation talks to the API server through kube-rs dynamic objects;
//! tests substitute the generated `MockResourceClient`.

use async_trait::async_trait;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::Client;
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use conformance_common::kube_utils::{dynamic_api, manifest_reference};
use conformance_common::{Error, ResourceRef, ResourceSnapshot, Result, FIELD_MANAGER};

/// Trait abstracting reads and mutations of remote resources
///
/// Allows mocking the cluster in tests while using the real API server in
/// conformance runs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Read one object
    ///
    /// Returns [`Error::NotFound`] when the object does not exist.
    async fn get(&self, reference: &ResourceRef) -> Result<ResourceSnapshot>;

    /// Request deletion of one object
    ///
    /// Returns once the API server accepted the request; the object may
    /// still be visible afterwards while finalizers run.
    async fn delete(&self, reference: &ResourceRef) -> Result<()>;

    /// Server-side apply one manifest document, returning what it names
    async fn apply(&self, manifest: &Value) -> Result<ResourceRef>;
}

/// [`ResourceClient`] backed by a kube-rs client
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
}

impl KubeResourceClient {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn is_api_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(&self, reference: &ResourceRef) -> Result<ResourceSnapshot> {
        let api = dynamic_api(&self.client, reference);
        match api.get(reference.name()).await {
            Ok(obj) => Ok(ResourceSnapshot::from_dynamic(reference.clone(), obj)),
            Err(e) if is_api_not_found(&e) => Err(Error::not_found(reference.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, reference: &ResourceRef) -> Result<()> {
        let api = dynamic_api(&self.client, reference);
        match api
            .delete(reference.name(), &DeleteParams::background())
            .await
        {
            Ok(_) => {
                debug!(resource = %reference, "delete accepted");
                Ok(())
            }
            Err(e) if is_api_not_found(&e) => Err(Error::not_found(reference.to_string())),
            Err(e) => Err(Error::mutation(
                "delete",
                reference.to_string(),
                e.to_string(),
            )),
        }
    }

    async fn apply(&self, manifest: &Value) -> Result<ResourceRef> {
        let reference = manifest_reference(manifest)?;
        let api = dynamic_api(&self.client, &reference);
        let params = PatchParams::apply(FIELD_MANAGER).force();

        api.patch(reference.name(), &params, &Patch::Apply(manifest))
            .await
            .map_err(|e| Error::mutation("apply", reference.to_string(), e.to_string()))?;

        debug!(resource = %reference, "applied");
        Ok(reference)
    }
}
