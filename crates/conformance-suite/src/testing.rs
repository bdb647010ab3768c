//! In-memory control plane for exercising test case bodies
//!
//! Objects carry either a scripted status sequence (one entry per read, the
//! last one repeating) or a status derived from which objects currently
//! exist. Every mutation bumps a cluster-wide resourceVersion, which every
//! snapshot reports, so version fences behave as against an API server.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use conformance_common::kube_utils::manifest_reference;
use conformance_common::{Error, ResourceRef, ResourceSnapshot, Result};

use crate::client::ResourceClient;

type DeriveFn = Box<dyn Fn(&[ResourceRef]) -> Value + Send + Sync>;

enum Status {
    Script(Vec<Value>),
    Derived(DeriveFn),
}

struct FakeObject {
    uid: String,
    spec: Value,
    status: Status,
    reads: usize,
}

#[derive(Default)]
struct State {
    objects: HashMap<ResourceRef, FakeObject>,
    version: u64,
    next_uid: u64,
    deleted: Vec<ResourceRef>,
}

impl State {
    fn insert(&mut self, reference: ResourceRef, spec: Value, status: Status) {
        self.next_uid += 1;
        self.version += 1;
        let uid = format!("uid-{}", self.next_uid);
        self.objects.insert(
            reference,
            FakeObject {
                uid,
                spec,
                status,
                reads: 0,
            },
        );
    }
}

/// Fake [`ResourceClient`]
#[derive(Default)]
pub(crate) struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Object whose status never changes
    pub(crate) fn insert(&self, reference: ResourceRef, spec: Value, status: Value) {
        self.script(reference, spec, vec![status]);
    }

    /// Object whose n-th read returns `statuses[n]` (last one repeating)
    pub(crate) fn script(&self, reference: ResourceRef, spec: Value, statuses: Vec<Value>) {
        self.state
            .lock()
            .unwrap()
            .insert(reference, spec, Status::Script(statuses));
    }

    /// Object whose status is computed from the set of existing objects
    pub(crate) fn derive<F>(&self, reference: ResourceRef, spec: Value, f: F)
    where
        F: Fn(&[ResourceRef]) -> Value + Send + Sync + 'static,
    {
        self.state
            .lock()
            .unwrap()
            .insert(reference, spec, Status::Derived(Box::new(f)));
    }

    /// Objects deleted so far, in order
    pub(crate) fn deleted(&self) -> Vec<ResourceRef> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl ResourceClient for FakeCluster {
    async fn get(&self, reference: &ResourceRef) -> Result<ResourceSnapshot> {
        let mut state = self.state.lock().unwrap();
        let existing: Vec<ResourceRef> = state.objects.keys().cloned().collect();
        let version = state.version;
        let object = state
            .objects
            .get_mut(reference)
            .ok_or_else(|| Error::not_found(reference.to_string()))?;

        let status = match &object.status {
            Status::Script(statuses) => statuses
                .get(object.reads)
                .or_else(|| statuses.last())
                .cloned()
                .unwrap_or(Value::Null),
            Status::Derived(f) => f(&existing),
        };
        object.reads += 1;

        Ok(
            ResourceSnapshot::new(reference.clone(), object.spec.clone(), status)
                .with_uid(object.uid.clone())
                .with_resource_version(version.to_string()),
        )
    }

    async fn delete(&self, reference: &ResourceRef) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.objects.remove(reference).is_none() {
            return Err(Error::not_found(reference.to_string()));
        }
        state.version += 1;
        state.deleted.push(reference.clone());
        Ok(())
    }

    async fn apply(&self, manifest: &Value) -> Result<ResourceRef> {
        let reference = manifest_reference(manifest)?;
        let spec = manifest.get("spec").cloned().unwrap_or(Value::Null);
        self.state
            .lock()
            .unwrap()
            .insert(reference.clone(), spec, Status::Script(vec![Value::Null]));
        Ok(reference)
    }
}
