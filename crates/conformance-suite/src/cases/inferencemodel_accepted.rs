//! Create and read an InferenceModel, then wait for it to be accepted

use futures::future::BoxFuture;
use futures::FutureExt;

use conformance_common::resource::INFERENCE_GROUP;
use conformance_common::{
    ConditionExpectation, Error, NamespacedName, ResourceKind, ResourceSnapshot, Result,
    APP_BACKEND_NAMESPACE,
};

use crate::registry::TestCase;
use crate::suite::{features, ConformanceSuite};

const SHORT_NAME: &str = "InferenceModelAccepted";

const MODEL_NAME: &str = "my-chat-model";
const MODEL_SPEC_NAME: &str = "chat-model-v1";
const POOL_NAME: &str = "test-pool-for-model";

/// The applied model reads back with the declared spec and is Accepted
pub const INFERENCE_MODEL_ACCEPTED: TestCase = TestCase {
    short_name: SHORT_NAME,
    description: "Basic Create and Read operations for InferenceModel.",
    manifests: &["tests/basic/inferencesmodel_accepted.yaml"],
    features: &[
        features::SUPPORT_INFERENCE_MODEL,
        features::SUPPORT_INFERENCE_POOL,
    ],
    body: run,
};

/// Compare the fields the manifest declares against what was read back
fn check_spec(snapshot: &ResourceSnapshot) -> Result<()> {
    let expected = [
        ("/modelName", MODEL_SPEC_NAME),
        ("/poolRef/group", INFERENCE_GROUP),
        ("/poolRef/kind", ResourceKind::InferencePool.kind_str()),
        ("/poolRef/name", POOL_NAME),
    ];

    let mismatches: Vec<String> = expected
        .iter()
        .filter_map(|(pointer, want)| match snapshot.spec_str(pointer) {
            Some(got) if got == *want => None,
            got => Some(format!(
                "spec{} = {:?}, expected {want:?}",
                pointer.replace('/', "."),
                got.unwrap_or("<unset>")
            )),
        })
        .collect();

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(Error::assertion(
            snapshot.reference.to_string(),
            mismatches.join("; "),
        ))
    }
}

fn run(suite: &ConformanceSuite) -> BoxFuture<'_, Result<()>> {
    async move {
        let model = NamespacedName::new(MODEL_NAME, APP_BACKEND_NAMESPACE);

        suite
            .scenario(SHORT_NAME)
            .inspect(
                format!("InferenceModel {model} reads back with its spec"),
                ResourceKind::InferenceModel.at(model.clone()),
                check_spec,
            )
            .await_condition(
                format!("InferenceModel {model} accepted"),
                suite.model_condition(&model, ConditionExpectation::accepted()),
            )
            .run()
            .await
    }
    .boxed()
}
