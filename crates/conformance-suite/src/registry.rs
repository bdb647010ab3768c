//! Test case declarations and the registry that holds them
//!
//! Cases are registered explicitly through a [`RegistryBuilder`]; the built
//! [`Registry`] is immutable and cheap to clone. Entries keep registration
//! order and duplicates are not suppressed, so the runner sees exactly what
//! was declared.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use conformance_common::Result;

use crate::suite::ConformanceSuite;

/// Executable body of a test case
pub type TestBody = for<'a> fn(&'a ConformanceSuite) -> BoxFuture<'a, Result<()>>;

/// One self-contained conformance test
#[derive(Clone)]
pub struct TestCase {
    /// Unique, stable name used for filtering and reporting
    pub short_name: &'static str,
    /// What the test verifies
    pub description: &'static str,
    /// Manifest files applied before the body runs, relative to the
    /// manifest base directory
    pub manifests: &'static [&'static str],
    /// Features the implementation must support for the test to run
    pub features: &'static [&'static str],
    /// The test itself
    pub body: TestBody,
}

impl TestCase {
    /// Run the body against a suite
    pub fn run<'a>(&self, suite: &'a ConformanceSuite) -> BoxFuture<'a, Result<()>> {
        (self.body)(suite)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("short_name", &self.short_name)
            .field("manifests", &self.manifests)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

/// Accumulates test cases in registration order
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tests: Vec<TestCase>,
}

impl RegistryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a test case
    pub fn register(&mut self, test: TestCase) -> &mut Self {
        self.tests.push(test);
        self
    }

    /// Freeze the registry
    pub fn build(self) -> Registry {
        Registry {
            tests: self.tests.into(),
        }
    }
}

/// Immutable, ordered collection of test cases
#[derive(Clone, Debug)]
pub struct Registry {
    tests: Arc<[TestCase]>,
}

impl Registry {
    /// Every registered case, in registration order
    pub fn list_all(&self) -> &[TestCase] {
        &self.tests
    }

    /// First case with the given short name
    pub fn get(&self, short_name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.short_name == short_name)
    }

    /// Number of registered cases
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether nothing was registered
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
