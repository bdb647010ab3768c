//! Error types for the conformance engine
//!
//! Errors are structured with fields so a failed test reports which resource
//! was involved, what was expected, and what was last observed. Variants map
//! onto the failure taxonomy of a conformance run:
//!
//! - transient read failures (`Kube`, `NotFound`, `Read`) are retried by the poller
//! - `Timeout` ends the current wait and the enclosing scenario
//! - `Mutation` ends the scenario immediately, never retried
//! - `Step` wraps any of the above with the scenario step that produced it

use std::time::Duration;

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for conformance operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The resource does not exist (yet, or anymore)
    #[error("{resource} not found")]
    NotFound {
        /// Resource description, e.g. "InferencePool app/pool-no-pods"
        resource: String,
    },

    /// A single read failed for a reason other than the API response
    #[error("read of {resource} failed: {message}")]
    Read {
        /// Resource being read
        resource: String,
        /// Description of what failed
        message: String,
    },

    /// A wait expired before the resource converged
    #[error(
        "timed out after {:.1}s ({attempts} reads) waiting for {resource} to have {waiting_for}; last observed: {last_observed}",
        elapsed.as_secs_f64()
    )]
    Timeout {
        /// Resource being polled
        resource: String,
        /// Human-readable expectation
        waiting_for: String,
        /// Number of reads performed
        attempts: u32,
        /// Wall-clock time spent waiting
        elapsed: Duration,
        /// Last observed state (conditions or the last read error)
        last_observed: String,
    },

    /// A create/apply/delete call failed
    #[error("{operation} of {resource} failed: {message}")]
    Mutation {
        /// Operation that failed (apply, delete)
        operation: String,
        /// Resource being mutated
        resource: String,
        /// Description of what failed
        message: String,
    },

    /// A one-shot check on observed state failed
    #[error("assertion failed for {resource}: {message}")]
    Assertion {
        /// Resource that was inspected
        resource: String,
        /// Description of the mismatch
        message: String,
    },

    /// A scenario step failed; wraps the underlying cause
    #[error("scenario {scenario} failed at step {index} ({step}): {source}")]
    Step {
        /// Scenario name
        scenario: String,
        /// 1-based step index
        index: usize,
        /// Step description
        step: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A manifest file could not be read or parsed
    #[error("manifest error [{path}]: {message}")]
    Manifest {
        /// Path of the manifest file
        path: String,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being (de)serialized (if known)
        kind: Option<String>,
    },

    /// Invalid configuration
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
        /// The offending setting (if known)
        field: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a not-found error for a resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a read error for a resource
    pub fn read(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Read {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a mutation error
    pub fn mutation(
        operation: impl Into<String>,
        resource: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Mutation {
            operation: operation.into(),
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create an assertion error
    pub fn assertion(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Assertion {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Wrap an error with the scenario step that produced it
    pub fn step(
        scenario: impl Into<String>,
        index: usize,
        step: impl Into<String>,
        source: Error,
    ) -> Self {
        Self::Step {
            scenario: scenario.into(),
            index,
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Create a manifest error
    pub fn manifest(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a configuration error for a specific setting
    pub fn config_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether the poller may treat this error as "not converged yet"
    ///
    /// Every read failure is transient while polling: a missing object may
    /// not have been created yet and transport errors may clear. Timeouts,
    /// mutations, assertions and configuration errors are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Kube { .. } | Error::NotFound { .. } | Error::Read { .. } => true,
            Error::Step { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Whether this error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            Error::Step { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether this error is a poller timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Step { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Get the resource this error is about, if known
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::NotFound { resource }
            | Error::Read { resource, .. }
            | Error::Timeout { resource, .. }
            | Error::Mutation { resource, .. }
            | Error::Assertion { resource, .. } => Some(resource),
            Error::Step { source, .. } => source.resource(),
            _ => None,
        }
    }

    /// Unwrap scenario step wrappers down to the original failure
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
