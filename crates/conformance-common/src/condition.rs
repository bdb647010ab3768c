//! Status conditions and the condition matcher
//!
//! Conditions follow Kubernetes API conventions. Producers do not deduplicate
//! them, so a status may carry several entries of the same type; the last
//! entry by list position is the freshest and the only one considered.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The "Accepted" condition type (routes, pools, models, gateways)
pub const CONDITION_ACCEPTED: &str = "Accepted";
/// The "ResolvedRefs" condition type
pub const CONDITION_RESOLVED_REFS: &str = "ResolvedRefs";
/// The "Programmed" condition type (gateways)
pub const CONDITION_PROGRAMMED: &str = "Programmed";
/// The "Reconciled" condition type some implementations report on route parents
pub const CONDITION_RECONCILED: &str = "Reconciled";

/// The "Accepted" reason
pub const REASON_ACCEPTED: &str = "Accepted";

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One typed fact about a resource's reconciliation state
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Accepted, ResolvedRefs)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default)]
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Generation of the resource the producer observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Some(Utc::now()),
            observed_generation: None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.type_, self.status)?;
        if !self.reason.is_empty() {
            write!(f, " reason={}", self.reason)?;
        }
        if !self.message.is_empty() {
            write!(f, " message={:?}", self.message)?;
        }
        Ok(())
    }
}

/// The condition a test expects a resource to converge to
///
/// Type and status are mandatory. An empty reason matches any reason. Message
/// checks are plain substring containment: every fragment in
/// `message_contains` must appear, and at least one of `message_contains_any`
/// must appear when that list is non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionExpectation {
    /// Expected condition type
    pub type_: String,
    /// Expected status
    pub status: ConditionStatus,
    /// Expected reason; empty matches any
    pub reason: String,
    /// Fragments that must all appear in the message
    pub message_contains: Vec<String>,
    /// Fragments of which at least one must appear in the message
    pub message_contains_any: Vec<String>,
}

impl ConditionExpectation {
    /// Expect a condition type with the given status and any reason
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: String::new(),
            message_contains: Vec::new(),
            message_contains_any: Vec::new(),
        }
    }

    /// Require an exact reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Require a message fragment
    pub fn with_message(mut self, fragment: impl Into<String>) -> Self {
        self.message_contains.push(fragment.into());
        self
    }

    /// Require at least one of the given message fragments
    pub fn with_any_message<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_contains_any
            .extend(fragments.into_iter().map(Into::into));
        self
    }

    /// Shorthand for `Accepted=True reason=Accepted`
    pub fn accepted() -> Self {
        Self::new(CONDITION_ACCEPTED, ConditionStatus::True).with_reason(REASON_ACCEPTED)
    }
}

impl fmt::Display for ConditionExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.type_, self.status)?;
        if !self.reason.is_empty() {
            write!(f, " reason={}", self.reason)?;
        }
        for fragment in &self.message_contains {
            write!(f, " message~{:?}", fragment)?;
        }
        if !self.message_contains_any.is_empty() {
            write!(f, " message~any{:?}", self.message_contains_any)?;
        }
        Ok(())
    }
}

/// Result of comparing observed conditions against one expectation
#[derive(Clone, Debug, PartialEq)]
pub enum MatchOutcome<'a> {
    /// The latest condition of the expected type satisfies the expectation
    Matched(&'a Condition),
    /// No condition of the expected type was observed
    Missing,
    /// The latest condition has a different status
    StatusMismatch(&'a Condition),
    /// The status matches but the reason differs
    ReasonMismatch(&'a Condition),
    /// Status and reason match but a message fragment is absent
    MessageMismatch(&'a Condition),
}

impl MatchOutcome<'_> {
    /// Whether the expectation is satisfied
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }
}

impl fmt::Display for MatchOutcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched(c) => write!(f, "matched [{c}]"),
            Self::Missing => write!(f, "condition not present"),
            Self::StatusMismatch(c) => write!(f, "status mismatch [{c}]"),
            Self::ReasonMismatch(c) => write!(f, "reason mismatch [{c}]"),
            Self::MessageMismatch(c) => write!(f, "message mismatch [{c}]"),
        }
    }
}

/// Find the freshest condition of the given type (last by list position)
pub fn find_latest<'a>(observed: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    observed.iter().rev().find(|c| c.type_ == type_)
}

/// Compare observed conditions against one expectation
pub fn evaluate<'a>(observed: &'a [Condition], expected: &ConditionExpectation) -> MatchOutcome<'a> {
    let Some(latest) = find_latest(observed, &expected.type_) else {
        return MatchOutcome::Missing;
    };

    if latest.status != expected.status {
        return MatchOutcome::StatusMismatch(latest);
    }
    if !expected.reason.is_empty() && latest.reason != expected.reason {
        return MatchOutcome::ReasonMismatch(latest);
    }

    let all_present = expected
        .message_contains
        .iter()
        .all(|fragment| latest.message.contains(fragment.as_str()));
    let any_present = expected.message_contains_any.is_empty()
        || expected
            .message_contains_any
            .iter()
            .any(|fragment| latest.message.contains(fragment.as_str()));

    if all_present && any_present {
        MatchOutcome::Matched(latest)
    } else {
        MatchOutcome::MessageMismatch(latest)
    }
}

/// Whether the observed conditions satisfy the expectation
pub fn matches(observed: &[Condition], expected: &ConditionExpectation) -> bool {
    evaluate(observed, expected).is_match()
}

/// Whether the observed conditions satisfy every expectation
pub fn matches_all(observed: &[Condition], expected: &[ConditionExpectation]) -> bool {
    expected.iter().all(|e| matches(observed, e))
}

/// Render a condition list compactly for logs and timeout reports
pub fn describe(conditions: &[Condition]) -> String {
    let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
