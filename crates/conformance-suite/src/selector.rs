//! Condition selectors
//!
//! A selector picks the condition lists a wait is evaluated against. Most
//! kinds carry one list at `.status.conditions`; routes and pools carry one
//! list per parent. A selector therefore yields *groups*, and an expectation
//! set holds when any single group satisfies all of it.

use std::fmt;
use std::sync::Arc;

use conformance_common::{Condition, NamespacedName, ResourceSnapshot, Result};

/// Caller-supplied extraction of condition groups
pub type SelectFn = dyn Fn(&ResourceSnapshot) -> Result<Vec<Vec<Condition>>> + Send + Sync;

/// Where in a snapshot to look for conditions
#[derive(Clone)]
pub enum Selector {
    /// `.status.conditions` (Gateway, InferenceModel)
    Conditions,
    /// `.status.parents[]` block of a route for one parent, written by one
    /// controller
    RouteParent {
        /// Parent gateway
        parent: NamespacedName,
        /// Controller that must have written the block
        controller_name: String,
    },
    /// InferencePool parent statuses, optionally limited to one gateway
    PoolParents {
        /// Only consider the block for this gateway
        gateway: Option<NamespacedName>,
    },
    /// Caller-supplied extraction
    Custom(Arc<SelectFn>),
}

impl Selector {
    /// Route parent selector
    pub fn route_parent(parent: NamespacedName, controller_name: impl Into<String>) -> Self {
        Self::RouteParent {
            parent,
            controller_name: controller_name.into(),
        }
    }

    /// Pool parent selector over every parent
    pub fn pool_parents() -> Self {
        Self::PoolParents { gateway: None }
    }

    /// Pool parent selector for one gateway
    pub fn pool_parent(gateway: NamespacedName) -> Self {
        Self::PoolParents {
            gateway: Some(gateway),
        }
    }

    /// Selector from a closure
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&ResourceSnapshot) -> Result<Vec<Vec<Condition>>> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Extract condition groups from a snapshot
    ///
    /// An empty result means the status block the selector looks for does
    /// not exist yet.
    pub fn select(&self, snapshot: &ResourceSnapshot) -> Result<Vec<Vec<Condition>>> {
        match self {
            Self::Conditions => {
                let conditions = snapshot.conditions()?;
                if conditions.is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![conditions])
                }
            }
            Self::RouteParent {
                parent,
                controller_name,
            } => Ok(snapshot
                .route_parent_conditions(parent, controller_name)?
                .into_iter()
                .collect()),
            Self::PoolParents { gateway } => {
                let local_namespace = snapshot.reference.namespace();
                let mut groups: Vec<Vec<Condition>> = snapshot
                    .pool_parents()?
                    .into_iter()
                    .filter(|p| {
                        gateway
                            .as_ref()
                            .map_or(true, |gw| p.parent_ref.refers_to(gw, local_namespace))
                    })
                    .map(|p| p.conditions)
                    .collect();

                // Pools without parent blocks may still report top-level conditions
                if groups.is_empty() && gateway.is_none() {
                    let top = snapshot.conditions()?;
                    if !top.is_empty() {
                        groups.push(top);
                    }
                }
                Ok(groups)
            }
            Self::Custom(f) => f(snapshot),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conditions => write!(f, "status.conditions"),
            Self::RouteParent {
                parent,
                controller_name,
            } => write!(f, "parent {parent} (controller {controller_name})"),
            Self::PoolParents { gateway: None } => write!(f, "any parent"),
            Self::PoolParents { gateway: Some(gw) } => write!(f, "parent {gw}"),
            Self::Custom(_) => write!(f, "custom selector"),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conformance_common::{ConditionStatus, ResourceKind};
    use serde_json::{json, Value};

    fn pool(status: Value) -> ResourceSnapshot {
        ResourceSnapshot::new(
            ResourceKind::InferencePool.named("multi-gateway-pool", "app"),
            Value::Null,
            status,
        )
    }

    #[test]
    fn test_top_level_selector_yields_one_group() {
        let snap = ResourceSnapshot::new(
            ResourceKind::Gateway.named("gw", "infra"),
            Value::Null,
            json!({"conditions": [{"type": "Programmed", "status": "True"}]}),
        );
        let groups = Selector::Conditions.select(&snap).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0][0].type_, "Programmed");
    }

    #[test]
    fn test_top_level_selector_empty_when_no_status() {
        let snap = ResourceSnapshot::new(
            ResourceKind::Gateway.named("gw", "infra"),
            Value::Null,
            Value::Null,
        );
        assert!(Selector::Conditions.select(&snap).unwrap().is_empty());
    }

    #[test]
    fn test_pool_selector_yields_group_per_parent() {
        let snap = pool(json!({"parent": [
            {
                "parentRef": {"name": "conformance-gateway", "namespace": "infra"},
                "conditions": [{"type": "Accepted", "status": "True", "reason": "Accepted"}]
            },
            {
                "parentRef": {"name": "gateway-2"},
                "conditions": [{"type": "Accepted", "status": "False", "reason": "Pending"}]
            }
        ]}));

        let all = Selector::pool_parents().select(&snap).unwrap();
        assert_eq!(all.len(), 2);

        let second = Selector::pool_parent(NamespacedName::new("gateway-2", "app"))
            .select(&snap)
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0][0].status, ConditionStatus::False);
    }

    #[test]
    fn test_pool_selector_falls_back_to_top_level_conditions() {
        let snap = pool(json!({"conditions": [{"type": "Accepted", "status": "True"}]}));
        assert_eq!(Selector::pool_parents().select(&snap).unwrap().len(), 1);

        // A gateway-scoped selector never reads the top-level list
        let scoped = Selector::pool_parent(NamespacedName::new("gw", "infra"));
        assert!(scoped.select(&snap).unwrap().is_empty());
    }

    #[test]
    fn test_route_parent_selector_missing_block_is_empty() {
        let snap = ResourceSnapshot::new(
            ResourceKind::HttpRoute.named("r", "app"),
            Value::Null,
            json!({"parents": []}),
        );
        let selector = Selector::route_parent(NamespacedName::new("gw", "infra"), "ctrl");
        assert!(selector.select(&snap).unwrap().is_empty());
    }

    #[test]
    fn test_custom_selector() {
        let selector = Selector::custom(|_| {
            Ok(vec![vec![Condition::new(
                "Ready",
                ConditionStatus::True,
                "",
                "",
            )]])
        });
        let snap = pool(Value::Null);
        assert_eq!(selector.select(&snap).unwrap()[0][0].type_, "Ready");
        assert_eq!(selector.to_string(), "custom selector");
    }

    #[test]
    fn test_selector_display() {
        let selector = Selector::route_parent(
            NamespacedName::new("conformance-gateway", "infra"),
            "example.com/gateway",
        );
        assert_eq!(
            selector.to_string(),
            "parent infra/conformance-gateway (controller example.com/gateway)"
        );
    }
}
