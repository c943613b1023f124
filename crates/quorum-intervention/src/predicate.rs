//! Condition predicates.

use std::collections::BTreeMap;
use std::sync::Arc;

use quorum_types::DeliberationResult;

/// Environment a predicate is evaluated against.
#[derive(Clone, Debug)]
pub struct EnforcementContext {
    pub target: String,
    pub decision: DeliberationResult,
}

type Predicate = Arc<dyn Fn(&EnforcementContext) -> bool + Send + Sync>;

/// Named predicates for `ConditionCheck` gates. Immutable during a
/// circuit invocation.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: BTreeMap<String, Predicate>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&EnforcementContext) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    /// Evaluate one named condition. An unregistered name fails closed.
    pub fn evaluate(&self, name: &str, context: &EnforcementContext) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate(context),
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }
}
