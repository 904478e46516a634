//! Rule registry
//!
//! Maps a rule kind to a factory that validates a parameter bundle against
//! the kind's typed schema and builds the rule. The registry is the only
//! bridge from serialized condition trees back to executable ones, so unknown
//! kinds and malformed parameters are rejected at construction time.

use serde::de::DeserializeOwned;
use stashguard_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::condition::{Condition, ConditionSpec, RuleSetSpec, DEFAULT_MAX_DEPTH};
use crate::rule::{AgentHoldsBadge, Params, Rule, TransactionAmountBelow};
use crate::ruleset::RuleSet;

type RuleFactory = Box<dyn Fn(&Params) -> Result<Arc<dyn Rule>> + Send + Sync>;

/// Registry of constructible rule kinds
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
    max_depth: usize,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Create a registry with the built-in rule kinds
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(TransactionAmountBelow::KIND, TransactionAmountBelow::from_params);
        registry.register(AgentHoldsBadge::KIND, AgentHoldsBadge::from_params);
        registry
    }

    /// Reject trees deeper than `max_depth` levels when building from specs
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Register a rule kind whose parameters deserialize into `P`
    ///
    /// Registering an existing kind replaces its factory.
    pub fn register<P, R, F>(&mut self, kind: impl Into<String>, build: F)
    where
        P: DeserializeOwned + 'static,
        R: Rule + 'static,
        F: Fn(P) -> R + Send + Sync + 'static,
    {
        let kind = kind.into();
        let factory_kind = kind.clone();
        let factory: RuleFactory = Box::new(move |params: &Params| {
            let typed: P = serde_json::from_value(serde_json::Value::Object(params.clone()))
                .map_err(|e| Error::invalid_params(factory_kind.as_str(), e))?;
            Ok(Arc::new(build(typed)) as Arc<dyn Rule>)
        });

        debug!(kind = %kind, "Registered rule kind");
        self.factories.insert(kind, factory);
    }

    /// Whether `kind` is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Build a rule of `kind` from its parameters
    pub fn construct(&self, kind: &str, params: &Params) -> Result<Arc<dyn Rule>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| Error::RuleKindUnknown(kind.to_string()))?;
        factory(params)
    }

    /// Build an executable condition tree
    pub fn build_condition(&self, spec: &ConditionSpec) -> Result<Condition> {
        if spec.depth() > self.max_depth {
            return Err(Error::RuleTreeTooDeep {
                max_depth: self.max_depth,
            });
        }
        self.build_node(spec)
    }

    fn build_node(&self, spec: &ConditionSpec) -> Result<Condition> {
        let rule = self.construct(&spec.kind, &spec.params)?;
        let children = spec
            .children
            .iter()
            .map(|child| self.build_node(child))
            .collect::<Result<Vec<_>>>()?;
        Ok(Condition::from_arc(rule, spec.expected).with_children(children))
    }

    /// Build an executable rule set
    pub fn build_ruleset(&self, spec: &RuleSetSpec) -> Result<RuleSet> {
        let conditions = spec
            .conditions
            .iter()
            .map(|condition| self.build_condition(condition))
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleSet::new(conditions))
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("kinds", &self.kinds())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
