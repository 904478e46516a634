//! Rule set evaluation
//!
//! The verdict of a rule set is the AND of its top-level conditions. A
//! condition holds when its rule produces the expected outcome and, only then,
//! every child holds in turn. Evaluation is depth-first, left to right, and
//! stops at the first node that fails; children of a failed node are never
//! tested.

use serde::{Deserialize, Serialize};
use stashguard_core::{Error, Result};
use tracing::debug;

use crate::action::Action;
use crate::condition::{Condition, ConditionSpec, RuleSetSpec, DEFAULT_MAX_DEPTH};
use crate::explain::{self, ExplainEntry};
use crate::rule::type_mismatch;

/// Ordered collection of top-level condition trees governing a stash
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    conditions: Vec<Condition>,
}

impl RuleSet {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// A rule set with no conditions, which permits every action
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Deepest nesting level across all conditions
    pub fn depth(&self) -> usize {
        self.conditions.iter().map(Condition::depth).max().unwrap_or(0)
    }

    /// Test an action with the default recursion guard
    pub fn test(&self, action: &Action<'_>) -> Result<bool> {
        self.test_with_limit(action, DEFAULT_MAX_DEPTH)
    }

    /// Test an action, failing with `RuleTreeTooDeep` past `max_depth` levels
    pub fn test_with_limit(&self, action: &Action<'_>, max_depth: usize) -> Result<bool> {
        Evaluator::new(action, max_depth, false).run(&self.conditions)
    }

    /// Test an action and record every visited node
    pub fn evaluate(&self, action: &Action<'_>) -> Result<Evaluation> {
        self.evaluate_with_limit(action, DEFAULT_MAX_DEPTH)
    }

    pub fn evaluate_with_limit(&self, action: &Action<'_>, max_depth: usize) -> Result<Evaluation> {
        let mut evaluator = Evaluator::new(action, max_depth, true);
        let verdict = evaluator.run(&self.conditions)?;
        Ok(Evaluation {
            verdict,
            outcomes: evaluator.outcomes,
        })
    }

    /// Describe every node without testing anything
    pub fn explain(&self) -> Vec<ExplainEntry> {
        explain::explain(self)
    }

    /// Serialized form of the whole rule set
    pub fn to_spec(&self) -> RuleSetSpec {
        RuleSetSpec::new(self.conditions.iter().map(Condition::to_spec).collect())
    }

    /// Apply a top-level add/replace/remove, returning the new rule set
    pub(crate) fn altered(&self, old: Option<&ConditionSpec>, new: Option<Condition>) -> Result<RuleSet> {
        let mut conditions = self.conditions.clone();

        match (old, new) {
            (None, None) => {
                return Err(Error::invalid_alteration(
                    "rule change names neither an old nor a new rule",
                ))
            }
            (None, Some(added)) => conditions.push(added),
            (Some(old), replacement) => {
                let index = conditions
                    .iter()
                    .position(|condition| &condition.to_spec() == old)
                    .ok_or_else(|| Error::RuleNotFound(old.kind.clone()))?;
                match replacement {
                    Some(new) => conditions[index] = new,
                    None => {
                        conditions.remove(index);
                    }
                }
            }
        }

        Ok(RuleSet::new(conditions))
    }
}

/// Result of a traced evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Overall verdict
    pub verdict: bool,

    /// Visited nodes in evaluation order
    pub outcomes: Vec<NodeOutcome>,
}

impl Evaluation {
    pub fn permitted(&self) -> bool {
        self.verdict
    }

    /// The node that decided a denial
    pub fn failed_node(&self) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|outcome| !outcome.matched)
    }

    /// Explain entries of the visited nodes, each with an `outcome` parameter
    /// of `held` or `failed`
    pub fn explain(&self) -> Vec<ExplainEntry> {
        self.outcomes
            .iter()
            .map(|outcome| {
                let mut entry = outcome.entry.clone();
                let label = if outcome.matched { "held" } else { "failed" };
                entry.params.insert("outcome".to_string(), label.into());
                entry
            })
            .collect()
    }
}

/// A single visited node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
    /// Child indices from the top-level list down to this node
    pub path: Vec<usize>,

    /// Description of the node
    pub entry: ExplainEntry,

    /// What the rule returned
    pub actual: bool,

    /// Whether `actual` equals the node's expected outcome
    pub matched: bool,
}

struct Evaluator<'e, 'a> {
    action: &'e Action<'a>,
    max_depth: usize,
    tracing: bool,
    path: Vec<usize>,
    outcomes: Vec<NodeOutcome>,
}

impl<'e, 'a> Evaluator<'e, 'a> {
    fn new(action: &'e Action<'a>, max_depth: usize, tracing: bool) -> Self {
        Self {
            action,
            max_depth,
            tracing,
            path: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    fn run(&mut self, conditions: &[Condition]) -> Result<bool> {
        self.all(conditions, 0)
    }

    fn all(&mut self, conditions: &[Condition], depth: usize) -> Result<bool> {
        for (index, condition) in conditions.iter().enumerate() {
            self.path.push(index);
            let held = self.node(condition, depth);
            self.path.pop();

            if !held? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn node(&mut self, condition: &Condition, depth: usize) -> Result<bool> {
        if depth >= self.max_depth {
            return Err(Error::RuleTreeTooDeep {
                max_depth: self.max_depth,
            });
        }

        let rule = condition.rule();
        if !rule.target().accepts(self.action.kind()) {
            return Err(type_mismatch(rule, self.action));
        }

        let actual = rule.test(self.action)?;
        let matched = actual == condition.expected();
        debug!(
            kind = rule.kind(),
            depth,
            expected = condition.expected(),
            actual,
            "Evaluated condition"
        );

        if self.tracing {
            self.outcomes.push(NodeOutcome {
                path: self.path.clone(),
                entry: ExplainEntry::for_condition(condition, depth),
                actual,
                matched,
            });
        }

        if !matched {
            return Ok(false);
        }
        self.all(condition.children(), depth + 1)
    }
}
