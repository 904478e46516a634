//! Explain traces
//!
//! Walks a rule set without testing anything and emits one entry per node in
//! depth-first order. Each entry carries its nesting depth so a renderer can
//! rebuild "when A holds, additionally require B" phrasing.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::rule::Params;
use crate::ruleset::RuleSet;

/// Template used when a rule does not describe itself
pub const DEFAULT_TEMPLATE: &str = "rule {kind} with {params}";

/// One node of an explain trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainEntry {
    /// Nesting level; top-level conditions are at depth 0
    pub depth: usize,

    /// Rule kind of the node
    pub kind: String,

    /// Whether the node expects its rule to fail
    pub negated: bool,

    /// Template with `{name}` placeholders, wrapped in `not (...)` when negated
    pub template: String,

    /// Values for the template placeholders
    pub params: Params,
}

impl ExplainEntry {
    /// Describe a single node at the given depth
    pub fn for_condition(node: &Condition, depth: usize) -> Self {
        let rule = node.rule();
        let (template, params) = match rule.explain() {
            Some(explanation) => (explanation.template, explanation.params),
            None => {
                let mut params = Params::new();
                params.insert("kind".to_string(), rule.kind().into());
                params.insert("params".to_string(), serde_json::Value::Object(rule.params()));
                (DEFAULT_TEMPLATE.to_string(), params)
            }
        };

        let negated = !node.expected();
        let template = if negated {
            format!("not ({})", template)
        } else {
            template
        };

        Self {
            depth,
            kind: rule.kind().to_string(),
            negated,
            template,
            params,
        }
    }

    /// The bare `(template, params)` pair
    pub fn into_pair(self) -> (String, Params) {
        (self.template, self.params)
    }
}

/// Explain every node of a rule set, depth-first, left to right
pub fn explain(ruleset: &RuleSet) -> Vec<ExplainEntry> {
    let mut entries = Vec::new();
    for condition in ruleset.conditions() {
        walk(condition, 0, &mut entries);
    }
    entries
}

fn walk(node: &Condition, depth: usize, entries: &mut Vec<ExplainEntry>) {
    entries.push(ExplainEntry::for_condition(node, depth));
    for child in node.children() {
        walk(child, depth + 1, entries);
    }
}
