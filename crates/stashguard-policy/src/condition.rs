//! Condition trees and their serialized form
//!
//! A [`Condition`] pairs a rule with the outcome it is expected to produce and
//! a list of children that must additionally hold whenever the parent holds.
//! [`ConditionSpec`] is the JSON/YAML-compatible `{kind, params, expected,
//! children}` representation; the [`RuleRegistry`](crate::RuleRegistry) turns
//! specs back into executable conditions.

use serde::{Deserialize, Serialize};
use stashguard_core::Result;
use std::path::Path;
use std::sync::Arc;

use crate::rule::{Params, Rule};

/// Default recursion guard for condition trees
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Serialized condition tree node
///
/// Legacy field names from early rule documents are accepted on input
/// (`rule`/`check_if`, `expect`/`is`/`if`, `conditions`/`if_true_then`);
/// output always uses the canonical names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Registered rule kind
    #[serde(alias = "rule", alias = "check_if")]
    pub kind: String,

    /// Rule parameters, validated by the registry
    #[serde(default)]
    pub params: Params,

    /// Outcome the rule must produce for this node to hold
    #[serde(alias = "expect", alias = "is", alias = "if")]
    pub expected: bool,

    /// Conditions additionally required when this node holds
    #[serde(
        default,
        alias = "conditions",
        alias = "if_true_then",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<ConditionSpec>,
}

impl ConditionSpec {
    pub fn new(kind: impl Into<String>, params: Params, expected: bool) -> Self {
        Self {
            kind: kind.into(),
            params,
            expected,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ConditionSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Number of levels in this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(ConditionSpec::depth).max().unwrap_or(0)
    }
}

/// Serialized rule set: the ordered top-level condition trees of a stash
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSetSpec {
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
}

impl RuleSetSpec {
    pub fn new(conditions: Vec<ConditionSpec>) -> Self {
        Self { conditions }
    }

    /// Load a rule set from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a rule set from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a rule set from a file; `.json` files are parsed as JSON,
    /// everything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }
}

/// Executable condition tree node
#[derive(Debug, Clone)]
pub struct Condition {
    rule: Arc<dyn Rule>,
    expected: bool,
    children: Vec<Condition>,
}

impl Condition {
    /// Create a leaf condition
    pub fn new(rule: impl Rule + 'static, expected: bool) -> Self {
        Self::from_arc(Arc::new(rule), expected)
    }

    /// Create a leaf condition from a shared rule
    pub fn from_arc(rule: Arc<dyn Rule>, expected: bool) -> Self {
        Self {
            rule,
            expected,
            children: Vec::new(),
        }
    }

    /// Add a child that must hold whenever this node holds
    pub fn with_child(mut self, child: Condition) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Condition>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn rule(&self) -> &dyn Rule {
        self.rule.as_ref()
    }

    pub fn expected(&self) -> bool {
        self.expected
    }

    pub fn children(&self) -> &[Condition] {
        &self.children
    }

    /// Number of levels in this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Condition::depth).max().unwrap_or(0)
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Condition::node_count).sum::<usize>()
    }

    /// Serialized form of this subtree
    pub fn to_spec(&self) -> ConditionSpec {
        ConditionSpec {
            kind: self.rule.kind().to_string(),
            params: self.rule.params(),
            expected: self.expected,
            children: self.children.iter().map(Condition::to_spec).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{AgentHoldsBadge, TransactionAmountBelow};
    use stashguard_core::Money;

    #[test]
    fn test_canonical_deserialization() {
        let json = r#"{
            "conditions": [{
                "kind": "agent_holds_badge",
                "params": {"badge_id": "parent"},
                "expected": false,
                "children": [{
                    "kind": "transaction_amount_below",
                    "params": {"amount": {"amount": "100", "unit": "USD"}},
                    "expected": true
                }]
            }]
        }"#;

        let spec = RuleSetSpec::from_json(json).unwrap();
        assert_eq!(spec.conditions.len(), 1);
        assert!(!spec.conditions[0].expected);
        assert_eq!(spec.conditions[0].children[0].kind, "transaction_amount_below");
        assert_eq!(spec.conditions[0].depth(), 2);
    }

    #[test]
    fn test_legacy_field_names() {
        let yaml = r#"
conditions:
  - check_if: agent_holds_badge
    params:
      badge_id: parent
    is: false
    if_true_then:
      - rule: transaction_amount_below
        params:
          amount: { amount: "100", unit: USD }
        expect: true
"#;

        let spec = RuleSetSpec::from_yaml(yaml).unwrap();
        let top = &spec.conditions[0];
        assert_eq!(top.kind, "agent_holds_badge");
        assert!(!top.expected);
        assert_eq!(top.children.len(), 1);
        assert!(top.children[0].expected);

        let written = serde_json::to_value(top).unwrap();
        assert!(written.get("kind").is_some());
        assert!(written.get("children").is_some());
        assert!(written.get("if_true_then").is_none());
    }

    #[test]
    fn test_missing_expected_is_rejected() {
        let json = r#"{"conditions": [{"kind": "agent_holds_badge", "params": {"badge_id": "x"}}]}"#;
        assert!(RuleSetSpec::from_json(json).is_err());
    }

    #[test]
    fn test_condition_to_spec() {
        let tree = Condition::new(AgentHoldsBadge::new("parent"), false)
            .with_child(Condition::new(TransactionAmountBelow::new(Money::new(100, "USD")), true));

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.node_count(), 2);

        let spec = tree.to_spec();
        assert_eq!(spec.kind, "agent_holds_badge");
        assert_eq!(spec.params["badge_id"], "parent");
        assert_eq!(spec.children[0].kind, "transaction_amount_below");
    }
}
