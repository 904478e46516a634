//! Proposed actions
//!
//! An action borrows the stashes and agent it concerns for the duration of an
//! evaluation. Once permitted, the caller turns it into an owned
//! [`LedgerEntry`](crate::stash::LedgerEntry) and records it.

use serde::{Deserialize, Serialize};
use stashguard_core::{ActionKind, Agent, AgentId, Badge, Money, Reply};

use crate::condition::ConditionSpec;
use crate::stash::Stash;

/// A proposed transfer of value out of `source`
#[derive(Debug, Clone)]
pub struct TransAction<'a> {
    pub source: &'a Stash,
    pub target: &'a Stash,
    pub agent: &'a Agent,
    pub amount: Money,
    pub replies: Vec<Reply>,
}

impl<'a> TransAction<'a> {
    pub fn new(source: &'a Stash, target: &'a Stash, agent: &'a Agent, amount: Money) -> Self {
        Self {
            source,
            target,
            agent,
            amount,
            replies: Vec::new(),
        }
    }
}

/// A proposed change to a stash's rule set or badge set
#[derive(Debug, Clone)]
pub struct AlterAction<'a> {
    pub stash: &'a Stash,
    pub agent: &'a Agent,
    pub change: Alteration,
    pub replies: Vec<Reply>,
}

impl<'a> AlterAction<'a> {
    pub fn new(stash: &'a Stash, agent: &'a Agent, change: Alteration) -> Self {
        Self {
            stash,
            agent,
            change,
            replies: Vec::new(),
        }
    }

    /// Propose adding, replacing, or removing a top-level rule node
    pub fn rule_change(
        stash: &'a Stash,
        agent: &'a Agent,
        old_rule: Option<ConditionSpec>,
        new_rule: Option<ConditionSpec>,
    ) -> Self {
        Self::new(stash, agent, Alteration::Rule { old_rule, new_rule })
    }

    /// The rule node being replaced or removed
    pub fn old_rule(&self) -> Option<&ConditionSpec> {
        match &self.change {
            Alteration::Rule { old_rule, .. } => old_rule.as_ref(),
            Alteration::Badge(_) => None,
        }
    }

    /// The rule node being added or substituted in
    pub fn new_rule(&self) -> Option<&ConditionSpec> {
        match &self.change {
            Alteration::Rule { new_rule, .. } => new_rule.as_ref(),
            Alteration::Badge(_) => None,
        }
    }
}

/// What an alter action changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Alteration {
    /// Add (`new_rule` only), remove (`old_rule` only), or replace (both)
    Rule {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_rule: Option<ConditionSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_rule: Option<ConditionSpec>,
    },

    /// Grant or revoke a badge
    Badge(BadgeChange),
}

/// A badge mutation, always recorded as a ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BadgeChange {
    Grant { badge: Badge },
    Revoke { badge_id: String, holder: AgentId },
}

/// A proposed ledger entry under evaluation
#[derive(Debug, Clone)]
pub enum Action<'a> {
    Trans(TransAction<'a>),
    Alter(AlterAction<'a>),
}

impl<'a> Action<'a> {
    /// Which variant this is
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Trans(_) => ActionKind::Trans,
            Self::Alter(_) => ActionKind::Alter,
        }
    }

    /// The stash the action is drawn against (the source of a transfer)
    pub fn stash(&self) -> &'a Stash {
        match self {
            Self::Trans(trans) => trans.source,
            Self::Alter(alter) => alter.stash,
        }
    }

    /// The acting agent
    pub fn agent(&self) -> &'a Agent {
        match self {
            Self::Trans(trans) => trans.agent,
            Self::Alter(alter) => alter.agent,
        }
    }

    pub fn replies(&self) -> &[Reply] {
        match self {
            Self::Trans(trans) => &trans.replies,
            Self::Alter(alter) => &alter.replies,
        }
    }

    pub fn as_trans(&self) -> Option<&TransAction<'a>> {
        match self {
            Self::Trans(trans) => Some(trans),
            Self::Alter(_) => None,
        }
    }

    pub fn as_alter(&self) -> Option<&AlterAction<'a>> {
        match self {
            Self::Alter(alter) => Some(alter),
            Self::Trans(_) => None,
        }
    }
}

impl<'a> From<TransAction<'a>> for Action<'a> {
    fn from(action: TransAction<'a>) -> Self {
        Self::Trans(action)
    }
}

impl<'a> From<AlterAction<'a>> for Action<'a> {
    fn from(action: AlterAction<'a>) -> Self {
        Self::Alter(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::RuleSet;

    #[test]
    fn test_action_accessors() {
        let owner = Agent::new("owner");
        let source = Stash::new("allowance", owner.id.clone(), RuleSet::empty());
        let target = Stash::new("shop", owner.id.clone(), RuleSet::empty());

        let action: Action = TransAction::new(&source, &target, &owner, Money::new(5, "USD")).into();
        assert_eq!(action.kind(), ActionKind::Trans);
        assert_eq!(action.stash().id().as_str(), "allowance");
        assert_eq!(action.agent().id, owner.id);
        assert!(action.as_alter().is_none());
    }

    #[test]
    fn test_alteration_deserialization() {
        let json = r#"{
            "type": "rule",
            "new_rule": {"kind": "agent_holds_badge", "params": {"badge_id": "parent"}, "expected": true}
        }"#;
        let change: Alteration = serde_json::from_str(json).unwrap();

        match change {
            Alteration::Rule { old_rule, new_rule } => {
                assert!(old_rule.is_none());
                assert_eq!(new_rule.unwrap().kind, "agent_holds_badge");
            }
            _ => panic!("Wrong alteration type"),
        }
    }

    #[test]
    fn test_badge_change_deserialization() {
        let json = r#"{"type": "badge", "op": "revoke", "badge_id": "parent", "holder": "dad"}"#;
        let change: Alteration = serde_json::from_str(json).unwrap();

        assert_eq!(
            change,
            Alteration::Badge(BadgeChange::Revoke {
                badge_id: "parent".to_string(),
                holder: AgentId::from("dad"),
            })
        );
    }
}
