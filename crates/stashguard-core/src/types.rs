//! Core types for stashguard

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Opaque, non-essential key-value data (avatar, bio, badge notes, ...)
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Identity of an agent, as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identity of a stash
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StashId(String);

impl StashId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StashId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A party capable of initiating actions
///
/// Agents are created outside the engine and referenced by id from stashes,
/// badges, and ledger entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier (name, email, ...)
    pub id: AgentId,

    /// Non-essential information about the agent
    #[serde(default)]
    pub metadata: Metadata,

    /// Stashes this agent has set up or joined
    #[serde(default)]
    pub stashes: BTreeSet<StashId>,
}

impl Agent {
    /// Create an agent with no metadata and no stashes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(id),
            metadata: Metadata::new(),
            stashes: BTreeSet::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Reference a stash
    pub fn with_stash(mut self, stash: StashId) -> Self {
        self.stashes.insert(stash);
        self
    }
}

/// A reputation marker held by an agent within a stash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    /// Badge identifier, e.g. `parent` or `verified`
    pub id: String,

    /// Agent that issued the badge
    pub issuer: AgentId,

    /// Agent that holds the badge
    pub holder: AgentId,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Badge {
    pub fn new(id: impl Into<String>, issuer: AgentId, holder: AgentId) -> Self {
        Self {
            id: id.into(),
            issuer,
            holder,
            metadata: Metadata::new(),
        }
    }

    /// Whether this is badge `id` held by `holder`
    pub fn matches(&self, id: &str, holder: &AgentId) -> bool {
        self.id == id && &self.holder == holder
    }
}

/// A markdown message posted by an agent in response to an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub agent: AgentId,
    pub md_text: String,
}

impl Reply {
    pub fn new(agent: AgentId, md_text: impl Into<String>) -> Self {
        Self {
            agent,
            md_text: md_text.into(),
        }
    }
}

/// The two action variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// A value transfer between stashes
    Trans,
    /// A change to a stash's rules or badges
    Alter,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trans => f.write_str("transfer action"),
            Self::Alter => f.write_str("alter action"),
        }
    }
}

/// The action variants a rule is able to test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    TransAction,
    AlterAction,
    Any,
}

impl RuleTarget {
    /// Whether an action of `kind` can be tested by a rule with this target
    pub fn accepts(self, kind: ActionKind) -> bool {
        matches!(
            (self, kind),
            (Self::Any, _) | (Self::TransAction, ActionKind::Trans) | (Self::AlterAction, ActionKind::Alter)
        )
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransAction => f.write_str("transfer actions"),
            Self::AlterAction => f.write_str("alter actions"),
            Self::Any => f.write_str("any action"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_target_accepts() {
        assert!(RuleTarget::Any.accepts(ActionKind::Trans));
        assert!(RuleTarget::Any.accepts(ActionKind::Alter));
        assert!(RuleTarget::TransAction.accepts(ActionKind::Trans));
        assert!(!RuleTarget::TransAction.accepts(ActionKind::Alter));
        assert!(!RuleTarget::AlterAction.accepts(ActionKind::Trans));
    }

    #[test]
    fn test_badge_matches_id_and_holder() {
        let badge = Badge::new("parent", AgentId::from("mom"), AgentId::from("dad"));
        assert!(badge.matches("parent", &AgentId::from("dad")));
        assert!(!badge.matches("parent", &AgentId::from("mom")));
        assert!(!badge.matches("child", &AgentId::from("dad")));
    }

    #[test]
    fn test_agent_deserialization_defaults() {
        let agent: Agent = serde_json::from_str(r#"{"id": "alice"}"#).unwrap();
        assert_eq!(agent.id.as_str(), "alice");
        assert!(agent.metadata.is_empty());
        assert!(agent.stashes.is_empty());
    }
}
