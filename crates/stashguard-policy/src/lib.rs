//! stashguard Policy Engine
//!
//! Decides whether a proposed ledger action is permitted by the rule set of
//! the stash it touches.
//!
//! Rule sets are trees of conditions, each pairing a rule with an expected
//! outcome:
//! - Rules are registered by kind with a typed parameter schema
//! - Condition trees are authored as JSON/YAML and built through the registry
//! - Evaluation is a short-circuiting, depth-first AND over the tree
//! - Explain traces describe a rule set (or one evaluation) for renderers

pub mod action;
pub mod condition;
pub mod engine;
pub mod explain;
pub mod registry;
pub mod rule;
pub mod ruleset;
pub mod stash;

pub use action::{Action, AlterAction, Alteration, BadgeChange, TransAction};
pub use condition::{Condition, ConditionSpec, RuleSetSpec, DEFAULT_MAX_DEPTH};
pub use engine::{Decision, EngineConfig, PolicyEngine, StashEvaluation};
pub use explain::ExplainEntry;
pub use registry::RuleRegistry;
pub use rule::{AgentHoldsBadge, Explanation, Params, Rule, TransactionAmountBelow};
pub use ruleset::{Evaluation, NodeOutcome, RuleSet};
pub use stash::{AggregateCache, AgentActivity, EntryKind, LedgerEntry, Stash};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::{Action, AlterAction, Alteration, BadgeChange, TransAction};
    pub use crate::condition::{Condition, ConditionSpec, RuleSetSpec};
    pub use crate::engine::{Decision, EngineConfig, PolicyEngine};
    pub use crate::registry::RuleRegistry;
    pub use crate::rule::{Params, Rule};
    pub use crate::ruleset::RuleSet;
    pub use crate::stash::{LedgerEntry, Stash};
}
