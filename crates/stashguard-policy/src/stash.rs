//! Stashes and their ledger
//!
//! A stash's `history` is the authoritative record. Its badge set and
//! aggregate cache are projections of that history: every recorded entry is
//! folded into them, and [`Stash::rebuild_views`] recomputes both from scratch.
//! The rule set only changes through a recorded rule alteration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stashguard_core::{AgentId, Badge, Error, Money, Reply, Result, StashId, Unit};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::action::{Action, Alteration, BadgeChange};
use crate::condition::ConditionSpec;
use crate::registry::RuleRegistry;
use crate::ruleset::RuleSet;

/// An account holding a rule set, badges, and an action history
#[derive(Debug, Clone)]
pub struct Stash {
    id: StashId,
    owner: AgentId,
    ruleset: RuleSet,
    badges: Vec<Badge>,
    history: Vec<LedgerEntry>,
    cache: AggregateCache,
}

impl Stash {
    /// Create a stash with an initial owner and rule set
    pub fn new(id: impl Into<StashId>, owner: AgentId, ruleset: RuleSet) -> Self {
        Self {
            id: id.into(),
            owner,
            ruleset,
            badges: Vec::new(),
            history: Vec::new(),
            cache: AggregateCache::default(),
        }
    }

    pub fn id(&self) -> &StashId {
        &self.id
    }

    pub fn owner(&self) -> &AgentId {
        &self.owner
    }

    pub fn ruleset(&self) -> &RuleSet {
        &self.ruleset
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn history(&self) -> &[LedgerEntry] {
        &self.history
    }

    pub fn cache(&self) -> &AggregateCache {
        &self.cache
    }

    /// Record an already-permitted entry
    ///
    /// Rule changes are rebuilt through `registry` before anything is
    /// appended, so a failed change leaves the stash untouched. Callers must
    /// serialize `record` calls per stash; `&mut self` enforces that within a
    /// process.
    pub fn record(&mut self, entry: LedgerEntry, registry: &RuleRegistry) -> Result<()> {
        if !entry.concerns(&self.id) {
            return Err(Error::policy(format!(
                "ledger entry {} does not concern stash {}",
                entry.id, self.id
            )));
        }

        let mut ruleset = None;
        if let EntryKind::Alter { change, .. } = &entry.kind {
            match change {
                Alteration::Rule { old_rule, new_rule } => {
                    ruleset = Some(self.altered_ruleset(old_rule.as_ref(), new_rule.as_ref(), registry)?);
                }
                Alteration::Badge(BadgeChange::Grant { badge }) if badge.issuer != entry.agent => {
                    return Err(Error::invalid_alteration(format!(
                        "badge '{}' must be issued by the acting agent {}",
                        badge.id, entry.agent
                    )));
                }
                Alteration::Badge(_) => {}
            }
        }

        let mut cache = self.cache.clone();
        cache.apply(&self.id, &entry)?;

        if let Some(ruleset) = ruleset {
            self.ruleset = ruleset;
        }
        fold_badges(&mut self.badges, &entry);
        self.cache = cache;

        info!(
            stash = %self.id,
            entry = %entry.id,
            agent = %entry.agent,
            "Recorded ledger entry"
        );
        self.history.push(entry);
        Ok(())
    }

    fn altered_ruleset(
        &self,
        old: Option<&ConditionSpec>,
        new: Option<&ConditionSpec>,
        registry: &RuleRegistry,
    ) -> Result<RuleSet> {
        // Round-trip through the registry so matching uses canonical params
        let old = old
            .map(|spec| registry.build_condition(spec).map(|c| c.to_spec()))
            .transpose()?;
        let new = new.map(|spec| registry.build_condition(spec)).transpose()?;
        self.ruleset.altered(old.as_ref(), new)
    }

    /// Recompute badges and the aggregate cache from `history` alone
    pub fn rebuild_views(&mut self) -> Result<()> {
        let mut badges = Vec::new();
        let mut cache = AggregateCache::default();
        for entry in &self.history {
            fold_badges(&mut badges, entry);
            cache.apply(&self.id, entry)?;
        }
        self.badges = badges;
        self.cache = cache;
        Ok(())
    }
}

fn fold_badges(badges: &mut Vec<Badge>, entry: &LedgerEntry) {
    let EntryKind::Alter {
        change: Alteration::Badge(change),
        ..
    } = &entry.kind
    else {
        return;
    };

    match change {
        BadgeChange::Grant { badge } => {
            badges.retain(|held| !held.matches(&badge.id, &badge.holder));
            badges.push(badge.clone());
        }
        BadgeChange::Revoke { badge_id, holder } => {
            badges.retain(|held| !held.matches(badge_id, holder));
        }
    }
}

/// A committed action, as stored in a stash's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier
    pub id: Uuid,

    /// Acting agent
    pub agent: AgentId,

    /// What happened
    pub kind: EntryKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Reply>,
}

/// Payload of a ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    Transfer {
        source: StashId,
        target: StashId,
        amount: Money,
    },
    Alter {
        stash: StashId,
        change: Alteration,
    },
}

impl LedgerEntry {
    pub fn new(agent: AgentId, kind: EntryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent,
            kind,
            replies: Vec::new(),
        }
    }

    /// A transfer entry
    pub fn transfer(agent: AgentId, source: StashId, target: StashId, amount: Money) -> Self {
        Self::new(agent, EntryKind::Transfer { source, target, amount })
    }

    /// A badge grant, issued by the badge's issuer
    pub fn badge_grant(stash: StashId, badge: Badge) -> Self {
        let agent = badge.issuer.clone();
        Self::new(
            agent,
            EntryKind::Alter {
                stash,
                change: Alteration::Badge(BadgeChange::Grant { badge }),
            },
        )
    }

    /// A badge revocation
    pub fn badge_revoke(agent: AgentId, stash: StashId, badge_id: impl Into<String>, holder: AgentId) -> Self {
        Self::new(
            agent,
            EntryKind::Alter {
                stash,
                change: Alteration::Badge(BadgeChange::Revoke {
                    badge_id: badge_id.into(),
                    holder,
                }),
            },
        )
    }

    /// Whether the entry belongs in `stash`'s history
    pub fn concerns(&self, stash: &StashId) -> bool {
        match &self.kind {
            EntryKind::Transfer { source, target, .. } => source == stash || target == stash,
            EntryKind::Alter { stash: altered, .. } => altered == stash,
        }
    }
}

impl From<&Action<'_>> for LedgerEntry {
    fn from(action: &Action<'_>) -> Self {
        let kind = match action {
            Action::Trans(trans) => EntryKind::Transfer {
                source: trans.source.id().clone(),
                target: trans.target.id().clone(),
                amount: trans.amount.clone(),
            },
            Action::Alter(alter) => EntryKind::Alter {
                stash: alter.stash.id().clone(),
                change: alter.change.clone(),
            },
        };

        let mut entry = LedgerEntry::new(action.agent().id.clone(), kind);
        entry.replies = action.replies().to_vec();
        entry
    }
}

/// Per-agent activity within a stash
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentActivity {
    /// Entries this agent acted on
    pub actions: usize,

    /// Value this agent moved into the stash, per unit
    pub inflow: BTreeMap<Unit, Decimal>,

    /// Value this agent moved out of the stash, per unit
    pub outflow: BTreeMap<Unit, Decimal>,
}

/// Derived summary of a stash's history, for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateCache {
    pub entries: usize,
    pub inflow: BTreeMap<Unit, Decimal>,
    pub outflow: BTreeMap<Unit, Decimal>,
    pub agents: BTreeMap<AgentId, AgentActivity>,
}

impl AggregateCache {
    /// Fold one entry of `stash`'s history into the summary
    pub fn apply(&mut self, stash: &StashId, entry: &LedgerEntry) -> Result<()> {
        self.entries += 1;
        let activity = self.agents.entry(entry.agent.clone()).or_default();
        activity.actions += 1;

        if let EntryKind::Transfer { source, target, amount } = &entry.kind {
            // A transfer from a stash to itself moves nothing
            if source == target {
                return Ok(());
            }
            if source == stash {
                accumulate(&mut self.outflow, amount)?;
                accumulate(&mut activity.outflow, amount)?;
            } else if target == stash {
                accumulate(&mut self.inflow, amount)?;
                accumulate(&mut activity.inflow, amount)?;
            }
        }
        Ok(())
    }

    /// Total inflow in `unit`
    pub fn total_inflow(&self, unit: &Unit) -> Money {
        Money::new(self.inflow.get(unit).copied().unwrap_or_default(), unit.clone())
    }

    /// Total outflow in `unit`
    pub fn total_outflow(&self, unit: &Unit) -> Money {
        Money::new(self.outflow.get(unit).copied().unwrap_or_default(), unit.clone())
    }

    /// Inflow minus outflow in `unit`
    pub fn balance(&self, unit: &Unit) -> Result<Money> {
        self.total_inflow(unit).subtract(&self.total_outflow(unit))
    }
}

fn accumulate(totals: &mut BTreeMap<Unit, Decimal>, amount: &Money) -> Result<()> {
    let total = totals.entry(amount.unit.clone()).or_default();
    *total = total
        .checked_add(amount.amount)
        .ok_or(Error::Overflow("aggregate"))?;
    Ok(())
}
