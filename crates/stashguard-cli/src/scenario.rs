//! Scenario files
//!
//! A scenario declares agents, stashes (owner, rule set, seed history) and a
//! list of proposed actions. [`World`] materializes the declarations and runs
//! each action through the engine, recording the permitted ones.

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use stashguard_core::{ActionKind, Agent, AgentId, Money, Reply, StashId};
use stashguard_policy::{
    Action, AlterAction, Alteration, Decision, EntryKind, LedgerEntry, PolicyEngine, RuleRegistry,
    RuleSet, RuleSetSpec, Stash, TransAction,
};
use stashguard_telemetry::{AuditTrail, MetricsCollector};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub agents: Vec<Agent>,

    pub stashes: Vec<StashSpec>,

    /// Proposed actions, run in order
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a scenario; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(scenario)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StashSpec {
    pub id: StashId,
    pub owner: AgentId,

    /// Inline rule set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<RuleSetSpec>,

    /// Rule set file, relative to the scenario file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<PathBuf>,

    /// History recorded before any proposed action runs
    #[serde(default)]
    pub seed: Vec<ActionSpec>,
}

/// An action as written in a scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionSpec {
    Transfer {
        agent: AgentId,
        source: StashId,
        target: StashId,
        amount: Money,
        #[serde(default)]
        replies: Vec<String>,
    },
    Alter {
        agent: AgentId,
        stash: StashId,
        change: Alteration,
        #[serde(default)]
        replies: Vec<String>,
    },
}

impl ActionSpec {
    pub fn agent(&self) -> &AgentId {
        match self {
            Self::Transfer { agent, .. } | Self::Alter { agent, .. } => agent,
        }
    }

    fn replies(&self) -> Vec<Reply> {
        let (agent, replies) = match self {
            Self::Transfer { agent, replies, .. } | Self::Alter { agent, replies, .. } => (agent, replies),
        };
        replies
            .iter()
            .map(|text| Reply::new(agent.clone(), text.as_str()))
            .collect()
    }

    /// The ledger entry this action records, without evaluating it
    pub fn to_entry(&self) -> LedgerEntry {
        let kind = match self {
            Self::Transfer {
                source,
                target,
                amount,
                ..
            } => EntryKind::Transfer {
                source: source.clone(),
                target: target.clone(),
                amount: amount.clone(),
            },
            Self::Alter { stash, change, .. } => EntryKind::Alter {
                stash: stash.clone(),
                change: change.clone(),
            },
        };
        let mut entry = LedgerEntry::new(self.agent().clone(), kind);
        entry.replies = self.replies();
        entry
    }
}

/// Outcome of one proposed action
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    /// Position in the scenario's action list
    pub index: usize,
    pub kind: ActionKind,
    pub agent: AgentId,
    pub stash: StashId,
    pub result: ActionResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActionResult {
    Decided {
        decision: Decision,
        /// Stashes the permitted action was recorded into
        committed: Vec<StashId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        commit_error: Option<String>,
    },
    Failed {
        error: &'static str,
        message: String,
    },
}

impl ActionResult {
    pub fn permitted(&self) -> bool {
        matches!(self, Self::Decided { decision, .. } if decision.permitted)
    }
}

/// Materialized agents and stashes of a scenario
#[derive(Debug)]
pub struct World {
    agents: BTreeMap<AgentId, Agent>,
    stashes: BTreeMap<StashId, Stash>,
}

impl World {
    /// Build agents and stashes, then record every seed entry
    pub fn build(scenario: &Scenario, engine: &PolicyEngine, base_dir: &Path) -> anyhow::Result<Self> {
        let mut agents: BTreeMap<AgentId, Agent> = scenario
            .agents
            .iter()
            .map(|agent| (agent.id.clone(), agent.clone()))
            .collect();

        let mut stashes = BTreeMap::new();
        for spec in &scenario.stashes {
            let owner = agents
                .get_mut(&spec.owner)
                .ok_or_else(|| anyhow!("stash '{}' is owned by unknown agent '{}'", spec.id, spec.owner))?;
            owner.stashes.insert(spec.id.clone());

            let ruleset = load_ruleset(spec, engine, base_dir)?;
            debug!(stash = %spec.id, conditions = ruleset.len(), "Loaded rule set");
            if stashes
                .insert(spec.id.clone(), Stash::new(spec.id.clone(), spec.owner.clone(), ruleset))
                .is_some()
            {
                bail!("stash '{}' is declared twice", spec.id);
            }
        }

        let mut world = Self { agents, stashes };
        for spec in &scenario.stashes {
            for seed in &spec.seed {
                world
                    .commit(&seed.to_entry(), engine.registry())
                    .with_context(|| format!("failed to seed stash '{}'", spec.id))?;
            }
        }

        Ok(world)
    }

    pub fn agent(&self, id: &AgentId) -> anyhow::Result<&Agent> {
        self.agents
            .get(id)
            .ok_or_else(|| anyhow!("unknown agent '{}'", id))
    }

    pub fn stash(&self, id: &StashId) -> anyhow::Result<&Stash> {
        self.stashes
            .get(id)
            .ok_or_else(|| anyhow!("unknown stash '{}'", id))
    }

    pub fn stashes(&self) -> impl Iterator<Item = &Stash> {
        self.stashes.values()
    }

    /// Borrow the declared stashes and agent as an action under evaluation
    pub fn action(&self, spec: &ActionSpec) -> anyhow::Result<Action<'_>> {
        let agent = self.agent(spec.agent())?;
        let action = match spec {
            ActionSpec::Transfer {
                source,
                target,
                amount,
                ..
            } => {
                let mut trans = TransAction::new(self.stash(source)?, self.stash(target)?, agent, amount.clone());
                trans.replies = spec.replies();
                Action::Trans(trans)
            }
            ActionSpec::Alter { stash, change, .. } => {
                let mut alter = AlterAction::new(self.stash(stash)?, agent, change.clone());
                alter.replies = spec.replies();
                Action::Alter(alter)
            }
        };
        Ok(action)
    }

    /// Record `entry` into every stash it concerns
    ///
    /// All concerned stashes are updated or none are: the entry is recorded
    /// into copies first and the copies replace the originals only once every
    /// record succeeded.
    pub fn commit(&mut self, entry: &LedgerEntry, registry: &RuleRegistry) -> stashguard_core::Result<Vec<StashId>> {
        let mut staged = Vec::new();
        for stash in self.stashes.values() {
            if entry.concerns(stash.id()) {
                let mut copy = stash.clone();
                copy.record(entry.clone(), registry)?;
                staged.push(copy);
            }
        }

        let touched = staged.iter().map(|stash| stash.id().clone()).collect();
        for stash in staged {
            self.stashes.insert(stash.id().clone(), stash);
        }
        Ok(touched)
    }

    /// Authorize each proposed action in order, recording permitted ones when
    /// `commit_permitted` is set
    pub fn run(
        &mut self,
        actions: &[ActionSpec],
        engine: &PolicyEngine,
        commit_permitted: bool,
        audit: &mut AuditTrail,
        metrics: &MetricsCollector,
    ) -> anyhow::Result<Vec<ActionReport>> {
        let mut reports = Vec::with_capacity(actions.len());

        for (index, spec) in actions.iter().enumerate() {
            let (kind, stash, outcome, entry) = {
                let action = self
                    .action(spec)
                    .with_context(|| format!("action #{} cannot be built", index + 1))?;
                let stash = action.stash().id().clone();

                let started = Instant::now();
                let outcome = engine.authorize(&action);
                metrics.record_outcome(&outcome, started.elapsed());

                match &outcome {
                    Ok(decision) => audit.record_decision(&stash, spec.agent(), decision),
                    Err(e) => audit.record_failure(&stash, spec.agent(), e),
                }

                (action.kind(), stash, outcome, LedgerEntry::from(&action))
            };

            let result = match outcome {
                Ok(decision) => {
                    let mut committed = Vec::new();
                    let mut commit_error = None;
                    if decision.permitted && commit_permitted {
                        match self.commit(&entry, engine.registry()) {
                            Ok(touched) => {
                                for id in &touched {
                                    audit.record_commit(id, &entry);
                                    metrics.record_commit();
                                }
                                committed = touched;
                            }
                            Err(e) => commit_error = Some(e.to_string()),
                        }
                    }
                    ActionResult::Decided {
                        decision,
                        committed,
                        commit_error,
                    }
                }
                Err(e) => ActionResult::Failed {
                    error: e.label(),
                    message: e.to_string(),
                },
            };

            info!(index = index + 1, stash = %stash, permitted = result.permitted(), "Scenario action finished");
            reports.push(ActionReport {
                index: index + 1,
                kind,
                agent: spec.agent().clone(),
                stash,
                result,
            });
        }

        Ok(reports)
    }
}

fn load_ruleset(spec: &StashSpec, engine: &PolicyEngine, base_dir: &Path) -> anyhow::Result<RuleSet> {
    let ruleset = match (&spec.policy, &spec.policy_file) {
        (Some(_), Some(_)) => bail!("stash '{}' declares both policy and policy_file", spec.id),
        (Some(policy), None) => engine.load_ruleset(policy),
        (None, Some(file)) => engine.load_ruleset_file(base_dir.join(file)),
        (None, None) => Ok(RuleSet::empty()),
    };
    ruleset.with_context(|| format!("invalid rule set for stash '{}'", spec.id))
}
