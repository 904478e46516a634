//! Policy evaluation engine

use serde::{Deserialize, Serialize};
use stashguard_core::{Result, StashId};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::action::Action;
use crate::condition::{RuleSetSpec, DEFAULT_MAX_DEPTH};
use crate::registry::RuleRegistry;
use crate::ruleset::{Evaluation, RuleSet};
use crate::stash::Stash;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum condition tree depth before evaluation fails
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Also test transfers against the target stash's rule set
    #[serde(default = "default_true")]
    pub check_target_stash: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            check_target_stash: true,
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_true() -> bool {
    true
}

/// Verdict of [`PolicyEngine::authorize`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether every consulted rule set permits the action
    pub permitted: bool,

    /// Traced evaluation per consulted stash, in evaluation order
    pub evaluations: Vec<StashEvaluation>,
}

impl Decision {
    /// The stash whose rules denied the action
    pub fn denied_by(&self) -> Option<&StashId> {
        self.evaluations
            .iter()
            .find(|evaluation| !evaluation.evaluation.verdict)
            .map(|evaluation| &evaluation.stash)
    }
}

/// Evaluation of one stash's rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StashEvaluation {
    pub stash: StashId,
    pub evaluation: Evaluation,
}

/// Policy evaluation engine
///
/// Owns the rule registry and decides actions against the rule sets of the
/// stashes they touch. It never records anything; committing a permitted
/// action is up to the caller.
#[derive(Debug)]
pub struct PolicyEngine {
    registry: RuleRegistry,
    config: EngineConfig,
}

impl PolicyEngine {
    /// Create an engine with default configuration
    pub fn new(registry: RuleRegistry) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: RuleRegistry, config: EngineConfig) -> Self {
        Self {
            registry: registry.with_max_depth(config.max_depth),
            config,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a rule set from its serialized form
    pub fn load_ruleset(&self, spec: &RuleSetSpec) -> Result<RuleSet> {
        self.registry.build_ruleset(spec)
    }

    /// Build a rule set from YAML
    pub fn load_ruleset_yaml(&self, yaml: &str) -> Result<RuleSet> {
        self.load_ruleset(&RuleSetSpec::from_yaml(yaml)?)
    }

    /// Build a rule set from a JSON or YAML file
    pub fn load_ruleset_file(&self, path: impl AsRef<Path>) -> Result<RuleSet> {
        self.load_ruleset(&RuleSetSpec::from_file(path)?)
    }

    /// Decide an action
    ///
    /// Transfers are tested against the source stash and then, unless
    /// disabled or the transfer stays within one stash, the target stash.
    /// Alterations are tested against the stash they alter. The first denial
    /// stops evaluation.
    pub fn authorize(&self, action: &Action<'_>) -> Result<Decision> {
        let started = Instant::now();
        let result = self.decide(action);
        metrics::histogram!("stashguard_evaluation_latency_us")
            .record(started.elapsed().as_micros() as f64);

        match &result {
            Ok(decision) => {
                let verdict = if decision.permitted { "permit" } else { "deny" };
                metrics::counter!("stashguard_decisions_total", "verdict" => verdict).increment(1);
                info!(
                    stash = %action.stash().id(),
                    agent = %action.agent().id,
                    kind = %action.kind(),
                    permitted = decision.permitted,
                    "Action decided"
                );
            }
            Err(e) => {
                metrics::counter!("stashguard_evaluation_errors_total", "error" => e.label()).increment(1);
                warn!(
                    stash = %action.stash().id(),
                    agent = %action.agent().id,
                    error = %e,
                    "Action evaluation failed"
                );
            }
        }

        result
    }

    fn decide(&self, action: &Action<'_>) -> Result<Decision> {
        let mut stashes: Vec<&Stash> = vec![action.stash()];
        if let Action::Trans(trans) = action {
            if self.config.check_target_stash && trans.target.id() != trans.source.id() {
                stashes.push(trans.target);
            }
        }

        let mut evaluations = Vec::with_capacity(stashes.len());
        for stash in stashes {
            let evaluation = stash
                .ruleset()
                .evaluate_with_limit(action, self.config.max_depth)?;
            let permitted = evaluation.verdict;
            evaluations.push(StashEvaluation {
                stash: stash.id().clone(),
                evaluation,
            });
            if !permitted {
                return Ok(Decision {
                    permitted: false,
                    evaluations,
                });
            }
        }

        Ok(Decision {
            permitted: true,
            evaluations,
        })
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(RuleRegistry::with_builtins())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::TransAction;
    use stashguard_core::{Agent, Money};

    const LIMIT_50: &str = r#"
conditions:
  - kind: transaction_amount_below
    params: { amount: { amount: 50, unit: USD } }
    expected: true
"#;

    #[test]
    fn test_config_defaults() {
        let config: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.max_depth, 64);
        assert!(config.check_target_stash);
    }

    #[test]
    fn test_target_stash_rules_are_consulted() {
        let engine = PolicyEngine::default();
        let agent = Agent::new("kid");
        let source = Stash::new("allowance", agent.id.clone(), RuleSet::empty());
        let target = Stash::new("shop", agent.id.clone(), engine.load_ruleset_yaml(LIMIT_50).unwrap());

        let action = Action::from(TransAction::new(&source, &target, &agent, Money::new(80, "USD")));
        let decision = engine.authorize(&action).unwrap();

        assert!(!decision.permitted);
        assert_eq!(decision.evaluations.len(), 2);
        assert_eq!(decision.denied_by().unwrap().as_str(), "shop");
    }

    #[test]
    fn test_target_check_can_be_disabled() {
        let config = EngineConfig {
            check_target_stash: false,
            ..EngineConfig::default()
        };
        let engine = PolicyEngine::with_config(RuleRegistry::with_builtins(), config);
        let agent = Agent::new("kid");
        let source = Stash::new("allowance", agent.id.clone(), RuleSet::empty());
        let target = Stash::new("shop", agent.id.clone(), engine.load_ruleset_yaml(LIMIT_50).unwrap());

        let action = Action::from(TransAction::new(&source, &target, &agent, Money::new(80, "USD")));
        let decision = engine.authorize(&action).unwrap();

        assert!(decision.permitted);
        assert_eq!(decision.evaluations.len(), 1);
        assert!(decision.denied_by().is_none());
    }

    #[test]
    fn test_source_denial_short_circuits_target() {
        let engine = PolicyEngine::default();
        let agent = Agent::new("kid");
        let source = Stash::new("allowance", agent.id.clone(), engine.load_ruleset_yaml(LIMIT_50).unwrap());
        let target = Stash::new("shop", agent.id.clone(), RuleSet::empty());

        let action = Action::from(TransAction::new(&source, &target, &agent, Money::new(80, "USD")));
        let decision = engine.authorize(&action).unwrap();

        assert_eq!(decision.evaluations.len(), 1);
        assert_eq!(decision.denied_by().unwrap().as_str(), "allowance");
    }
}
