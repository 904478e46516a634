//! Rule capability trait and built-in rules
//!
//! A rule is a named, parameterized predicate over an [`Action`]. Rules declare
//! which action variants they test through [`RuleTarget`]; the evaluator checks
//! the target before calling [`Rule::test`], so misapplied rules surface as
//! [`Error::RuleActionTypeMismatch`] instead of a silent `false`.

use serde::{Deserialize, Serialize};
use stashguard_core::{Error, Money, MoneyFormat, Result, RuleTarget};
use std::fmt;

use crate::action::{Action, TransAction};

/// Parameter bundle of a rule, in its serialized form
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Renderer-agnostic description of a rule: a template with `{name}`
/// placeholders and the values to fill them with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub template: String,
    #[serde(default)]
    pub params: Params,
}

impl Explanation {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            params: Params::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Trait for all rules
pub trait Rule: fmt::Debug + Send + Sync {
    /// Registered kind identifier
    fn kind(&self) -> &str;

    /// Action variants this rule is able to test
    fn target(&self) -> RuleTarget;

    /// Parameters in serialized form, as accepted by the registry
    fn params(&self) -> Params;

    /// Test the action. Must not mutate anything reachable from it.
    fn test(&self, action: &Action<'_>) -> Result<bool>;

    /// Optional self-description for explain traces
    fn explain(&self) -> Option<Explanation> {
        None
    }
}

/// Serialize a typed parameter struct into a [`Params`] map
///
/// `P` must serialize to a JSON object with string keys; any other shape
/// yields an empty map. Derived structs of strings and [`Money`] values, like
/// the built-in parameter structs, always do.
pub fn to_params<P: Serialize>(params: &P) -> Params {
    match serde_json::to_value(params) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Params::new(),
    }
}

pub(crate) fn type_mismatch(rule: &dyn Rule, action: &Action<'_>) -> Error {
    Error::RuleActionTypeMismatch {
        kind: rule.kind().to_string(),
        accepts: rule.target(),
        actual: action.kind(),
    }
}

fn expect_trans<'r, 'a>(rule: &dyn Rule, action: &'r Action<'a>) -> Result<&'r TransAction<'a>> {
    action.as_trans().ok_or_else(|| type_mismatch(rule, action))
}

/// Parameters of [`TransactionAmountBelow`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmountBelowParams {
    pub amount: Money,
}

/// Passes when a transfer moves strictly less than the configured amount
#[derive(Debug, Clone)]
pub struct TransactionAmountBelow {
    params: AmountBelowParams,
}

impl TransactionAmountBelow {
    pub const KIND: &'static str = "transaction_amount_below";

    pub fn new(amount: Money) -> Self {
        Self::from_params(AmountBelowParams { amount })
    }

    pub fn from_params(params: AmountBelowParams) -> Self {
        Self { params }
    }

    pub fn limit(&self) -> &Money {
        &self.params.amount
    }
}

impl Rule for TransactionAmountBelow {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::TransAction
    }

    fn params(&self) -> Params {
        to_params(&self.params)
    }

    fn test(&self, action: &Action<'_>) -> Result<bool> {
        let trans = expect_trans(self, action)?;
        trans.amount.is_less(&self.params.amount)
    }

    fn explain(&self) -> Option<Explanation> {
        let limit = &self.params.amount;
        let mut explanation = Explanation::new("transaction amount is less than {amount}")
            .with_param("amount", limit.format_exact(MoneyFormat::WithUnit))
            .with_param("value", limit.amount.normalize().to_string())
            .with_param("unit", limit.unit.code());
        if let Some(symbol) = limit.unit.symbol() {
            explanation = explanation.with_param("symbol", symbol);
        }
        Some(explanation)
    }
}

/// Parameters of [`AgentHoldsBadge`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoldsBadgeParams {
    pub badge_id: String,
}

/// Passes when the acting agent holds the badge in the action's stash
#[derive(Debug, Clone)]
pub struct AgentHoldsBadge {
    params: HoldsBadgeParams,
}

impl AgentHoldsBadge {
    pub const KIND: &'static str = "agent_holds_badge";

    pub fn new(badge_id: impl Into<String>) -> Self {
        Self::from_params(HoldsBadgeParams {
            badge_id: badge_id.into(),
        })
    }

    pub fn from_params(params: HoldsBadgeParams) -> Self {
        Self { params }
    }

    pub fn badge_id(&self) -> &str {
        &self.params.badge_id
    }
}

impl Rule for AgentHoldsBadge {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Any
    }

    fn params(&self) -> Params {
        to_params(&self.params)
    }

    fn test(&self, action: &Action<'_>) -> Result<bool> {
        let holder = &action.agent().id;
        Ok(action
            .stash()
            .badges()
            .iter()
            .any(|badge| badge.matches(&self.params.badge_id, holder)))
    }

    fn explain(&self) -> Option<Explanation> {
        Some(
            Explanation::new("member holds badge {badge_id}")
                .with_param("badge_id", self.params.badge_id.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::AlterAction;
    use crate::registry::RuleRegistry;
    use crate::ruleset::RuleSet;
    use crate::stash::{LedgerEntry, Stash};
    use stashguard_core::{Agent, Badge};

    fn family() -> (Agent, Agent, Stash, Stash) {
        let mom = Agent::new("mom");
        let kid = Agent::new("kid");
        let mut allowance = Stash::new("allowance", mom.id.clone(), RuleSet::empty());
        let shop = Stash::new("shop", mom.id.clone(), RuleSet::empty());

        let grant = LedgerEntry::badge_grant(
            allowance.id().clone(),
            Badge::new("parent", mom.id.clone(), mom.id.clone()),
        );
        allowance.record(grant, &RuleRegistry::with_builtins()).unwrap();

        (mom, kid, allowance, shop)
    }

    #[test]
    fn test_amount_below_is_strict() {
        let (mom, _, allowance, shop) = family();
        let rule = TransactionAmountBelow::new(Money::new(100, "USD"));

        let under = Action::from(TransAction::new(&allowance, &shop, &mom, Money::new(99, "USD")));
        let at = Action::from(TransAction::new(&allowance, &shop, &mom, Money::new(100, "USD")));

        assert!(rule.test(&under).unwrap());
        assert!(!rule.test(&at).unwrap());
    }

    #[test]
    fn test_amount_below_explains_the_exact_limit() {
        let (mom, _, allowance, shop) = family();
        let rule = TransactionAmountBelow::new(Money::parse("99.995", "USD").unwrap());

        let over = Action::from(TransAction::new(&allowance, &shop, &mom, Money::parse("99.999", "USD").unwrap()));
        assert!(!rule.test(&over).unwrap());

        let explanation = rule.explain().unwrap();
        assert_eq!(explanation.params["value"], "99.995");
        assert_eq!(explanation.params["amount"], "99.995 USD");
        assert_eq!(explanation.params["unit"], "USD");

        let whole = TransactionAmountBelow::new(Money::parse("100.00", "USD").unwrap());
        let explanation = whole.explain().unwrap();
        assert_eq!(explanation.params["value"], "100");
        assert_eq!(explanation.params["amount"], "100.00 USD");
    }

    #[test]
    fn test_amount_below_rejects_alter_actions() {
        let (mom, _, allowance, _) = family();
        let rule = TransactionAmountBelow::new(Money::new(100, "USD"));
        let alter = Action::from(AlterAction::rule_change(&allowance, &mom, None, None));

        let err = rule.test(&alter).unwrap_err();
        assert!(matches!(err, Error::RuleActionTypeMismatch { .. }));
    }

    #[test]
    fn test_amount_below_unit_mismatch() {
        let (mom, _, allowance, shop) = family();
        let rule = TransactionAmountBelow::new(Money::new(100, "USD"));
        let euros = Action::from(TransAction::new(&allowance, &shop, &mom, Money::new(5, "EUR")));

        assert!(matches!(rule.test(&euros), Err(Error::UnitMismatch { .. })));
    }

    #[test]
    fn test_holds_badge_scans_every_badge() {
        let (mom, kid, mut allowance, shop) = family();
        // A second badge after the match target, held by someone else
        allowance
            .record(
                LedgerEntry::badge_grant(
                    allowance.id().clone(),
                    Badge::new("child", mom.id.clone(), kid.id.clone()),
                ),
                &RuleRegistry::with_builtins(),
            )
            .unwrap();

        let parent = AgentHoldsBadge::new("parent");
        let child = AgentHoldsBadge::new("child");

        let by_mom = Action::from(TransAction::new(&allowance, &shop, &mom, Money::new(1, "USD")));
        let by_kid = Action::from(TransAction::new(&allowance, &shop, &kid, Money::new(1, "USD")));

        assert!(parent.test(&by_mom).unwrap());
        assert!(!parent.test(&by_kid).unwrap());
        assert!(child.test(&by_kid).unwrap());
        assert!(!child.test(&by_mom).unwrap());
    }

    #[test]
    fn test_builtin_params_rebuild_the_same_rule() {
        let registry = RuleRegistry::with_builtins();
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(TransactionAmountBelow::new(Money::parse("12.345", "EUR").unwrap())),
            Box::new(AgentHoldsBadge::new("parent")),
        ];

        for rule in rules {
            let params = rule.params();
            assert!(!params.is_empty(), "{} lost its params", rule.kind());

            let rebuilt = registry.construct(rule.kind(), &params).unwrap();
            assert_eq!(rebuilt.params(), params);
        }
    }

    #[test]
    fn test_explanations() {
        let below = TransactionAmountBelow::new(Money::new(100, "USD")).explain().unwrap();
        assert_eq!(below.template, "transaction amount is less than {amount}");
        assert_eq!(below.params["amount"], "100.00 USD");
        assert_eq!(below.params["symbol"], "$");

        let badge = AgentHoldsBadge::new("verified").explain().unwrap();
        assert_eq!(badge.params["badge_id"], "verified");
    }

    #[test]
    fn test_params_round_trip_through_serde() {
        let rule = TransactionAmountBelow::new(Money::new(100, "USD"));
        let params: AmountBelowParams =
            serde_json::from_value(serde_json::Value::Object(rule.params())).unwrap();
        assert_eq!(&params.amount, rule.limit());
    }
}
