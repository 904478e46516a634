//! Derived stash views must always be recomputable from history

use proptest::prelude::*;
use rust_decimal::Decimal;
use stashguard_core::{AgentId, Badge, Money};
use stashguard_policy::{LedgerEntry, RuleRegistry, RuleSet, Stash};

const AGENTS: [&str; 3] = ["mom", "dad", "kid"];
const BADGES: [&str; 2] = ["parent", "verified"];

#[derive(Debug, Clone)]
enum Op {
    TransferOut { agent: usize, cents: i64, unit: &'static str },
    TransferIn { agent: usize, cents: i64, unit: &'static str },
    Grant { issuer: usize, holder: usize, badge: usize },
    Revoke { agent: usize, holder: usize, badge: usize },
}

fn op() -> impl Strategy<Value = Op> {
    let agent = 0..AGENTS.len();
    let badge = 0..BADGES.len();
    let cents = 1i64..1_000_000;
    let unit = || prop::sample::select(vec!["USD", "EUR"]);

    prop_oneof![
        (agent.clone(), cents.clone(), unit())
            .prop_map(|(agent, cents, unit)| Op::TransferOut { agent, cents, unit }),
        (agent.clone(), cents, unit()).prop_map(|(agent, cents, unit)| Op::TransferIn { agent, cents, unit }),
        (agent.clone(), agent.clone(), badge.clone())
            .prop_map(|(issuer, holder, badge)| Op::Grant { issuer, holder, badge }),
        (agent.clone(), agent, badge).prop_map(|(agent, holder, badge)| Op::Revoke { agent, holder, badge }),
    ]
}

fn entry(stash: &Stash, op: &Op) -> LedgerEntry {
    let id = |index: usize| AgentId::from(AGENTS[index]);
    match *op {
        Op::TransferOut { agent, cents, unit } => LedgerEntry::transfer(
            id(agent),
            stash.id().clone(),
            "elsewhere".into(),
            Money::new(Decimal::new(cents, 2), unit),
        ),
        Op::TransferIn { agent, cents, unit } => LedgerEntry::transfer(
            id(agent),
            "elsewhere".into(),
            stash.id().clone(),
            Money::new(Decimal::new(cents, 2), unit),
        ),
        Op::Grant { issuer, holder, badge } => {
            LedgerEntry::badge_grant(stash.id().clone(), Badge::new(BADGES[badge], id(issuer), id(holder)))
        }
        Op::Revoke { agent, holder, badge } => {
            LedgerEntry::badge_revoke(id(agent), stash.id().clone(), BADGES[badge], id(holder))
        }
    }
}

proptest! {
    #[test]
    fn rebuilt_views_equal_incremental_views(ops in prop::collection::vec(op(), 0..40)) {
        let registry = RuleRegistry::with_builtins();
        let mut stash = Stash::new("family", AgentId::from("mom"), RuleSet::empty());

        for op in &ops {
            let entry = entry(&stash, op);
            stash.record(entry, &registry).unwrap();
        }

        let badges = stash.badges().to_vec();
        let cache = stash.cache().clone();
        stash.rebuild_views().unwrap();

        prop_assert_eq!(stash.badges(), badges.as_slice());
        prop_assert_eq!(stash.cache(), &cache);
        prop_assert_eq!(stash.history().len(), ops.len());
        prop_assert_eq!(cache.entries, ops.len());
    }

    #[test]
    fn badge_set_has_no_duplicates(ops in prop::collection::vec(op(), 0..40)) {
        let registry = RuleRegistry::with_builtins();
        let mut stash = Stash::new("family", AgentId::from("mom"), RuleSet::empty());

        for op in &ops {
            let entry = entry(&stash, op);
            stash.record(entry, &registry).unwrap();
        }

        let badges = stash.badges();
        for (i, a) in badges.iter().enumerate() {
            for b in &badges[i + 1..] {
                prop_assert!(!(a.id == b.id && a.holder == b.holder));
            }
        }
    }
}
