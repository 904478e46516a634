use stashguard_cli::Renderer;
use stashguard_core::MoneyFormat;
use stashguard_policy::{PolicyEngine, RuleSetSpec};
use std::path::Path;

fn allowance_policy() -> RuleSetSpec {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/allowance-policy.yaml");
    RuleSetSpec::from_file(path).unwrap()
}

#[test]
fn test_policy_file_renders_nested_trace() {
    let engine = PolicyEngine::default();
    let ruleset = engine.load_ruleset(&allowance_policy()).unwrap();

    let renderer = Renderer::new(MoneyFormat::Symbolic).unwrap();
    assert_eq!(
        renderer.render_trace(&ruleset.explain()),
        vec![
            "not (member holds badge parent)".to_string(),
            "  transaction amount is less than $100.00".to_string(),
        ]
    );
}

#[test]
fn test_json_trace_keeps_templates_unrendered() {
    let engine = PolicyEngine::default();
    let entries = engine.load_ruleset(&allowance_policy()).unwrap().explain();

    let json = serde_json::to_value(&entries).unwrap();
    assert_eq!(json[1]["template"], "transaction amount is less than {amount}");
    assert_eq!(json[1]["params"]["amount"], "100.00 USD");
    assert_eq!(json[1]["depth"], 1);
}
