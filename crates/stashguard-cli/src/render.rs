//! Plain-text rendering of explain traces
//!
//! Substitutes `{name}` placeholders in an entry's template with its
//! parameter values and indents each line by nesting depth. Entries that
//! carry a `value`/`unit` pair have their `amount` re-rendered in the
//! configured money format.

use regex::{Captures, Regex};
use serde_json::Value;
use stashguard_core::{Money, MoneyFormat};
use stashguard_policy::{ExplainEntry, Params};

const INDENT: &str = "  ";

/// Renders explain entries as indented text lines
#[derive(Debug, Clone)]
pub struct Renderer {
    format: MoneyFormat,
    placeholder: Regex,
}

impl Renderer {
    pub fn new(format: MoneyFormat) -> Result<Self, regex::Error> {
        Ok(Self {
            format,
            placeholder: Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}")?,
        })
    }

    /// Fill a template; unknown placeholders are left as written
    pub fn render_template(&self, template: &str, params: &Params) -> String {
        self.placeholder
            .replace_all(template, |caps: &Captures<'_>| match params.get(&caps[1]) {
                Some(value) => display_value(value),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render one entry without indentation
    pub fn render_entry(&self, entry: &ExplainEntry) -> String {
        let params = self.localized(&entry.params);
        let text = self.render_template(&entry.template, &params);
        match params.get("outcome") {
            Some(outcome) => format!("{} [{}]", text, display_value(outcome)),
            None => text,
        }
    }

    /// Render a trace, one indented line per entry
    pub fn render_trace(&self, entries: &[ExplainEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| format!("{}{}", INDENT.repeat(entry.depth), self.render_entry(entry)))
            .collect()
    }

    fn localized(&self, params: &Params) -> Params {
        let mut params = params.clone();
        if self.format == MoneyFormat::WithUnit {
            return params;
        }

        let money = match (params.get("value"), params.get("unit")) {
            (Some(Value::String(value)), Some(Value::String(unit))) => Money::parse(value, unit.as_str()).ok(),
            _ => None,
        };
        if let Some(money) = money {
            params.insert("amount".to_string(), money.format_exact(self.format).into());
        }
        params
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    fn amount_entry(depth: usize) -> ExplainEntry {
        ExplainEntry {
            depth,
            kind: "transaction_amount_below".to_string(),
            negated: false,
            template: "transaction amount is less than {amount}".to_string(),
            params: params(json!({"amount": "100.00 USD", "value": "100.00", "unit": "USD", "symbol": "$"})),
        }
    }

    #[test]
    fn test_placeholders_substituted() {
        let renderer = Renderer::new(MoneyFormat::WithUnit).unwrap();
        let rendered = renderer.render_template(
            "member holds badge {badge_id} ({count} times, {missing})",
            &params(json!({"badge_id": "parent", "count": 2})),
        );
        assert_eq!(rendered, "member holds badge parent (2 times, {missing})");
    }

    #[test]
    fn test_money_format_applied() {
        let symbolic = Renderer::new(MoneyFormat::Symbolic).unwrap();
        assert_eq!(
            symbolic.render_entry(&amount_entry(0)),
            "transaction amount is less than $100.00"
        );

        let plain = Renderer::new(MoneyFormat::Plain).unwrap();
        assert_eq!(
            plain.render_entry(&amount_entry(0)),
            "transaction amount is less than 100.00"
        );
    }

    #[test]
    fn test_sub_cent_limit_is_not_rounded() {
        let mut entry = amount_entry(0);
        entry.params = params(json!({"amount": "99.995 USD", "value": "99.995", "unit": "USD", "symbol": "$"}));

        let symbolic = Renderer::new(MoneyFormat::Symbolic).unwrap();
        assert_eq!(symbolic.render_entry(&entry), "transaction amount is less than $99.995");
    }

    #[test]
    fn test_trace_indented_by_depth() {
        let renderer = Renderer::new(MoneyFormat::WithUnit).unwrap();
        let mut badge = ExplainEntry {
            depth: 0,
            kind: "agent_holds_badge".to_string(),
            negated: true,
            template: "not (member holds badge {badge_id})".to_string(),
            params: params(json!({"badge_id": "parent"})),
        };
        badge.params.insert("outcome".to_string(), "held".into());

        let lines = renderer.render_trace(&[badge, amount_entry(1)]);
        assert_eq!(
            lines,
            vec![
                "not (member holds badge parent) [held]".to_string(),
                "  transaction amount is less than 100.00 USD".to_string(),
            ]
        );
    }
}
