//! Error types for stashguard

use crate::money::Unit;
use crate::types::{ActionKind, RuleTarget};

/// Result type alias using stashguard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stashguard operations
///
/// Every failure is reported as a typed error. A failed evaluation is never
/// folded into a `false` verdict, so callers can tell a policy "no" apart from
/// a misconfigured rule tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two amounts in different units were combined or compared
    #[error("unit mismatch: cannot combine {left} with {right}")]
    UnitMismatch { left: Unit, right: Unit },

    /// Division of an amount by a zero scalar
    #[error("division by zero")]
    DivisionByZero,

    /// Decimal arithmetic overflowed
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// A rule kind that is not registered
    #[error("unknown rule kind: {0}")]
    RuleKindUnknown(String),

    /// Parameters that do not match a rule kind's schema
    #[error("invalid parameters for rule '{kind}': {message}")]
    InvalidParams { kind: String, message: String },

    /// A rule was applied to an action variant it does not test
    #[error("rule '{kind}' tests {accepts} but was applied to {actual}")]
    RuleActionTypeMismatch {
        kind: String,
        accepts: RuleTarget,
        actual: ActionKind,
    },

    /// Condition tree nesting exceeded the recursion guard
    #[error("rule tree exceeds maximum depth of {max_depth}")]
    RuleTreeTooDeep { max_depth: usize },

    /// A rule alteration referenced a node the rule set does not contain
    #[error("rule not found in rule set: {0}")]
    RuleNotFound(String),

    /// A structurally invalid alteration (empty change, foreign issuer, ...)
    #[error("invalid alteration: {0}")]
    InvalidAlteration(String),

    /// Policy-level errors (ledger bookkeeping, wrong stash)
    #[error("policy error: {0}")]
    Policy(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new policy error
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid alteration error
    pub fn invalid_alteration(msg: impl Into<String>) -> Self {
        Self::InvalidAlteration(msg.into())
    }

    /// Create a new invalid parameters error
    pub fn invalid_params(kind: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidParams {
            kind: kind.into(),
            message: message.to_string(),
        }
    }

    /// Short, stable label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnitMismatch { .. } => "unit_mismatch",
            Self::DivisionByZero => "division_by_zero",
            Self::Overflow(_) => "overflow",
            Self::RuleKindUnknown(_) => "rule_kind_unknown",
            Self::InvalidParams { .. } => "invalid_params",
            Self::RuleActionTypeMismatch { .. } => "rule_action_type_mismatch",
            Self::RuleTreeTooDeep { .. } => "rule_tree_too_deep",
            Self::RuleNotFound(_) => "rule_not_found",
            Self::InvalidAlteration(_) => "invalid_alteration",
            Self::Policy(_) => "policy",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Yaml(_) => "yaml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_both_sides() {
        let err = Error::RuleActionTypeMismatch {
            kind: "transaction_amount_below".to_string(),
            accepts: RuleTarget::TransAction,
            actual: ActionKind::Alter,
        };

        assert_eq!(
            err.to_string(),
            "rule 'transaction_amount_below' tests transfer actions but was applied to alter action"
        );
        assert_eq!(err.label(), "rule_action_type_mismatch");
    }

    #[test]
    fn test_unit_mismatch_message() {
        let err = Error::UnitMismatch {
            left: Unit::new("usd"),
            right: Unit::new("EUR"),
        };
        assert_eq!(err.to_string(), "unit mismatch: cannot combine USD with EUR");
    }
}
