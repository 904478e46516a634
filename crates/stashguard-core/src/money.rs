//! Exact monetary amounts
//!
//! `Money` pairs a `rust_decimal::Decimal` with the unit it is denominated in.
//! Every binary operation checks that both sides share a unit and fails with
//! [`Error::UnitMismatch`] otherwise. Values are immutable; arithmetic returns
//! a new instance.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Currency or token identifier, normalized to upper case
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Unit(String);

impl Unit {
    /// Create a unit from a currency code
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// The normalized currency code
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Display symbol, if the unit has a well-known one
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            _ => None,
        }
    }

    /// Number of decimal places used when formatting
    pub fn scale(&self) -> u32 {
        match self.0.as_str() {
            "JPY" => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Unit {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for Unit {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.0
    }
}

/// Output format for [`Money::format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MoneyFormat {
    /// `10.00`
    Plain,
    /// `10.00 USD`
    #[default]
    WithUnit,
    /// `$10.00`, or `10.00 XYZ` when the unit has no symbol
    Symbolic,
}

impl FromStr for MoneyFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "with_unit" => Ok(Self::WithUnit),
            "symbolic" => Ok(Self::Symbolic),
            other => Err(Error::config(format!("unknown money format '{}'", other))),
        }
    }
}

/// An exact amount denominated in a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// The decimal amount
    #[serde(serialize_with = "serialize_normalized")]
    pub amount: Decimal,

    /// The unit the amount is denominated in
    pub unit: Unit,
}

impl Money {
    /// Create a new amount
    pub fn new(amount: impl Into<Decimal>, unit: impl Into<Unit>) -> Self {
        Self {
            amount: amount.into(),
            unit: unit.into(),
        }
    }

    /// Zero in the given unit
    pub fn zero(unit: impl Into<Unit>) -> Self {
        Self::new(Decimal::ZERO, unit)
    }

    /// Parse an amount from its decimal string form
    pub fn parse(amount: &str, unit: impl Into<Unit>) -> Result<Self> {
        let amount = Decimal::from_str(amount.trim())
            .map_err(|e| Error::config(format!("invalid amount '{}': {}", amount, e)))?;
        Ok(Self::new(amount, unit))
    }

    fn ensure_same_unit(&self, other: &Money) -> Result<()> {
        if self.unit == other.unit {
            Ok(())
        } else {
            Err(Error::UnitMismatch {
                left: self.unit.clone(),
                right: other.unit.clone(),
            })
        }
    }

    /// Sum of two amounts in the same unit
    pub fn add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_unit(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(Error::Overflow("add"))?;
        Ok(Money::new(amount, self.unit.clone()))
    }

    /// Difference of two amounts in the same unit
    pub fn subtract(&self, other: &Money) -> Result<Money> {
        self.ensure_same_unit(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(Error::Overflow("subtract"))?;
        Ok(Money::new(amount, self.unit.clone()))
    }

    /// Scale by a dimensionless factor
    pub fn multiply(&self, factor: Decimal) -> Result<Money> {
        let amount = self
            .amount
            .checked_mul(factor)
            .ok_or(Error::Overflow("multiply"))?;
        Ok(Money::new(amount, self.unit.clone()))
    }

    /// Divide by a dimensionless, non-zero divisor
    pub fn divide(&self, divisor: Decimal) -> Result<Money> {
        if divisor.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let amount = self
            .amount
            .checked_div(divisor)
            .ok_or(Error::Overflow("divide"))?;
        Ok(Money::new(amount, self.unit.clone()))
    }

    /// Total ordering against an amount in the same unit
    pub fn compare(&self, other: &Money) -> Result<Ordering> {
        self.ensure_same_unit(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// `self < other`
    pub fn is_less(&self, other: &Money) -> Result<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    /// `self > other`
    pub fn is_greater(&self, other: &Money) -> Result<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    /// Numeric equality (`10.0 USD` equals `10.00 USD`)
    pub fn is_equal(&self, other: &Money) -> Result<bool> {
        Ok(self.compare(other)? == Ordering::Equal)
    }

    /// Whether the amount is exactly zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Render with the unit's display scale, using banker's rounding
    pub fn format(&self, format: MoneyFormat) -> String {
        self.format_at(format, self.unit.scale())
    }

    /// Render without losing precision: the unit's display scale, widened
    /// to however many decimal places the amount actually carries
    pub fn format_exact(&self, format: MoneyFormat) -> String {
        let scale = self.unit.scale().max(self.amount.normalize().scale());
        self.format_at(format, scale)
    }

    fn format_at(&self, format: MoneyFormat, scale: u32) -> String {
        let mut value = self
            .amount
            .round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
        value.rescale(scale);

        match (format, self.unit.symbol()) {
            (MoneyFormat::Plain, _) => value.to_string(),
            (MoneyFormat::Symbolic, Some(symbol)) => {
                if value.is_sign_negative() {
                    format!("-{}{}", symbol, value.abs())
                } else {
                    format!("{}{}", symbol, value)
                }
            }
            (MoneyFormat::WithUnit, _) | (MoneyFormat::Symbolic, None) => {
                format!("{} {}", value, self.unit)
            }
        }
    }
}

// Trailing zeros are dropped so equal amounts serialize identically
fn serialize_normalized<S>(amount: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Serialize::serialize(&amount.normalize(), serializer)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(MoneyFormat::WithUnit))
    }
}
