//! Fixed-point money and tax-rate value objects.
//!
//! All monetary values carry exactly two decimal places. Rounding to the cent is
//! half-up (midpoint away from zero).

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of decimal places carried by every `Money` value.
pub const MONEY_SCALE: u32 = 2;

fn round_to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Monetary amount in the clinic's (single) currency, fixed at 2 decimal places.
///
/// Serialized as a decimal string (`"1080.00"`) so no precision is lost in JSON.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Build an amount, rounding half-up to the cent.
    pub fn new(amount: Decimal) -> Self {
        Self(round_to_cents(amount))
    }

    pub fn zero() -> Self {
        Self::from_cents(0)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money::new)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money::new)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Tax rate expressed as a fraction (`0.18` is 18%).
///
/// Invariant: `0 <= rate <= 1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub fn new(rate: Decimal) -> DomainResult<Self> {
        if rate < Decimal::ZERO {
            return Err(DomainError::invalid_amount(format!(
                "tax rate must not be negative (got {rate})"
            )));
        }
        if rate > Decimal::ONE {
            return Err(DomainError::invalid_amount(format!(
                "tax rate must be a fraction between 0 and 1 (got {rate})"
            )));
        }
        Ok(Self(rate.normalize()))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn fraction(self) -> Decimal {
        self.0
    }

    /// Tax owed on `base`, rounded half-up to the cent.
    pub fn apply_to(self, base: Money) -> DomainResult<Money> {
        self.0
            .checked_mul(base.amount())
            .map(Money::new)
            .ok_or_else(|| DomainError::invalid_amount("tax computation overflow"))
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        TaxRate::new(value)
    }
}

impl From<TaxRate> for Decimal {
    fn from(value: TaxRate) -> Self {
        value.0
    }
}
