//! Monetary calculator: base fee, discount and tax rate to a payable amount.
//!
//! Pure and deterministic. All values are rounded half-up to the cent before
//! and after arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clinicbill_core::{DomainError, DomainResult, Money, TaxRate};

/// Amount breakdown stored on every bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amounts {
    pub base: Money,
    pub discount: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub payable: Money,
}

/// Compute the bill breakdown.
///
/// - `tax = round(tax_rate * base_fee, 2)`
/// - `payable = round(base_fee - discount + tax, 2)`
///
/// Negative inputs, a tax rate outside `0..=1`, or a negative payable are
/// rejected with `DomainError::InvalidAmount`.
pub fn compute(base_fee: Decimal, discount: Decimal, tax_rate: Decimal) -> DomainResult<Amounts> {
    let base = Money::new(base_fee);
    if base.is_negative() {
        return Err(DomainError::invalid_amount(format!(
            "base fee must not be negative (got {base})"
        )));
    }

    let discount = Money::new(discount);
    if discount.is_negative() {
        return Err(DomainError::invalid_amount(format!(
            "discount must not be negative (got {discount})"
        )));
    }

    let tax_rate = TaxRate::new(tax_rate)?;
    let tax = tax_rate.apply_to(base)?;

    let payable = base
        .checked_sub(discount)
        .and_then(|net| net.checked_add(tax))
        .ok_or_else(|| DomainError::invalid_amount("payable computation overflow"))?;

    if payable.is_negative() {
        return Err(DomainError::invalid_amount(format!(
            "payable must not be negative (base {base}, discount {discount}, tax {tax})"
        )));
    }

    Ok(Amounts {
        base,
        discount,
        tax_rate,
        tax,
        payable,
    })
}
