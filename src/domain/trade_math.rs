//! Trade-form arithmetic composed from the decimal engine.
//!
//! Every helper mirrors how the ledger's trade and sell forms derive one field
//! from the others. Inputs that must be positive are checked up front, and any
//! failure yields `None` so callers can show a placeholder instead of a zero.

use super::decimal::{
    divide_decimal, is_positive_decimal, multiply_decimal, Decimal, DecimalInput, DEFAULT_SCALE,
};

/// USD value of `quantity` units at `unit_price`.
pub fn notional_usd<'a, 'b>(
    quantity: impl Into<DecimalInput<'a>>,
    unit_price: impl Into<DecimalInput<'b>>,
) -> Option<String> {
    let quantity = quantity.into();
    let unit_price = unit_price.into();
    if !is_positive_decimal(quantity) || !is_positive_decimal(unit_price) {
        return None;
    }
    multiply_decimal(quantity, unit_price)
}

/// Units bought by spending `usd_amount` at `unit_price`.
pub fn quantity_from_usd<'a, 'b>(
    usd_amount: impl Into<DecimalInput<'a>>,
    unit_price: impl Into<DecimalInput<'b>>,
) -> Option<String> {
    let usd_amount = usd_amount.into();
    let unit_price = unit_price.into();
    if !is_positive_decimal(usd_amount) || !is_positive_decimal(unit_price) {
        return None;
    }
    divide_decimal(usd_amount, unit_price, DEFAULT_SCALE)
}

/// Fee in USD for a human percent (e.g. "0.1" for 0.1 %) of `notional`.
pub fn fee_amount_from_percent<'a, 'b>(
    notional: impl Into<DecimalInput<'a>>,
    fee_percent: impl Into<DecimalInput<'b>>,
) -> Option<String> {
    let notional = notional.into();
    let fee_percent = fee_percent.into();
    if !is_positive_decimal(notional) || !is_positive_decimal(fee_percent) {
        return None;
    }
    let product = multiply_decimal(notional, fee_percent)?;
    divide_decimal(&product, "100", DEFAULT_SCALE)
}

/// Human percent that `fee_amount` represents of `notional`.
pub fn fee_percent_from_amount<'a, 'b>(
    fee_amount: impl Into<DecimalInput<'a>>,
    notional: impl Into<DecimalInput<'b>>,
) -> Option<String> {
    let fee_amount = fee_amount.into();
    let notional = notional.into();
    if !is_positive_decimal(fee_amount) || !is_positive_decimal(notional) {
        return None;
    }
    let ratio = divide_decimal(fee_amount, notional, DEFAULT_SCALE)?;
    multiply_decimal(&ratio, "100")
}

/// `notional - fee`, exact.
pub fn net_after_fee<'a, 'b>(
    notional: impl Into<DecimalInput<'a>>,
    fee: impl Into<DecimalInput<'b>>,
) -> Option<String> {
    let notional = Decimal::parse(notional).ok()?;
    let fee = Decimal::parse(fee).ok()?;
    notional.checked_sub(&fee).map(|d| d.to_canonical_string())
}
