//! Domain types for the ledger's financial computation core.
//!
//! This module provides:
//! - Exact decimal arithmetic over arbitrary-precision digits
//! - Domain primitives: TimeMs, Symbol
//! - Spot price quotes and per-symbol subscriber state
//! - Trade-form helpers composed from the decimal engine

pub mod decimal;
pub mod price;
pub mod primitives;
pub mod trade_math;

pub use decimal::{
    decimal_to_display, decimal_to_fractional_percent, divide_decimal, fractional_to_percent,
    is_positive_decimal, multiply_decimal, normalize_decimal, Decimal, DecimalError, DecimalInput,
    DEFAULT_SCALE, MAX_SCALE,
};
pub use price::{AssetPriceState, PriceQuote, PriceSource};
pub use primitives::{normalize_symbols, Symbol, TimeMs};
