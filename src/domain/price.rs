//! Spot price values exchanged between quote sources, the cache and callers.

use super::primitives::{Symbol, TimeMs};
use serde::{Deserialize, Serialize};

/// Which quote provider produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Coinbase spot prices (primary).
    Coinbase,
    /// Gate.io USDT tickers (secondary).
    GateIo,
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSource::Coinbase => write!(f, "coinbase"),
            PriceSource::GateIo => write!(f, "gateio"),
        }
    }
}

/// A successfully resolved USD price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: Symbol,
    /// Decimal string exactly as the provider reported it.
    pub price_usd: String,
    pub source: PriceSource,
    pub fetched_at: TimeMs,
}

/// What a subscriber currently knows about one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AssetPriceState {
    Loading,
    #[serde(rename_all = "camelCase")]
    Success {
        price_usd: String,
        source: PriceSource,
        fetched_at: TimeMs,
    },
    Error,
}

impl AssetPriceState {
    pub fn is_loading(&self) -> bool {
        matches!(self, AssetPriceState::Loading)
    }

    pub fn price_usd(&self) -> Option<&str> {
        match self {
            AssetPriceState::Success { price_usd, .. } => Some(price_usd),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<PriceSource> {
        match self {
            AssetPriceState::Success { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn fetched_at(&self) -> Option<TimeMs> {
        match self {
            AssetPriceState::Success { fetched_at, .. } => Some(*fetched_at),
            _ => None,
        }
    }
}

impl From<&PriceQuote> for AssetPriceState {
    fn from(quote: &PriceQuote) -> Self {
        AssetPriceState::Success {
            price_usd: quote.price_usd.clone(),
            source: quote.source,
            fetched_at: quote.fetched_at,
        }
    }
}
