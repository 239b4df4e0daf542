//! Quote source abstraction for fetching USD spot prices from external providers.

use crate::config::{Config, QuoteSourceKind};
use crate::domain::{is_positive_decimal, PriceSource, Symbol};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod coinbase;
pub mod gateio;
pub mod mock;

pub use coinbase::CoinbaseQuoteSource;
pub use gateio::GateIoQuoteSource;
pub use mock::MockQuoteSource;

/// A provider that reports a USD spot price for one symbol.
///
/// Every failure mode (transport, status, payload) maps onto
/// [`QuoteSourceError`]; the resolver treats them all the same way and moves
/// on to the next source.
#[async_trait]
pub trait QuoteSource: Send + Sync + fmt::Debug {
    /// Label stamped on quotes produced by this source.
    fn source(&self) -> PriceSource;

    /// Fetch the current USD price for `symbol` as a decimal string.
    async fn fetch_price(&self, symbol: &Symbol) -> Result<String, QuoteSourceError>;
}

/// Error type for quote source operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteSourceError {
    /// Network error (e.g., connection refused, DNS failure)
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success HTTP status
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    /// Body was not the JSON shape we expected
    #[error("Parse error: {0}")]
    Parse(String),
    /// Body parsed but carried no usable price
    #[error("Price missing: {0}")]
    MissingPrice(String),
}

/// Build the configured sources in fallback order, sharing one HTTP client.
pub fn build_sources(config: &Config, client: reqwest::Client) -> Vec<Arc<dyn QuoteSource>> {
    config
        .quote_sources
        .iter()
        .map(|kind| -> Arc<dyn QuoteSource> {
            match kind {
                QuoteSourceKind::Coinbase => Arc::new(CoinbaseQuoteSource::new(
                    client.clone(),
                    config.primary_quote_url.clone(),
                )),
                QuoteSourceKind::GateIo => Arc::new(GateIoQuoteSource::new(
                    client.clone(),
                    config.secondary_quote_url.clone(),
                )),
            }
        })
        .collect()
}

/// GET `url` (with optional query pairs) and decode a JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, QuoteSourceError> {
    debug!("GET {} {:?}", url, query);

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| QuoteSourceError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(QuoteSourceError::Http {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("Unexpected status")
                .to_string(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| QuoteSourceError::Parse(e.to_string()))
}

/// Accept a provider price field only if it is present and usable.
pub(crate) fn require_price(
    price: Option<String>,
    what: &str,
) -> Result<String, QuoteSourceError> {
    let price = price.ok_or_else(|| QuoteSourceError::MissingPrice(what.to_string()))?;
    check_price(&price, what)
}

/// Trimmed price text, if it is a positive decimal.
///
/// Blank text counts as missing; anything else the decimal engine rejects,
/// or that is zero or negative, is a malformed payload.
pub(crate) fn check_price(price: &str, what: &str) -> Result<String, QuoteSourceError> {
    let trimmed = price.trim();
    if trimmed.is_empty() {
        return Err(QuoteSourceError::MissingPrice(what.to_string()));
    }
    if !is_positive_decimal(trimmed) {
        return Err(QuoteSourceError::Parse(format!(
            "{} is not a positive decimal: {:?}",
            what, trimmed
        )));
    }
    Ok(trimmed.to_string())
}
