//! Coinbase spot price client (primary source).

use super::{get_json, require_price, QuoteSource, QuoteSourceError};
use crate::domain::{PriceSource, Symbol};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_COINBASE_URL: &str = "https://api.coinbase.com/v2/prices";

/// Coinbase quote source using the public `/<SYMBOL>-USD/spot` endpoint.
#[derive(Debug, Clone)]
pub struct CoinbaseQuoteSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: Option<SpotData>,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: Option<String>,
}

impl CoinbaseQuoteSource {
    /// Create a new Coinbase quote source.
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Create with the default Coinbase API URL.
    pub fn default_url() -> Self {
        Self::new(Client::new(), DEFAULT_COINBASE_URL.to_string())
    }

    pub fn spot_url(&self, symbol: &Symbol) -> String {
        format!(
            "{}/{}-USD/spot",
            self.base_url.trim_end_matches('/'),
            symbol.as_str()
        )
    }
}

fn parse_spot_response(body: SpotResponse) -> Result<String, QuoteSourceError> {
    require_price(body.data.and_then(|d| d.amount), "coinbase data.amount")
}

#[async_trait]
impl QuoteSource for CoinbaseQuoteSource {
    fn source(&self) -> PriceSource {
        PriceSource::Coinbase
    }

    async fn fetch_price(&self, symbol: &Symbol) -> Result<String, QuoteSourceError> {
        debug!("Fetching Coinbase spot price for symbol={}", symbol);
        let body: SpotResponse = get_json(&self.client, &self.spot_url(symbol), &[]).await?;
        parse_spot_response(body)
    }
}
