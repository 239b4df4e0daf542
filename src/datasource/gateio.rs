//! Gate.io ticker client (secondary source).

use super::{get_json, require_price, QuoteSource, QuoteSourceError};
use crate::domain::{PriceSource, Symbol};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_GATEIO_URL: &str = "https://api.gateio.ws/api/v4/spot/tickers";

/// Gate.io quote source reading the last trade of the `<SYMBOL>_USDT` pair.
#[derive(Debug, Clone)]
pub struct GateIoQuoteSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    last: Option<String>,
}

impl GateIoQuoteSource {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Create with the default Gate.io API URL.
    pub fn default_url() -> Self {
        Self::new(Client::new(), DEFAULT_GATEIO_URL.to_string())
    }

    pub fn currency_pair(symbol: &Symbol) -> String {
        format!("{}_USDT", symbol.as_str())
    }
}

fn parse_tickers(tickers: Vec<Ticker>) -> Result<String, QuoteSourceError> {
    let last = tickers.into_iter().next().and_then(|t| t.last);
    require_price(last, "gateio [0].last")
}

#[async_trait]
impl QuoteSource for GateIoQuoteSource {
    fn source(&self) -> PriceSource {
        PriceSource::GateIo
    }

    async fn fetch_price(&self, symbol: &Symbol) -> Result<String, QuoteSourceError> {
        debug!("Fetching Gate.io ticker for symbol={}", symbol);
        let pair = Self::currency_pair(symbol);
        let tickers: Vec<Ticker> =
            get_json(&self.client, &self.base_url, &[("currency_pair", pair.as_str())]).await?;
        parse_tickers(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> Result<String, QuoteSourceError> {
        let tickers: Vec<Ticker> = serde_json::from_value(value)
            .map_err(|e| QuoteSourceError::Parse(e.to_string()))?;
        parse_tickers(tickers)
    }

    #[test]
    fn test_currency_pair() {
        let symbol = Symbol::parse("sol").unwrap();
        assert_eq!(GateIoQuoteSource::currency_pair(&symbol), "SOL_USDT");
    }

    #[test]
    fn test_parse_tickers_uses_first_element() {
        let body = serde_json::json!([
            {"currency_pair": "ETH_USDT", "last": "3100.25"},
            {"currency_pair": "ETH_USDT", "last": "1"}
        ]);
        assert_eq!(parse(body), Ok("3100.25".to_string()));
    }

    #[test]
    fn test_parse_tickers_empty_or_missing_last() {
        assert!(matches!(
            parse(serde_json::json!([])),
            Err(QuoteSourceError::MissingPrice(_))
        ));
        assert!(matches!(
            parse(serde_json::json!([{"currency_pair": "ETH_USDT"}])),
            Err(QuoteSourceError::MissingPrice(_))
        ));
    }

    #[test]
    fn test_parse_tickers_non_numeric_last() {
        let body = serde_json::json!([{"currency_pair": "ETH_USDT", "last": "-"}]);
        assert!(matches!(parse(body), Err(QuoteSourceError::Parse(_))));

        let body = serde_json::json!([{"currency_pair": "ETH_USDT", "last": " 3100.5 "}]);
        assert_eq!(parse(body), Ok("3100.5".to_string()));
    }

    #[test]
    fn test_parse_tickers_rejects_object_body() {
        let body = serde_json::json!({"label": "INVALID_CURRENCY_PAIR"});
        assert!(matches!(parse(body), Err(QuoteSourceError::Parse(_))));
    }
}
