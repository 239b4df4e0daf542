//! Mock quote source for testing without network calls.

use super::{QuoteSource, QuoteSourceError};
use crate::domain::{PriceSource, Symbol};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock quote source that serves predefined prices and counts calls.
///
/// Symbols without a configured price fail with a 404, which lets tests drive
/// the fallback chain per symbol.
#[derive(Debug)]
pub struct MockQuoteSource {
    source: PriceSource,
    prices: Mutex<HashMap<String, String>>,
    calls_by_symbol: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl MockQuoteSource {
    /// Create a mock that knows no prices yet.
    pub fn new(source: PriceSource) -> Self {
        Self {
            source,
            prices: Mutex::new(HashMap::new()),
            calls_by_symbol: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Serve `price` for `symbol` (case-insensitive).
    pub fn with_price(self, symbol: &str, price: &str) -> Self {
        self.set_price(symbol, price);
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_price(&self, symbol: &str, price: &str) {
        lock(&self.prices).insert(symbol.trim().to_uppercase(), price.to_string());
    }

    /// Make later fetches for `symbol` fail.
    pub fn remove_price(&self, symbol: &str) {
        lock(&self.prices).remove(&symbol.trim().to_uppercase());
    }

    /// Total fetches across all symbols.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        lock(&self.calls_by_symbol)
            .get(&symbol.trim().to_uppercase())
            .copied()
            .unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn source(&self) -> PriceSource {
        self.source
    }

    async fn fetch_price(&self, symbol: &Symbol) -> Result<String, QuoteSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.calls_by_symbol)
            .entry(symbol.as_str().to_string())
            .or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let price = lock(&self.prices).get(symbol.as_str()).cloned();
        price.ok_or_else(|| QuoteSourceError::Http {
            status: 404,
            message: format!("no mock price for {}", symbol),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_configured_price() {
        let mock = MockQuoteSource::new(PriceSource::Coinbase).with_price("btc", "64000");
        let btc = Symbol::parse("BTC").unwrap();
        assert_eq!(mock.fetch_price(&btc).await, Ok("64000".to_string()));
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.calls_for("btc"), 1);
    }

    #[tokio::test]
    async fn test_mock_unknown_symbol_fails() {
        let mock = MockQuoteSource::new(PriceSource::GateIo);
        let eth = Symbol::parse("eth").unwrap();
        let err = mock.fetch_price(&eth).await.unwrap_err();
        assert!(matches!(err, QuoteSourceError::Http { status: 404, .. }));
        assert_eq!(mock.calls_for("ETH"), 1);
    }

    #[tokio::test]
    async fn test_mock_price_can_change() {
        let mock = MockQuoteSource::new(PriceSource::Coinbase).with_price("SOL", "150");
        let sol = Symbol::parse("sol").unwrap();
        mock.set_price("sol", "151.5");
        assert_eq!(mock.fetch_price(&sol).await, Ok("151.5".to_string()));
        mock.remove_price("SOL");
        assert!(mock.fetch_price(&sol).await.is_err());
        assert_eq!(mock.calls(), 2);
    }
}
