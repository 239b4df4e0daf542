//! Live per-symbol price state for one consumer.

use super::cache::PriceCacheService;
use crate::domain::{normalize_symbols, AssetPriceState, Symbol};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::debug;

/// Symbol to state, ordered by symbol.
pub type PriceStates = BTreeMap<Symbol, AssetPriceState>;

struct SubscriptionState {
    tx: watch::Sender<PriceStates>,
    /// Bumped on every symbol-set change; results from older sets are dropped.
    epoch: AtomicU64,
}

/// A consumer's view over a changing set of symbols.
///
/// Each symbol starts as `Success` when the shared cache is fresh and as
/// `Loading` otherwise, and moves to `Success`/`Error` on its own as its fetch
/// settles. Dropping the subscription stops updates but never cancels the
/// underlying fetches.
pub struct PriceSubscription {
    service: PriceCacheService,
    state: Arc<SubscriptionState>,
    rx: watch::Receiver<PriceStates>,
}

impl PriceSubscription {
    pub(crate) fn new<I, S>(service: PriceCacheService, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (tx, rx) = watch::channel(PriceStates::new());
        let subscription = Self {
            service,
            state: Arc::new(SubscriptionState {
                tx,
                epoch: AtomicU64::new(0),
            }),
            rx,
        };
        subscription.set_symbols(symbols);
        subscription
    }

    /// Replace the tracked symbol set.
    ///
    /// Dropped symbols disappear from the map (their cache entries stay). A
    /// symbol kept across the change retains an earlier `Success` while its
    /// refresh runs.
    pub fn set_symbols<I, S>(&self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = normalize_symbols(symbols);
        let mut to_resolve = Vec::new();
        let mut epoch = 0;

        self.state.tx.send_modify(|current| {
            epoch = self.state.epoch.fetch_add(1, Ordering::SeqCst) + 1;

            let mut next = PriceStates::new();
            for symbol in &requested {
                let state = match self.service.cached(symbol) {
                    Some(quote) => AssetPriceState::from(&quote),
                    None => {
                        to_resolve.push(symbol.clone());
                        match current.get(symbol) {
                            Some(previous @ AssetPriceState::Success { .. }) => previous.clone(),
                            _ => AssetPriceState::Loading,
                        }
                    }
                };
                next.insert(symbol.clone(), state);
            }
            *current = next;
        });

        for symbol in to_resolve {
            self.spawn_resolution(symbol, epoch);
        }
    }

    fn spawn_resolution(&self, symbol: Symbol, epoch: u64) {
        let service = self.service.clone();
        let state: Weak<SubscriptionState> = Arc::downgrade(&self.state);

        tokio::spawn(async move {
            let next = match service.resolve_symbol(&symbol).await {
                Ok(quote) => AssetPriceState::from(&quote),
                Err(err) => {
                    debug!("Subscription marks symbol={} as error: {}", symbol, err);
                    AssetPriceState::Error
                }
            };

            let Some(state) = state.upgrade() else {
                return;
            };
            state.tx.send_if_modified(|current| {
                if state.epoch.load(Ordering::SeqCst) != epoch {
                    return false;
                }
                match current.get_mut(&symbol) {
                    Some(slot) if *slot != next => {
                        *slot = next;
                        true
                    }
                    _ => false,
                }
            });
        });
    }

    /// Current state of every tracked symbol.
    pub fn snapshot(&self) -> PriceStates {
        self.rx.borrow().clone()
    }

    /// Current state of one symbol, if tracked.
    pub fn get(&self, symbol: &str) -> Option<AssetPriceState> {
        let symbol = Symbol::parse(symbol)?;
        self.rx.borrow().get(&symbol).cloned()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.rx.borrow().keys().cloned().collect()
    }

    /// Wait for the next change to the state map.
    pub async fn changed(&mut self) -> PriceStates {
        // The sender lives in `self.state`, so the channel cannot close here.
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    /// Wait until no tracked symbol is `Loading`.
    pub async fn settled(&mut self) -> PriceStates {
        let settled = self
            .rx
            .wait_for(|states| states.values().all(|s| !s.is_loading()))
            .await
            .map(|states| states.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MockQuoteSource, QuoteSource};
    use crate::domain::{PriceSource, TimeMs};
    use crate::pricing::{ManualClock, DEFAULT_PRICE_TTL};
    use std::time::Duration;

    fn setup(mock: MockQuoteSource) -> (PriceCacheService, Arc<MockQuoteSource>) {
        let mock = Arc::new(mock);
        let service = PriceCacheService::with_clock(
            vec![mock.clone() as Arc<dyn QuoteSource>],
            DEFAULT_PRICE_TTL,
            Arc::new(ManualClock::new(TimeMs::new(0))),
        );
        (service, mock)
    }

    #[tokio::test]
    async fn test_unseen_symbols_start_loading() {
        let (service, _mock) = setup(
            MockQuoteSource::new(PriceSource::Coinbase)
                .with_price("BTC", "64000")
                .with_latency(Duration::from_millis(20)),
        );

        let mut sub = service.subscribe(["btc", "BTC ", ""]);
        assert_eq!(sub.symbols(), vec![Symbol::parse("BTC").unwrap()]);
        assert_eq!(sub.get("btc"), Some(AssetPriceState::Loading));

        let states = sub.settled().await;
        assert_eq!(
            states.get(&Symbol::parse("BTC").unwrap()),
            Some(&AssetPriceState::Success {
                price_usd: "64000".to_string(),
                source: PriceSource::Coinbase,
                fetched_at: TimeMs::new(0),
            })
        );
    }

    #[tokio::test]
    async fn test_fresh_cache_is_success_immediately() {
        let (service, mock) =
            setup(MockQuoteSource::new(PriceSource::Coinbase).with_price("ETH", "3000"));
        service.resolve("eth").await.unwrap();

        let sub = service.subscribe(["eth"]);
        let price = sub.get("ETH").and_then(|s| s.price_usd().map(String::from));
        assert_eq!(price.as_deref(), Some("3000"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_removed_symbols_stop_being_tracked() {
        let (service, _mock) = setup(
            MockQuoteSource::new(PriceSource::Coinbase)
                .with_price("BTC", "1")
                .with_price("ETH", "2"),
        );

        let mut sub = service.subscribe(["btc", "eth"]);
        sub.settled().await;

        sub.set_symbols(["eth"]);
        assert_eq!(sub.symbols(), vec![Symbol::parse("ETH").unwrap()]);
        assert!(service.cached(&Symbol::parse("BTC").unwrap()).is_some());
    }
}
