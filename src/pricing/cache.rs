//! Shared spot price cache with per-symbol request coalescing.

use super::clock::{Clock, SystemClock};
use super::subscription::PriceSubscription;
use crate::datasource::{check_price, QuoteSource, QuoteSourceError};
use crate::domain::{PriceQuote, PriceSource, Symbol};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// How long a fetched price is served without going back to the network.
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(30);

type SharedFetch = Shared<BoxFuture<'static, Result<PriceQuote, ResolveError>>>;

/// One source's failure while resolving a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: PriceSource,
    pub error: QuoteSourceError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
    #[error("all {} quote sources failed for {symbol}", .failures.len())]
    Exhausted {
        symbol: Symbol,
        failures: Vec<SourceFailure>,
    },
    #[error("price fetch task ended abnormally: {0}")]
    Aborted(String),
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Symbol, PriceQuote>,
    in_flight: HashMap<Symbol, SharedFetch>,
}

struct Inner {
    sources: Vec<Arc<dyn QuoteSource>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

/// Process-wide price cache, constructed once and injected into consumers.
///
/// Cloning is cheap and every clone shares the same cache and in-flight
/// ledger. Each fetch runs on its own spawned task, so callers that stop
/// waiting never cancel it; the result still lands in the cache.
#[derive(Clone)]
pub struct PriceCacheService {
    inner: Arc<Inner>,
}

impl fmt::Debug for PriceCacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceCacheService")
            .field("sources", &self.inner.sources)
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}

impl PriceCacheService {
    /// Sources are tried in order; the first usable price wins.
    pub fn new(sources: Vec<Arc<dyn QuoteSource>>) -> Self {
        Self::with_clock(sources, DEFAULT_PRICE_TTL, Arc::new(SystemClock))
    }

    pub fn with_ttl(sources: Vec<Arc<dyn QuoteSource>>, ttl: Duration) -> Self {
        Self::with_clock(sources, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        sources: Vec<Arc<dyn QuoteSource>>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sources,
                ttl,
                clock,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Labels of the configured sources, in fallback order.
    pub fn sources(&self) -> Vec<PriceSource> {
        self.inner.sources.iter().map(|s| s.source()).collect()
    }

    /// The cached quote for `symbol` if it is still within the TTL.
    pub fn cached(&self, symbol: &Symbol) -> Option<PriceQuote> {
        let state = self.inner.lock_state();
        state
            .entries
            .get(symbol)
            .filter(|quote| self.inner.is_fresh(quote))
            .cloned()
    }

    /// Whether a fetch for `symbol` is currently outstanding.
    pub fn is_in_flight(&self, symbol: &Symbol) -> bool {
        self.inner.lock_state().in_flight.contains_key(symbol)
    }

    /// Resolve a raw, case-insensitive symbol.
    pub async fn resolve(&self, symbol: &str) -> Result<PriceQuote, ResolveError> {
        let parsed =
            Symbol::parse(symbol).ok_or_else(|| ResolveError::InvalidSymbol(symbol.to_string()))?;
        self.resolve_symbol(&parsed).await
    }

    /// Fresh cache hit, else join the in-flight fetch, else start one.
    pub async fn resolve_symbol(&self, symbol: &Symbol) -> Result<PriceQuote, ResolveError> {
        let fetch = {
            let mut state = self.inner.lock_state();

            if let Some(quote) = state.entries.get(symbol) {
                if self.inner.is_fresh(quote) {
                    debug!("Price cache hit for symbol={}", symbol);
                    return Ok(quote.clone());
                }
            }

            match state.in_flight.get(symbol) {
                Some(existing) => {
                    debug!("Joining in-flight price fetch for symbol={}", symbol);
                    existing.clone()
                }
                None => {
                    let fetch = Inner::start_fetch(&self.inner, symbol.clone());
                    state.in_flight.insert(symbol.clone(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Track `symbols` and receive per-symbol state as fetches settle.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime, since resolutions are
    /// spawned immediately.
    pub fn subscribe<I, S>(&self, symbols: I) -> PriceSubscription
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        PriceSubscription::new(self.clone(), symbols)
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, quote: &PriceQuote) -> bool {
        let age_ms = self.clock.now().millis_since(quote.fetched_at);
        i128::from(age_ms) < self.ttl.as_millis() as i128
    }

    /// Spawn the fetch and wrap its handle so any number of callers can await it.
    ///
    /// Must be called with the state lock held so the in-flight entry is
    /// registered before anyone else can look for it.
    fn start_fetch(inner: &Arc<Inner>, symbol: Symbol) -> SharedFetch {
        debug!("Starting price fetch for symbol={}", symbol);
        let guard = InFlightGuard {
            inner: Arc::clone(inner),
            symbol,
            armed: true,
        };
        let task = tokio::spawn(guard.run());

        async move {
            task.await
                .unwrap_or_else(|e| Err(ResolveError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }

    async fn fetch_from_sources(&self, symbol: &Symbol) -> Result<PriceQuote, ResolveError> {
        let mut failures = Vec::new();

        for source in &self.sources {
            let label = source.source();
            let fetched = source
                .fetch_price(symbol)
                .await
                .and_then(|price| check_price(&price, &format!("{} price", label)));
            match fetched {
                Ok(price_usd) => {
                    if !failures.is_empty() {
                        debug!("Price for symbol={} served by fallback {}", symbol, label);
                    }
                    return Ok(PriceQuote {
                        symbol: symbol.clone(),
                        price_usd,
                        source: label,
                        fetched_at: self.clock.now(),
                    });
                }
                Err(error) => {
                    warn!(
                        "Quote source {} failed for symbol={}: {}",
                        label, symbol, error
                    );
                    failures.push(SourceFailure {
                        source: label,
                        error,
                    });
                }
            }
        }

        Err(ResolveError::Exhausted {
            symbol: symbol.clone(),
            failures,
        })
    }
}

/// Owns a symbol's in-flight ledger entry for the lifetime of its fetch task.
///
/// The entry is removed when the fetch settles, and also if the task is torn
/// down without settling, so a symbol can never be stuck behind a dead fetch.
struct InFlightGuard {
    inner: Arc<Inner>,
    symbol: Symbol,
    armed: bool,
}

impl InFlightGuard {
    async fn run(mut self) -> Result<PriceQuote, ResolveError> {
        let outcome = self.inner.fetch_from_sources(&self.symbol).await;

        // Cache write and ledger removal happen together, before any waiter
        // sees the outcome.
        let mut state = self.inner.lock_state();
        if let Ok(quote) = &outcome {
            state.entries.insert(self.symbol.clone(), quote.clone());
        }
        state.in_flight.remove(&self.symbol);
        drop(state);
        self.armed = false;

        outcome
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock_state().in_flight.remove(&self.symbol);
        }
    }
}
