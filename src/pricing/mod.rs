//! Spot price resolution: shared cache, request coalescing and subscriptions.

pub mod cache;
pub mod clock;
pub mod subscription;

pub use cache::{PriceCacheService, ResolveError, SourceFailure, DEFAULT_PRICE_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use subscription::{PriceStates, PriceSubscription};
