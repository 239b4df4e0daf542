pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod error;
pub mod pricing;

pub use config::Config;
pub use datasource::{MockQuoteSource, QuoteSource, QuoteSourceError};
pub use domain::{AssetPriceState, Decimal, PriceQuote, PriceSource, Symbol, TimeMs};
pub use error::AppError;
pub use pricing::{PriceCacheService, PriceSubscription, ResolveError};
