pub mod health;
pub mod prices;
pub mod valuation;

use crate::config::Config;
use crate::pricing::PriceCacheService;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub prices: PriceCacheService,
}

impl AppState {
    pub fn new(config: Config, prices: PriceCacheService) -> Self {
        Self { config, prices }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/prices", get(prices::get_prices))
        .route("/v1/prices/:symbol", get(prices::get_price))
        .route("/v1/valuation", get(valuation::get_valuation))
        .layer(cors)
        .with_state(state)
}
