use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::{normalize_symbols, PriceQuote};
use crate::error::AppError;
use crate::pricing::PriceStates;

#[derive(Debug, Deserialize)]
pub struct PricesQuery {
    /// Comma-separated, case-insensitive.
    pub symbols: Option<String>,
}

/// Per-symbol state for every requested symbol. A symbol whose sources all
/// failed reports `{"status": "error"}` without failing the others.
pub async fn get_prices(
    Query(params): Query<PricesQuery>,
    State(state): State<AppState>,
) -> Result<Json<PriceStates>, AppError> {
    let raw = params.symbols.unwrap_or_default();
    let symbols = normalize_symbols(raw.split(','));
    if symbols.is_empty() {
        return Err(AppError::BadRequest(
            "symbols must name at least one symbol".to_string(),
        ));
    }

    let mut subscription = state
        .prices
        .subscribe(symbols.iter().map(|s| s.as_str()));
    Ok(Json(subscription.settled().await))
}

pub async fn get_price(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PriceQuote>, AppError> {
    let quote = state.prices.resolve(&symbol).await?;
    Ok(Json(quote))
}
