use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::AppState;
use crate::domain::trade_math::{fee_amount_from_percent, net_after_fee, notional_usd};
use crate::domain::{decimal_to_display, AssetPriceState, Decimal, PriceSource, Symbol};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationQuery {
    pub symbol: String,
    pub quantity: String,
    /// Human percent, e.g. "0.1" for 0.1 %.
    pub fee_percent: Option<String>,
}

/// Whether a price backed the valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuationStatus {
    Success,
    Error,
}

impl From<&AssetPriceState> for ValuationStatus {
    fn from(state: &AssetPriceState) -> Self {
        match state {
            AssetPriceState::Success { .. } => ValuationStatus::Success,
            _ => ValuationStatus::Error,
        }
    }
}

/// Unavailable figures serialize as `null`, never as zero.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResponse {
    pub symbol: Symbol,
    pub status: ValuationStatus,
    pub quantity: String,
    pub price_usd: Option<String>,
    pub source: Option<PriceSource>,
    pub notional_usd: Option<String>,
    pub fee_usd: Option<String>,
    pub net_usd: Option<String>,
}

fn parse_quantity(input: &str) -> Result<Decimal, AppError> {
    Decimal::parse(input)
        .ok()
        .filter(Decimal::is_positive)
        .ok_or_else(|| AppError::BadRequest("quantity must be a positive decimal".to_string()))
}

fn parse_fee_percent(input: Option<&str>) -> Result<Option<Decimal>, AppError> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match Decimal::parse(raw) {
        Ok(pct) if !pct.is_negative() => Ok(Some(pct)),
        _ => Err(AppError::BadRequest(
            "feePercent must be a non-negative decimal".to_string(),
        )),
    }
}

pub async fn get_valuation(
    Query(params): Query<ValuationQuery>,
    State(state): State<AppState>,
) -> Result<Json<ValuationResponse>, AppError> {
    let symbol = Symbol::parse(&params.symbol)
        .ok_or_else(|| AppError::BadRequest("symbol must not be empty".to_string()))?;
    let quantity = parse_quantity(&params.quantity)?.to_canonical_string();
    let fee_percent = parse_fee_percent(params.fee_percent.as_deref())?;

    let price = match state.prices.resolve_symbol(&symbol).await {
        Ok(quote) => AssetPriceState::from(&quote),
        Err(err) => {
            warn!("Valuation without price for symbol={}: {}", symbol, err);
            AssetPriceState::Error
        }
    };

    let notional = price
        .price_usd()
        .and_then(|px| notional_usd(quantity.as_str(), px));
    let fee = notional.as_deref().and_then(|n| match &fee_percent {
        Some(pct) if pct.is_positive() => {
            fee_amount_from_percent(n, pct.to_canonical_string().as_str())
        }
        _ => Some("0".to_string()),
    });
    let net = match (&notional, &fee) {
        (Some(n), Some(f)) => net_after_fee(n.as_str(), f.as_str()),
        _ => None,
    };

    let scale = state.config.display_scale;
    let display =
        |value: Option<String>| value.and_then(|v| decimal_to_display(v.as_str(), scale));

    Ok(Json(ValuationResponse {
        symbol,
        status: ValuationStatus::from(&price),
        quantity,
        price_usd: price.price_usd().map(str::to_string),
        source: price.source(),
        notional_usd: display(notional),
        fee_usd: display(fee),
        net_usd: display(net),
    }))
}
