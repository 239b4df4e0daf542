use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ready once at least one quote source is configured.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let sources = state.prices.sources();
    let ttl_ms = state.prices.ttl().as_millis() as u64;

    let (status, label) = if sources.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    } else {
        (StatusCode::OK, "ready")
    };

    (
        status,
        Json(json!({
            "status": label,
            "quoteSources": sources,
            "priceCacheTtlMs": ttl_ms,
        })),
    )
}
