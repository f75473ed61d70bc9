use crate::providers::ProviderKind;
use crate::server::AppContext;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

pub fn metrics_routes() -> Router<AppContext> {
    Router::new()
        .route("/metrics", get(all_metrics))
        .route("/metrics/:provider", get(provider_metrics))
        .route("/metrics/:provider/reset", post(reset_metrics))
}

async fn all_metrics(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.metrics.snapshot())
}

async fn provider_metrics(
    State(ctx): State<AppContext>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ctx.metrics.provider(&provider).map(Json).ok_or((
        StatusCode::NOT_FOUND,
        format!("no metrics recorded for provider '{provider}'"),
    ))
}

async fn reset_metrics(
    State(ctx): State<AppContext>,
    Path(provider): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    // Reset targets are restricted to the fixed set of known kinds.
    if provider.parse::<ProviderKind>().is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("unknown provider kind '{provider}'"),
        ));
    }

    ctx.metrics.reset(Some(&provider));
    tracing::info!(provider, "metrics reset");
    Ok(Json(serde_json::json!({ "reset": provider })))
}
