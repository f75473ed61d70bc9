use crate::media::{FacetCount, MediaItem};
use crate::providers::probe::ServerMetadata;
use crate::providers::{MediaProvider, ProviderKind};
use crate::server::error::ApiError;
use crate::server::AppContext;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn provider_routes() -> Router<AppContext> {
    Router::new()
        .route("/providers", get(list_providers))
        .route("/providers/:name/test", post(test_provider))
        .route("/providers/:name/media", get(provider_media))
        .route("/providers/:name/facets/qualities", get(facet_qualities))
        .route("/providers/:name/facets/genres", get(facet_genres))
        .route("/providers/:name/facets/ratings", get(facet_ratings))
}

#[derive(Serialize)]
struct ProviderSummary {
    name: String,
    #[serde(rename = "type")]
    kind: ProviderKind,
    enabled: bool,
}

async fn list_providers(State(ctx): State<AppContext>) -> impl IntoResponse {
    let providers: Vec<ProviderSummary> = ctx
        .config
        .providers
        .iter()
        .map(|p| ProviderSummary {
            name: p.name.clone(),
            kind: p.kind,
            enabled: p.enabled,
        })
        .collect();
    Json(providers)
}

fn lookup(ctx: &AppContext, name: &str) -> Result<Arc<dyn MediaProvider>, ApiError> {
    ctx.providers
        .get(name)
        .cloned()
        .ok_or_else(|| ApiError::UnknownProvider(name.to_string()))
}

async fn test_provider(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<ServerMetadata>, ApiError> {
    let provider = lookup(&ctx, &name)?;
    Ok(Json(provider.test_connection().await?))
}

async fn provider_media(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<Vec<MediaItem>>, ApiError> {
    let provider = lookup(&ctx, &name)?;
    Ok(Json(provider.fetch_media().await?))
}

async fn facet_qualities(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<Vec<FacetCount>>, ApiError> {
    let provider = lookup(&ctx, &name)?;
    Ok(Json(provider.qualities_with_counts().await?))
}

async fn facet_genres(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<Vec<FacetCount>>, ApiError> {
    let provider = lookup(&ctx, &name)?;
    Ok(Json(provider.genres_with_counts().await?))
}

async fn facet_ratings(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<Vec<FacetCount>>, ApiError> {
    let provider = lookup(&ctx, &name)?;
    Ok(Json(provider.ratings_with_counts().await?))
}
