//! Radarr and Sonarr catalog clients.
//!
//! The *arr family authenticates with an `X-Api-Key` header (query fallback
//! `apikey`) and has no library concept, so each instance exposes a single
//! synthetic library covering its whole catalog.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::config::ProviderConfig;
use crate::error::ErrorRecord;
use crate::filter::{apply_content_filtering, FilterConfig};
use crate::media::{Library, MediaItem, MediaSource, MediaStream, StreamType};
use crate::metrics::MetricsLedger;
use crate::providers::probe::{run_probes, ProbeStep, ServerMetadata};
use crate::providers::transport::{AuthMode, Transport};
use crate::providers::{tracked_call, MediaProvider, ProviderKind};
use crate::retry::RetryPolicy;

pub struct ArrCatalogProvider {
    transport: Transport,
    metrics: Arc<MetricsLedger>,
    policy: RetryPolicy,
    filters: FilterConfig,
    name: String,
    kind: ProviderKind,
    items_path: &'static str,
    media_type: &'static str,
    library_id: &'static str,
    library_name: &'static str,
}

impl ArrCatalogProvider {
    pub fn radarr(config: &ProviderConfig, metrics: Arc<MetricsLedger>) -> anyhow::Result<Self> {
        Self::new(
            config,
            metrics,
            ProviderKind::Radarr,
            "/api/v3/movie",
            "Movie",
            "movies",
            "Movies",
        )
    }

    pub fn sonarr(config: &ProviderConfig, metrics: Arc<MetricsLedger>) -> anyhow::Result<Self> {
        Self::new(
            config,
            metrics,
            ProviderKind::Sonarr,
            "/api/v3/series",
            "Series",
            "series",
            "Series",
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        config: &ProviderConfig,
        metrics: Arc<MetricsLedger>,
        kind: ProviderKind,
        items_path: &'static str,
        media_type: &'static str,
        library_id: &'static str,
        library_name: &'static str,
    ) -> anyhow::Result<Self> {
        let transport = Transport::new(
            config.base_url(),
            config.api_key.clone(),
            "X-Api-Key",
            "apikey",
            config.accept_invalid_certs,
        )
        .with_context(|| format!("Failed to build HTTP client for provider '{}'", config.name))?;

        Ok(Self {
            transport,
            metrics,
            policy: config.retry_policy(),
            filters: config.filters.clone(),
            name: config.name.clone(),
            kind,
            items_path,
            media_type,
            library_id,
            library_name,
        })
    }

    fn probe_steps(&self) -> Vec<ProbeStep> {
        vec![
            ProbeStep {
                name: "ping",
                path: "/ping".to_string(),
                auth: AuthMode::None,
            },
            ProbeStep {
                name: "system-status",
                path: "/api/v3/system/status".to_string(),
                auth: AuthMode::Header,
            },
            ProbeStep {
                name: "catalog",
                path: self.items_path.to_string(),
                auth: AuthMode::Header,
            },
            ProbeStep {
                name: "catalog-query",
                path: self.items_path.to_string(),
                auth: AuthMode::Query,
            },
        ]
    }

    async fn items(&self, operation: &str) -> Result<Vec<MediaItem>, ErrorRecord> {
        let raw: Vec<ArrItem> = tracked_call(
            self.metrics.as_ref(),
            self.kind.as_str(),
            operation,
            self.policy,
            || self.transport.get_json(self.items_path, AuthMode::Header),
        )
        .await?;

        Ok(raw
            .into_iter()
            .map(|item| map_item(item, self.media_type))
            .collect())
    }
}

#[async_trait]
impl MediaProvider for ArrCatalogProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn test_connection(&self) -> Result<ServerMetadata, ErrorRecord> {
        let provider = self.kind.as_str();
        self.metrics.record_attempt(provider, "test_connection");

        let result = run_probes(
            &self.transport,
            &self.probe_steps(),
            self.policy,
            Some((self.metrics.as_ref(), provider)),
        )
        .await;

        if let Err(error) = &result {
            self.metrics.record_error(provider, "test_connection");
            warn!(provider, code = %error.code, "connection test failed");
        }
        result
    }

    async fn fetch_media(&self) -> Result<Vec<MediaItem>, ErrorRecord> {
        let items = self.items("fetch_media").await?;
        Ok(apply_content_filtering(&items, &self.filters))
    }

    async fn libraries(&self) -> Result<Vec<Library>, ErrorRecord> {
        Ok(vec![Library {
            id: self.library_id.to_string(),
            name: self.library_name.to_string(),
        }])
    }

    async fn library_items(&self, _library_id: &str) -> Result<Vec<MediaItem>, ErrorRecord> {
        self.items("fetch_library_items").await
    }
}

// ---------------------------------------------------------------------------
// Upstream payload shapes (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrItem {
    #[serde(default)]
    id: i64,
    title: Option<String>,
    year: Option<u16>,
    certification: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    /// Shape varies across versions: `{value}` or `{imdb: {value}, ...}`.
    ratings: Option<Value>,
    in_cinemas: Option<String>,
    first_aired: Option<String>,
    added: Option<String>,
    movie_file: Option<ArrMovieFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrMovieFile {
    media_info: Option<ArrMediaInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrMediaInfo {
    /// e.g. "1920x1080".
    resolution: Option<String>,
}

fn map_item(raw: ArrItem, media_type: &str) -> MediaItem {
    let height = raw
        .movie_file
        .as_ref()
        .and_then(|f| f.media_info.as_ref())
        .and_then(|info| info.resolution.as_deref())
        .and_then(parse_resolution_height);

    MediaItem {
        id: raw.id.to_string(),
        title: raw.title.unwrap_or_default(),
        media_type: media_type.to_string(),
        production_year: raw.year.filter(|y| *y > 0),
        premiere_date: raw.in_cinemas.or(raw.first_aired),
        date_created: raw.added,
        official_rating: raw.certification,
        community_rating: raw.ratings.as_ref().and_then(community_rating),
        user_rating: None,
        genres: raw.genres,
        media_sources: match height {
            Some(height) => vec![MediaSource {
                streams: vec![MediaStream {
                    stream_type: StreamType::Video,
                    height: Some(height),
                }],
            }],
            None => vec![],
        },
    }
}

/// Pull a community rating out of either ratings shape.
fn community_rating(ratings: &Value) -> Option<f64> {
    if let Some(value) = ratings.get("value").and_then(Value::as_f64) {
        return Some(value);
    }
    ratings
        .as_object()?
        .values()
        .find_map(|nested| nested.get("value").and_then(Value::as_f64))
}

/// Height from a "WIDTHxHEIGHT" resolution string.
fn parse_resolution_height(resolution: &str) -> Option<u32> {
    resolution.rsplit_once('x')?.1.trim().parse().ok()
}
