//! Jellyfin and Emby media server clients.
//!
//! Both speak the Emby-derived REST API with `X-Emby-Token` header auth and
//! an `api_key` query fallback; Emby additionally prefixes API paths with
//! `/emby`. One client covers both kinds.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
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

/// Extra fields requested on item listings; the default payload omits them.
const ITEM_FIELDS: &str =
    "Genres,MediaSources,DateCreated,PremiereDate,OfficialRating,CommunityRating";

pub struct EmbyServerProvider {
    transport: Transport,
    metrics: Arc<MetricsLedger>,
    policy: RetryPolicy,
    filters: FilterConfig,
    name: String,
    kind: ProviderKind,
    api_prefix: &'static str,
}

impl EmbyServerProvider {
    pub fn jellyfin(config: &ProviderConfig, metrics: Arc<MetricsLedger>) -> anyhow::Result<Self> {
        Self::new(config, metrics, ProviderKind::Jellyfin, "")
    }

    pub fn emby(config: &ProviderConfig, metrics: Arc<MetricsLedger>) -> anyhow::Result<Self> {
        Self::new(config, metrics, ProviderKind::Emby, "/emby")
    }

    fn new(
        config: &ProviderConfig,
        metrics: Arc<MetricsLedger>,
        kind: ProviderKind,
        api_prefix: &'static str,
    ) -> anyhow::Result<Self> {
        let transport = Transport::new(
            config.base_url(),
            config.api_key.clone(),
            "X-Emby-Token",
            "api_key",
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
            api_prefix,
        })
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.api_prefix, suffix)
    }

    fn probe_steps(&self) -> Vec<ProbeStep> {
        vec![
            ProbeStep {
                name: "public-info",
                path: self.path("/System/Info/Public"),
                auth: AuthMode::None,
            },
            ProbeStep {
                name: "system-info",
                path: self.path("/System/Info"),
                auth: AuthMode::Header,
            },
            ProbeStep {
                name: "media-folders",
                path: self.path("/Library/MediaFolders"),
                auth: AuthMode::Header,
            },
            ProbeStep {
                name: "media-folders-query",
                path: self.path("/Library/MediaFolders"),
                auth: AuthMode::Query,
            },
        ]
    }

    async fn items(
        &self,
        operation: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<MediaItem>, ErrorRecord> {
        let mut path = format!(
            "{}/Items?Recursive=true&IncludeItemTypes=Movie,Series&Fields={ITEM_FIELDS}",
            self.api_prefix
        );
        if let Some(id) = parent_id {
            path.push_str("&ParentId=");
            path.push_str(id);
        }

        let envelope: ItemsEnvelope = tracked_call(
            self.metrics.as_ref(),
            self.kind.as_str(),
            operation,
            self.policy,
            || self.transport.get_json(&path, AuthMode::Header),
        )
        .await?;

        Ok(envelope.items.into_iter().map(map_item).collect())
    }
}

#[async_trait]
impl MediaProvider for EmbyServerProvider {
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
        let items = self.items("fetch_media", None).await?;
        Ok(apply_content_filtering(&items, &self.filters))
    }

    async fn libraries(&self) -> Result<Vec<Library>, ErrorRecord> {
        let path = self.path("/Library/MediaFolders");
        let envelope: FoldersEnvelope = tracked_call(
            self.metrics.as_ref(),
            self.kind.as_str(),
            "fetch_libraries",
            self.policy,
            || self.transport.get_json(&path, AuthMode::Header),
        )
        .await?;

        Ok(envelope
            .items
            .into_iter()
            .map(|folder| Library {
                id: folder.id,
                name: folder.name.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }

    async fn library_items(&self, library_id: &str) -> Result<Vec<MediaItem>, ErrorRecord> {
        self.items("fetch_library_items", Some(library_id)).await
    }
}

// ---------------------------------------------------------------------------
// Upstream payload shapes (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsEnvelope {
    #[serde(default)]
    items: Vec<EmbyItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FoldersEnvelope {
    #[serde(default)]
    items: Vec<EmbyFolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyFolder {
    #[serde(default)]
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyItem {
    #[serde(default)]
    id: String,
    name: Option<String>,
    #[serde(rename = "Type")]
    item_type: Option<String>,
    production_year: Option<u16>,
    premiere_date: Option<String>,
    date_created: Option<String>,
    official_rating: Option<String>,
    community_rating: Option<f64>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    media_sources: Vec<EmbySource>,
    user_data: Option<EmbyUserData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbySource {
    #[serde(default)]
    media_streams: Vec<EmbyStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyStream {
    #[serde(rename = "Type")]
    stream_type: Option<String>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyUserData {
    rating: Option<f64>,
}

fn map_item(raw: EmbyItem) -> MediaItem {
    MediaItem {
        id: raw.id,
        title: raw.name.unwrap_or_default(),
        media_type: raw.item_type.unwrap_or_else(|| "Unknown".to_string()),
        production_year: raw.production_year,
        premiere_date: raw.premiere_date,
        date_created: raw.date_created,
        official_rating: raw.official_rating,
        community_rating: raw.community_rating,
        user_rating: raw.user_data.and_then(|u| u.rating),
        genres: raw.genres,
        media_sources: raw
            .media_sources
            .into_iter()
            .map(|source| MediaSource {
                streams: source
                    .media_streams
                    .into_iter()
                    .map(|stream| MediaStream {
                        stream_type: match stream.stream_type.as_deref() {
                            Some("Video") => StreamType::Video,
                            Some("Audio") => StreamType::Audio,
                            Some("Subtitle") => StreamType::Subtitle,
                            _ => StreamType::Other,
                        },
                        height: stream.height,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_a_full_item() {
        let raw: EmbyItem = serde_json::from_value(json!({
            "Id": "abc",
            "Name": "Inception",
            "Type": "Movie",
            "ProductionYear": 2010,
            "PremiereDate": "2010-07-16T00:00:00Z",
            "DateCreated": "2021-01-01T00:00:00Z",
            "OfficialRating": "PG-13",
            "CommunityRating": 8.4,
            "Genres": ["Action", "Sci-Fi"],
            "UserData": { "Rating": 9.0 },
            "MediaSources": [{
                "MediaStreams": [
                    { "Type": "Audio" },
                    { "Type": "Video", "Height": 1080 }
                ]
            }]
        }))
        .unwrap();

        let item = map_item(raw);
        assert_eq!(item.id, "abc");
        assert_eq!(item.title, "Inception");
        assert_eq!(item.media_type, "Movie");
        assert_eq!(item.production_year, Some(2010));
        assert_eq!(item.official_rating.as_deref(), Some("PG-13"));
        assert_eq!(item.community_rating, Some(8.4));
        assert_eq!(item.user_rating, Some(9.0));
        assert_eq!(item.genres, vec!["Action", "Sci-Fi"]);
        assert_eq!(item.video_height(), Some(1080));
    }

    #[test]
    fn maps_a_sparse_item() {
        let raw: EmbyItem = serde_json::from_value(json!({ "Id": "x" })).unwrap();
        let item = map_item(raw);
        assert_eq!(item.title, "");
        assert_eq!(item.media_type, "Unknown");
        assert!(item.genres.is_empty());
        assert_eq!(item.video_height(), None);
        assert_eq!(item.resolved_year(), None);
    }

    #[test]
    fn envelope_tolerates_missing_items() {
        let envelope: ItemsEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.items.is_empty());
    }
}
