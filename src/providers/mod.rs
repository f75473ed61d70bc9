//! Heterogeneous provider dispatch.
//!
//! Every provider kind implements [`MediaProvider`]; [`create_provider`]
//! picks the right client for a configuration entry. The facet operations
//! have shared default implementations here: they scan the provider's
//! libraries, tolerate per-library fetch failures, and feed survivors into
//! the pure tallies in [`crate::facets`].

pub mod arr;
pub mod embyserver;
pub mod probe;
pub mod transport;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ProviderConfig;
use crate::error::ErrorRecord;
use crate::facets;
use crate::media::{FacetCount, Library, MediaItem};
use crate::metrics::MetricsLedger;
use crate::retry::{retry_request, RetryContext, RetryPolicy};
use probe::ServerMetadata;

/// The fixed set of known provider kinds. Metrics ledger cells and the
/// reset allow-list are keyed by these identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Jellyfin,
    Emby,
    Radarr,
    Sonarr,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Jellyfin,
        ProviderKind::Emby,
        ProviderKind::Radarr,
        ProviderKind::Sonarr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Jellyfin => "jellyfin",
            ProviderKind::Emby => "emby",
            ProviderKind::Radarr => "radarr",
            ProviderKind::Sonarr => "sonarr",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown provider kind '{s}'"))
    }
}

/// Shared capability interface every provider kind conforms to.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Configured instance name.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Run the connection probe sequence and return server metadata.
    async fn test_connection(&self) -> Result<ServerMetadata, ErrorRecord>;

    /// Fetch the full catalog, normalized and filtered by the provider's
    /// configured content rules.
    async fn fetch_media(&self) -> Result<Vec<MediaItem>, ErrorRecord>;

    /// The provider's libraries (synthetic for providers without them).
    async fn libraries(&self) -> Result<Vec<Library>, ErrorRecord>;

    /// Unfiltered normalized items of one library.
    async fn library_items(&self, library_id: &str) -> Result<Vec<MediaItem>, ErrorRecord>;

    async fn qualities_with_counts(&self) -> Result<Vec<FacetCount>, ErrorRecord> {
        let items = collect_library_items(self).await?;
        facets::tally_qualities(&items)
    }

    async fn genres_with_counts(&self) -> Result<Vec<FacetCount>, ErrorRecord> {
        let items = collect_library_items(self).await?;
        facets::tally_genres(&items)
    }

    async fn ratings_with_counts(&self) -> Result<Vec<FacetCount>, ErrorRecord> {
        let items = collect_library_items(self).await?;
        facets::tally_ratings(&items)
    }
}

/// Scan every library, skipping the ones whose fetch fails. Fetch failures
/// are already logged and counted by the tracked call underneath; the listing
/// of libraries itself failing is fatal to the aggregation request.
async fn collect_library_items<P: MediaProvider + ?Sized>(
    provider: &P,
) -> Result<Vec<MediaItem>, ErrorRecord> {
    let libraries = provider.libraries().await?;
    let mut items = Vec::new();
    for library in libraries {
        match provider.library_items(&library.id).await {
            Ok(batch) => items.extend(batch),
            Err(error) => {
                warn!(
                    library = %library.name,
                    code = %error.code,
                    "library fetch failed during aggregation, skipping"
                );
            }
        }
    }
    Ok(items)
}

/// Create the client for one configured provider.
pub fn create_provider(
    config: &ProviderConfig,
    metrics: Arc<MetricsLedger>,
) -> anyhow::Result<Arc<dyn MediaProvider>> {
    Ok(match config.kind {
        ProviderKind::Jellyfin => {
            Arc::new(embyserver::EmbyServerProvider::jellyfin(config, metrics)?)
        }
        ProviderKind::Emby => Arc::new(embyserver::EmbyServerProvider::emby(config, metrics)?),
        ProviderKind::Radarr => Arc::new(arr::ArrCatalogProvider::radarr(config, metrics)?),
        ProviderKind::Sonarr => Arc::new(arr::ArrCatalogProvider::sonarr(config, metrics)?),
    })
}

/// Run one provider call with full ledger accounting: an attempt up front,
/// retries inside the executor, and a terminal error on failure.
pub(crate) async fn tracked_call<T, F, Fut>(
    metrics: &MetricsLedger,
    provider: &str,
    operation: &str,
    policy: RetryPolicy,
    op: F,
) -> Result<T, ErrorRecord>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ErrorRecord>>,
{
    metrics.record_attempt(provider, operation);

    let result = retry_request(
        policy,
        Some(RetryContext {
            metrics,
            provider,
            operation,
        }),
        op,
    )
    .await;

    if let Err(error) = &result {
        metrics.record_error(provider, operation);
        warn!(
            provider,
            operation,
            code = %error.code,
            status = ?error.http_status,
            "provider call failed"
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("plex".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::Jellyfin).unwrap(),
            "\"jellyfin\""
        );
    }
}
