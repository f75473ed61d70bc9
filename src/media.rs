//! Normalized media types shared by every provider kind.
//!
//! Providers map their raw payloads into [`MediaItem`] at fetch time; the
//! filter engine and facet aggregation only ever see these shapes and never
//! mutate them in place.

use serde::{Deserialize, Serialize};

/// A normalized catalog entry from any provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    /// Upstream item kind (e.g. "Movie", "Series"). Kept as the raw string
    /// since providers disagree on the vocabulary.
    pub media_type: String,
    pub production_year: Option<u16>,
    /// ISO-8601 premiere / release date, when the provider supplies one.
    pub premiere_date: Option<String>,
    /// Date the item became available in the library.
    pub date_created: Option<String>,
    /// Official content rating (e.g. "PG-13").
    pub official_rating: Option<String>,
    /// Community / audience rating (typically 0.0 - 10.0).
    pub community_rating: Option<f64>,
    /// Personal rating from the requesting user, when the provider tracks one.
    pub user_rating: Option<f64>,
    pub genres: Vec<String>,
    pub media_sources: Vec<MediaSource>,
}

/// One playable source (file/version) of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub streams: Vec<MediaStream>,
}

/// One stream inside a media source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaStream {
    pub stream_type: StreamType,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl MediaItem {
    /// Video height from the first video stream of the first listed media
    /// source. Alternate sources never contribute, so an item resolves to at
    /// most one quality bucket.
    pub fn video_height(&self) -> Option<u32> {
        self.media_sources.first().and_then(|source| {
            source
                .streams
                .iter()
                .find(|s| s.stream_type == StreamType::Video)
                .and_then(|s| s.height)
        })
    }

    /// Release year: explicit year field first, then the premiere date, then
    /// the availability date.
    pub fn resolved_year(&self) -> Option<u16> {
        self.production_year
            .or_else(|| parse_year(self.premiere_date.as_deref()))
            .or_else(|| parse_year(self.date_created.as_deref()))
    }
}

/// A provider library (or a synthetic one for providers without libraries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
}

/// One countable value of a filterable dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
pub fn parse_year(date: Option<&str>) -> Option<u16> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}
