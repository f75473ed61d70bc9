//! Pure content filtering against configured rules.
//!
//! All configured dimensions are AND-combined; a blank or absent dimension
//! passes everything. Inputs are never mutated — survivors are cloned into a
//! fresh list.

use serde::{Deserialize, Serialize};

use crate::media::MediaItem;

/// The fixed, ordered set of canonical quality labels. Heights outside these
/// buckets yield a literal `"<height>p"` label instead.
pub const STANDARD_QUALITIES: [&str; 4] = ["SD", "720p", "1080p", "4K"];

/// Per-provider filter configuration, read-only during a filter pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Comma-separated genre terms, matched case-insensitively as substrings.
    #[serde(default)]
    pub genres: Option<String>,
    /// Comma-separated quality labels (members of [`STANDARD_QUALITIES`]).
    #[serde(default)]
    pub qualities: Option<String>,
    /// Official content ratings to keep; a single string is a singleton list.
    #[serde(default)]
    pub ratings: Option<RatingFilter>,
    /// Comma-separated years or inclusive `"YYYY-YYYY"` ranges.
    #[serde(default)]
    pub years: Option<String>,
    /// Alternate rating configuration shape carried over from older setups.
    #[serde(default)]
    pub legacy_ratings: Option<LegacyRatingFilters>,
}

/// Either one rating or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingFilter {
    One(String),
    Many(Vec<String>),
}

impl RatingFilter {
    fn terms(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            RatingFilter::One(s) => vec![s.as_str()],
            RatingFilter::Many(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Three independent checks; each defaults to "pass" when unset in config or
/// absent on the item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyRatingFilters {
    #[serde(default)]
    pub min_community_rating: Option<f64>,
    #[serde(default)]
    pub allowed_official_ratings: Option<Vec<String>>,
    #[serde(default)]
    pub min_user_rating: Option<f64>,
}

/// Map a resolved video height to its quality bucket label.
pub fn quality_bucket(height: u32) -> String {
    if height <= 576 {
        "SD".to_string()
    } else if height <= 720 {
        "720p".to_string()
    } else if height <= 1080 {
        "1080p".to_string()
    } else if height >= 2160 {
        "4K".to_string()
    } else {
        format!("{height}p")
    }
}

/// Quality label for an item, or `None` when no height is resolvable.
pub fn item_quality_label(item: &MediaItem) -> Option<String> {
    item.video_height().map(quality_bucket)
}

/// Filter `items` against `config`. Pure; survivors are cloned.
pub fn apply_content_filtering(items: &[MediaItem], config: &FilterConfig) -> Vec<MediaItem> {
    let genre_terms: Vec<String> = split_terms(config.genres.as_deref())
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();
    let quality_terms = split_terms(config.qualities.as_deref());
    let rating_terms: Vec<&str> = config
        .ratings
        .as_ref()
        .map(|r| r.terms())
        .unwrap_or_default();
    let year_spans = parse_year_spans(config.years.as_deref());

    items
        .iter()
        .filter(|item| passes_genres(item, &genre_terms))
        .filter(|item| passes_quality(item, &quality_terms))
        .filter(|item| passes_ratings(item, &rating_terms))
        .filter(|item| passes_years(item, &year_spans))
        .filter(|item| passes_legacy(item, config.legacy_ratings.as_ref()))
        .cloned()
        .collect()
}

fn split_terms(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Inclusive year ranges parsed from `"1999, 2005-2010"` style input.
/// Unparsable tokens are skipped.
fn parse_year_spans(raw: Option<&str>) -> Vec<(u16, u16)> {
    split_terms(raw)
        .iter()
        .filter_map(|token| match token.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse().ok()?;
                let end = end.trim().parse().ok()?;
                Some((start, end))
            }
            None => {
                let year = token.parse().ok()?;
                Some((year, year))
            }
        })
        .collect()
}

fn passes_genres(item: &MediaItem, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    if item.genres.is_empty() {
        return false;
    }
    item.genres.iter().any(|genre| {
        let genre = genre.to_lowercase();
        terms.iter().any(|term| genre.contains(term))
    })
}

fn passes_quality(item: &MediaItem, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    match item_quality_label(item) {
        // Labels outside the fixed standard set pass through unfiltered so
        // new upstream resolutions are not silently dropped.
        Some(label) => {
            terms.iter().any(|t| t == &label) || !STANDARD_QUALITIES.contains(&label.as_str())
        }
        None => true,
    }
}

fn passes_ratings(item: &MediaItem, terms: &[&str]) -> bool {
    if terms.is_empty() {
        return true;
    }
    match item.official_rating.as_deref().map(str::trim) {
        Some(rating) if !rating.is_empty() => terms.contains(&rating),
        _ => false,
    }
}

fn passes_years(item: &MediaItem, spans: &[(u16, u16)]) -> bool {
    if spans.is_empty() {
        return true;
    }
    match item.resolved_year() {
        Some(year) => spans.iter().any(|(start, end)| (*start..=*end).contains(&year)),
        None => false,
    }
}

fn passes_legacy(item: &MediaItem, legacy: Option<&LegacyRatingFilters>) -> bool {
    let Some(legacy) = legacy else {
        return true;
    };

    if let (Some(min), Some(rating)) = (legacy.min_community_rating, item.community_rating) {
        if rating < min {
            return false;
        }
    }

    if let (Some(allowed), Some(rating)) = (
        legacy.allowed_official_ratings.as_ref(),
        item.official_rating.as_deref(),
    ) {
        if !allowed.is_empty() && !allowed.iter().any(|a| a == rating) {
            return false;
        }
    }

    if let (Some(min), Some(rating)) = (legacy.min_user_rating, item.user_rating) {
        if rating < min {
            return false;
        }
    }

    true
}
