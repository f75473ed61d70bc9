//! Facet tallying for quality / genre / rating counts.
//!
//! These are the pure halves of the Content Aggregator: the network half
//! (per-library fetching with partial-failure tolerance) lives in the
//! provider layer, which feeds surviving items into the tallies here. A
//! failure inside the tallying itself is fatal and surfaces as
//! `AGGREGATION_FAILURE`, unlike a tolerated per-library fetch failure.

use std::collections::HashSet;

use crate::error::ErrorRecord;
use crate::filter::{item_quality_label, STANDARD_QUALITIES};
use crate::media::{FacetCount, MediaItem};

/// Tally quality labels across items.
///
/// Items with no resolvable height have no label and are skipped. Output
/// lists the standard labels in their fixed order (only those with a
/// non-zero count), followed by non-standard labels in first-seen order.
pub fn tally_qualities(items: &[MediaItem]) -> Result<Vec<FacetCount>, ErrorRecord> {
    let mut counts = Vec::new();
    for item in items {
        if let Some(label) = item_quality_label(item) {
            bump(&mut counts, label);
        }
    }
    order_facet_counts(counts, &STANDARD_QUALITIES)
        .map_err(|e| ErrorRecord::aggregation("failed to aggregate quality counts", e))
}

/// Tally raw (trimmed, unnormalized) genre strings. An item with N genres
/// contributes to N buckets.
pub fn tally_genres(items: &[MediaItem]) -> Result<Vec<FacetCount>, ErrorRecord> {
    let mut counts = Vec::new();
    for item in items {
        for genre in &item.genres {
            let genre = genre.trim();
            if !genre.is_empty() {
                bump(&mut counts, genre.to_string());
            }
        }
    }
    order_facet_counts(counts, &[])
        .map_err(|e| ErrorRecord::aggregation("failed to aggregate genre counts", e))
}

/// Tally raw (trimmed) official rating strings.
pub fn tally_ratings(items: &[MediaItem]) -> Result<Vec<FacetCount>, ErrorRecord> {
    let mut counts = Vec::new();
    for item in items {
        if let Some(rating) = item.official_rating.as_deref() {
            let rating = rating.trim();
            if !rating.is_empty() {
                bump(&mut counts, rating.to_string());
            }
        }
    }
    order_facet_counts(counts, &[])
        .map_err(|e| ErrorRecord::aggregation("failed to aggregate rating counts", e))
}

/// Increment the count for `value`, appending a new bucket on first sight so
/// first-seen order is preserved.
fn bump(counts: &mut Vec<FacetCount>, value: String) {
    match counts.iter_mut().find(|c| c.value == value) {
        Some(existing) => existing.count += 1,
        None => counts.push(FacetCount { value, count: 1 }),
    }
}

/// Order tallied counts: `standard_first` labels in their given order, then
/// everything else in first-seen order.
///
/// The tally upstream guarantees distinct bucket values; a duplicate here
/// would double-count downstream, so it is rejected as a fatal invariant
/// violation rather than silently merged.
fn order_facet_counts(
    counts: Vec<FacetCount>,
    standard_first: &[&str],
) -> Result<Vec<FacetCount>, String> {
    let mut seen = HashSet::new();
    for count in &counts {
        if !seen.insert(count.value.as_str()) {
            return Err(format!("duplicate facet bucket '{}'", count.value));
        }
    }

    let mut ordered = Vec::with_capacity(counts.len());
    for label in standard_first {
        if let Some(c) = counts.iter().find(|c| c.value == *label) {
            ordered.push(c.clone());
        }
    }
    for count in counts {
        if !standard_first.contains(&count.value.as_str()) {
            ordered.push(count);
        }
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaSource, MediaStream, StreamType};

    fn item_with_height(height: Option<u32>) -> MediaItem {
        MediaItem {
            id: "x".into(),
            title: "x".into(),
            media_type: "Movie".into(),
            production_year: None,
            premiere_date: None,
            date_created: None,
            official_rating: None,
            community_rating: None,
            user_rating: None,
            genres: vec![],
            media_sources: vec![MediaSource {
                streams: vec![MediaStream {
                    stream_type: StreamType::Video,
                    height,
                }],
            }],
        }
    }

    #[test]
    fn qualities_standard_order_then_first_seen() {
        let items = vec![
            item_with_height(Some(1440)),
            item_with_height(Some(2160)),
            item_with_height(Some(480)),
            item_with_height(Some(2160)),
            item_with_height(Some(1440)),
        ];
        let counts = tally_qualities(&items).unwrap();
        let values: Vec<&str> = counts.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["SD", "4K", "1440p"]);
        assert_eq!(counts[1].count, 2);
        assert_eq!(counts[2].count, 2);
    }

    #[test]
    fn zero_count_standard_labels_are_omitted() {
        let counts = tally_qualities(&[item_with_height(Some(1080))]).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].value, "1080p");
        assert_eq!(counts[0].count, 1);
    }

    #[test]
    fn items_without_height_are_skipped() {
        let counts = tally_qualities(&[item_with_height(None)]).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn genres_count_every_bucket_per_item() {
        let mut multi = item_with_height(None);
        multi.genres = vec!["Action".into(), " Drama ".into()];
        let mut single = item_with_height(None);
        single.genres = vec!["Drama".into(), "".into()];

        let counts = tally_genres(&[multi, single]).unwrap();
        let values: Vec<&str> = counts.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["Action", "Drama"]);
        assert_eq!(counts[1].count, 2);
    }

    #[test]
    fn ratings_are_trimmed_and_blank_skipped() {
        let mut a = item_with_height(None);
        a.official_rating = Some(" PG-13 ".into());
        let mut b = item_with_height(None);
        b.official_rating = Some("PG-13".into());
        let mut c = item_with_height(None);
        c.official_rating = Some("   ".into());

        let counts = tally_ratings(&[a, b, c]).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].value, "PG-13");
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn duplicate_buckets_are_a_fatal_aggregation_failure() {
        let dupes = vec![
            FacetCount {
                value: "SD".into(),
                count: 1,
            },
            FacetCount {
                value: "SD".into(),
                count: 2,
            },
        ];
        let err = order_facet_counts(dupes, &STANDARD_QUALITIES).unwrap_err();
        assert!(err.contains("duplicate facet bucket"));
    }
}
