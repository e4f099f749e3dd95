//! Candidate resolution: primary catalog first, scored secondary fallback.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::candidate::{MediaCandidate, MediaKind, first_present, release_year};
use crate::catalog::{PrimaryCatalog, SecondaryCatalog};
use crate::config::Config;
use crate::itunes::{ItunesClient, ItunesMedia, ItunesResult};
use crate::tmdb::TmdbClient;

/// Upper bound on candidates handed to the assessment step.
pub const MAX_CANDIDATES: usize = 8;

const FULL_QUERY_BONUS: f64 = 6.0;
const ALL_TERMS_BONUS: f64 = 3.0;
const MOVIE_KIND_BONUS: f64 = 1.5;
const EPISODE_KIND_BONUS: f64 = 1.5;
const RELEASE_DATE_BONUS: f64 = 0.5;

/// Resolves a free-text query into a small, ranked candidate list.
#[derive(Clone)]
pub struct CandidateResolver {
    primary: Arc<dyn PrimaryCatalog>,
    secondary: Arc<dyn SecondaryCatalog>,
}

impl CandidateResolver {
    pub fn new(primary: Arc<dyn PrimaryCatalog>, secondary: Arc<dyn SecondaryCatalog>) -> Self {
        Self { primary, secondary }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(TmdbClient::from_config(config)),
            Arc::new(ItunesClient::from_config(config)),
        )
    }

    /// Resolve `query` into at most [`MAX_CANDIDATES`] candidates, best first.
    ///
    /// A non-empty primary result is authoritative and skips the secondary
    /// catalog entirely.
    pub async fn resolve(&self, query: &str) -> Vec<MediaCandidate> {
        let mut primary = self.primary.search(query).await;
        if !primary.is_empty() {
            primary.truncate(MAX_CANDIDATES);
            info!(query, count = primary.len(), "Resolved from primary catalog");
            return primary;
        }

        let (movies, tv_shows) = tokio::join!(
            self.secondary.search(query, ItunesMedia::Movie),
            self.secondary.search(query, ItunesMedia::TvShow),
        );

        let candidates = rank_results(movies.into_iter().chain(tv_shows).collect(), query);
        info!(query, count = candidates.len(), "Resolved from secondary catalog");
        candidates
    }
}

/// Score, order, truncate and normalize raw secondary results.
///
/// Movie results must precede TV results in `combined`; ties keep that order.
pub fn rank_results(combined: Vec<ItunesResult>, query: &str) -> Vec<MediaCandidate> {
    let normalized_query = query.to_lowercase();

    let mut scored: Vec<(ItunesResult, f64)> = combined
        .into_iter()
        .map(|item| {
            let score = score_result(&item, &normalized_query);
            (item, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(MAX_CANDIDATES);

    let mut seen = HashSet::new();
    scored
        .into_iter()
        .enumerate()
        .map(|(index, (item, score))| {
            let mut candidate = to_candidate(&item, query, index);
            if !seen.insert(candidate.id.clone()) {
                candidate.id = synthesized_id(index);
                seen.insert(candidate.id.clone());
            }
            debug!(id = %candidate.id, title = %candidate.title, score, "Ranked candidate");
            candidate
        })
        .collect()
}

/// Relevance score of one raw result against a lowercased query.
pub fn score_result(item: &ItunesResult, normalized_query: &str) -> f64 {
    let haystack = [
        &item.track_name,
        &item.collection_name,
        &item.primary_genre_name,
    ]
    .into_iter()
    .filter_map(|f| f.as_deref())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    let mut score = 0.0;
    if haystack.contains(normalized_query) {
        score += FULL_QUERY_BONUS;
    }
    if normalized_query
        .split_whitespace()
        .all(|term| haystack.contains(term))
    {
        score += ALL_TERMS_BONUS;
    }

    let kind = item.kind.as_deref().unwrap_or_default();
    if kind.contains("movie") {
        score += MOVIE_KIND_BONUS;
    }
    if kind.contains("tv-episode") {
        score += EPISODE_KIND_BONUS;
    }
    if first_present([&item.release_date]).is_some() {
        score += RELEASE_DATE_BONUS;
    }
    score
}

/// Fixed display label for a raw result.
pub fn label_kind(item: &ItunesResult) -> MediaKind {
    match (item.kind.as_deref(), item.wrapper_type.as_deref()) {
        (Some("feature-movie"), _) => MediaKind::Movie,
        (Some("tv-episode"), _) => MediaKind::TvEpisode,
        (_, Some("collection")) => MediaKind::TvSeason,
        _ => MediaKind::Media,
    }
}

fn to_candidate(item: &ItunesResult, query: &str, index: usize) -> MediaCandidate {
    let artwork = first_present([&item.artwork_url100, &item.artwork_url60]).unwrap_or_default();

    MediaCandidate {
        id: item
            .track_id
            .or(item.collection_id)
            .map(|id| id.to_string())
            .unwrap_or_else(|| synthesized_id(index)),
        title: first_present([&item.track_name, &item.collection_name])
            .unwrap_or(query)
            .to_string(),
        year: release_year(item.release_date.as_deref()),
        kind: label_kind(item),
        artwork_url: artwork.replace("100x100bb", "200x200bb"),
        backdrop_url: None,
        description: first_present([
            &item.long_description,
            &item.description,
            &item.short_description,
        ])
        .map(str::to_string),
        source: first_present([&item.track_view_url, &item.collection_view_url]).map(str::to_string),
        season_number: None,
        episode_number: None,
        original_query: None,
    }
}

fn synthesized_id(index: usize) -> String {
    format!("candidate-{index}")
}
