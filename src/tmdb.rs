//! Primary catalog client (TMDB multi-search).
//!
//! Returns at most one best-guess candidate. Season and episode hints are
//! pulled out of the free-text query before searching, then reattached to
//! the candidate.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::candidate::{MediaCandidate, MediaKind, first_present, release_year};
use crate::catalog::{CatalogError, PrimaryCatalog};
use crate::config::Config;

const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const TMDB_SITE_BASE: &str = "https://www.themoviedb.org";
const POSTER_SIZE: &str = "w154";
const BACKDROP_SIZE: &str = "w780";

// ============================================================================
// Season / Episode Extraction
// ============================================================================

/// Season and episode numbers found in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonEpisode {
    pub season: u32,
    pub episode: u32,
}

/// Extraction patterns, tried in order. First match wins.
static SEASON_EPISODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)s(\d{1,2})\s*e(\d{1,3})",
        r"(?i)season\s+(\d{1,2}).*episode\s+(\d{1,3})",
        r"(?i)season\s+(\d{1,2}).*ep\s+(\d{1,3})",
        r"(?i)s(\d{1,2})\s*ep\s*(\d{1,3})",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Tokens removed from the query before it is sent to the catalog.
static STRIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)s\d{1,2}\s*e\d{1,3}",
        r"(?i)s\d{1,2}\s*ep\s*\d{1,3}",
        r"(?i)season\s+\d{1,2}\s+episode\s+\d{1,3}",
        r"(?i)season\s+\d{1,2}\s+ep\s+\d{1,3}",
        r"(?i)\bep\s+\d{1,3}\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Extract season/episode numbers from free text.
///
/// Recognizes `S02E03`, `season 2 ... episode 3`, `season 2 ... ep 3` and
/// `s2 ep3`, case-insensitively.
pub fn parse_season_episode(query: &str) -> Option<SeasonEpisode> {
    SEASON_EPISODE_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(query)?;
        Some(SeasonEpisode {
            season: caps[1].parse().ok()?,
            episode: caps[2].parse().ok()?,
        })
    })
}

/// A query prepared for catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    /// Query with season/episode tokens removed and whitespace collapsed.
    pub cleaned: String,
    pub season_episode: Option<SeasonEpisode>,
}

/// Strip season/episode tokens from a query, keeping the numbers aside.
///
/// Falls back to the trimmed raw query when nothing else is left.
pub fn normalize_query(raw: &str) -> NormalizedQuery {
    let trimmed = raw.trim();
    let season_episode = parse_season_episode(trimmed);

    let mut stripped = trimmed.to_string();
    for re in STRIP_PATTERNS.iter() {
        stripped = re.replace_all(&stripped, "").into_owned();
    }
    let stripped = WHITESPACE.replace_all(&stripped, " ").trim().to_string();

    NormalizedQuery {
        cleaned: if stripped.is_empty() {
            trimmed.to_string()
        } else {
            stripped
        },
        season_episode,
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TmdbMediaType {
    Movie,
    Tv,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TmdbResult {
    id: Option<u64>,
    #[serde(default)]
    media_type: TmdbMediaType,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbResult>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the TMDB multi-search endpoint.
pub struct TmdbClient {
    token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl TmdbClient {
    /// Create a client. A `None` token turns every search into a logged no-op.
    pub fn new(token: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            token,
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tmdb_token.clone(), config.tmdb_base_url.clone())
    }

    async fn search_multi(&self, token: &str, query: &str) -> Result<Vec<TmdbResult>, CatalogError> {
        let response = self
            .client
            .get(format!("{}/search/multi", self.base_url))
            .query(&[
                ("query", query),
                ("include_adult", "false"),
                ("language", "en-US"),
                ("page", "1"),
            ])
            .header("accept", "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body: TmdbSearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(body.results)
    }
}

#[async_trait]
impl PrimaryCatalog for TmdbClient {
    async fn search(&self, query: &str) -> Vec<MediaCandidate> {
        let Some(token) = self.token.as_deref() else {
            warn!("TMDB_READ_TOKEN is missing; skipping TMDB search");
            return Vec::new();
        };

        let normalized = normalize_query(query);
        debug!(query, cleaned = %normalized.cleaned, "Searching TMDB");

        let results = match self.search_multi(token, &normalized.cleaned).await {
            Ok(results) => results,
            Err(e) => {
                warn!("TMDB search failed: {e}");
                return Vec::new();
            }
        };

        results
            .iter()
            .find(|item| matches!(item.media_type, TmdbMediaType::Movie | TmdbMediaType::Tv))
            .map(|item| to_candidate(item, query, normalized.season_episode))
            .into_iter()
            .collect()
    }
}

fn to_candidate(item: &TmdbResult, query: &str, numbers: Option<SeasonEpisode>) -> MediaCandidate {
    let (kind, site_path) = match item.media_type {
        TmdbMediaType::Movie => (MediaKind::Movie, Some("movie")),
        TmdbMediaType::Tv => (MediaKind::TvSeries, Some("tv")),
        TmdbMediaType::Other => (MediaKind::Media, None),
    };

    let id = item
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "tmdb-0".to_string());

    MediaCandidate {
        title: first_present([&item.title, &item.name])
            .unwrap_or(query)
            .to_string(),
        year: release_year(first_present([&item.release_date, &item.first_air_date])),
        kind,
        artwork_url: image_url(POSTER_SIZE, &item.poster_path).unwrap_or_default(),
        backdrop_url: image_url(BACKDROP_SIZE, &item.backdrop_path),
        description: first_present([&item.overview]).map(str::to_string),
        source: site_path
            .zip(item.id)
            .map(|(path, id)| format!("{TMDB_SITE_BASE}/{path}/{id}")),
        season_number: numbers.map(|n| n.season),
        episode_number: numbers.map(|n| n.episode),
        original_query: Some(query.to_string()),
        id,
    }
}

fn image_url(size: &str, path: &Option<String>) -> Option<String> {
    first_present([path]).map(|p| format!("{TMDB_IMAGE_BASE}/{size}{p}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    // --- parse_season_episode ---

    #[test]
    fn test_parse_compact_form() {
        assert_eq!(
            parse_season_episode("The Office S03E10"),
            Some(SeasonEpisode {
                season: 3,
                episode: 10
            })
        );
    }

    #[test]
    fn test_parse_verbose_form() {
        assert_eq!(
            parse_season_episode("Friends season 2 episode 5"),
            Some(SeasonEpisode {
                season: 2,
                episode: 5
            })
        );
    }

    #[test]
    fn test_parse_season_ep_form() {
        assert_eq!(
            parse_season_episode("Community Season 2 ep 11"),
            Some(SeasonEpisode {
                season: 2,
                episode: 11
            })
        );
    }

    #[test]
    fn test_parse_s_ep_form() {
        assert_eq!(
            parse_season_episode("bluey s3 ep12"),
            Some(SeasonEpisode {
                season: 3,
                episode: 12
            })
        );
    }

    #[test]
    fn test_parse_no_pattern() {
        assert_eq!(parse_season_episode("Love Actually"), None);
        assert_eq!(parse_season_episode("Die Hard 2"), None);
    }

    // --- normalize_query ---

    #[test]
    fn test_normalize_strips_compact_token() {
        let n = normalize_query("  The Office   S03E10 ");
        assert_eq!(n.cleaned, "The Office");
        assert_eq!(n.season_episode.map(|s| s.episode), Some(10));
    }

    #[test]
    fn test_normalize_strips_verbose_tokens() {
        assert_eq!(normalize_query("Friends season 2 episode 5").cleaned, "Friends");
        assert_eq!(normalize_query("Friends season 2 ep 5").cleaned, "Friends");
        assert_eq!(normalize_query("Bluey s3 ep12").cleaned, "Bluey");
    }

    #[test]
    fn test_normalize_keeps_query_when_only_tokens() {
        let n = normalize_query("S01E01");
        assert_eq!(n.cleaned, "S01E01");
        assert!(n.season_episode.is_some());
    }

    #[test]
    fn test_normalize_plain_title_untouched() {
        let n = normalize_query("Home Alone");
        assert_eq!(n.cleaned, "Home Alone");
        assert!(n.season_episode.is_none());
    }

    // --- to_candidate ---

    fn result(media_type: TmdbMediaType) -> TmdbResult {
        TmdbResult {
            id: Some(1581),
            media_type,
            title: None,
            name: Some("The Office".into()),
            overview: Some("A mockumentary.".into()),
            release_date: None,
            first_air_date: Some("2005-03-24".into()),
            poster_path: Some("/poster.jpg".into()),
            backdrop_path: Some("/backdrop.jpg".into()),
        }
    }

    #[test]
    fn test_to_candidate_tv_series() {
        let numbers = Some(SeasonEpisode {
            season: 3,
            episode: 10,
        });
        let c = to_candidate(&result(TmdbMediaType::Tv), "The Office S03E10", numbers);
        assert_eq!(c.id, "1581");
        assert_eq!(c.title, "The Office");
        assert_eq!(c.year, "2005");
        assert_eq!(c.kind, MediaKind::TvSeries);
        assert_eq!(c.artwork_url, "https://image.tmdb.org/t/p/w154/poster.jpg");
        assert_eq!(
            c.backdrop_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w780/backdrop.jpg")
        );
        assert_eq!(c.source.as_deref(), Some("https://www.themoviedb.org/tv/1581"));
        assert_eq!(c.season_number, Some(3));
        assert_eq!(c.episode_number, Some(10));
        assert_eq!(c.original_query.as_deref(), Some("The Office S03E10"));
    }

    #[test]
    fn test_to_candidate_missing_fields() {
        let mut item = result(TmdbMediaType::Movie);
        item.name = None;
        item.first_air_date = None;
        item.poster_path = None;
        item.backdrop_path = Some(String::new());
        item.overview = Some(String::new());

        let c = to_candidate(&item, "mystery film", None);
        assert_eq!(c.title, "mystery film");
        assert_eq!(c.year, "Unknown");
        assert_eq!(c.kind, MediaKind::Movie);
        assert_eq!(c.artwork_url, "");
        assert!(c.backdrop_url.is_none());
        assert!(c.description.is_none());
        assert!(c.season_number.is_none());
    }

    // --- HTTP ---

    #[tokio::test]
    async fn test_search_without_token_returns_empty() {
        let client = TmdbClient::new(None, "http://127.0.0.1:9");
        assert!(client.search("Elf").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_takes_first_movie_or_tv_result() {
        let body = r#"{"results":[
            {"id":1,"media_type":"person","name":"Will Ferrell"},
            {"id":10719,"media_type":"movie","title":"Elf","release_date":"2003-10-09","poster_path":"/elf.jpg"},
            {"id":99,"media_type":"tv","name":"Elf: The Series"}
        ]}"#;
        let (base, request) = serve_once(200, body).await;
        let client = TmdbClient::new(Some("test-token".into()), base);

        let results = client.search("Elf").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "10719");
        assert_eq!(results[0].title, "Elf");
        assert_eq!(results[0].kind, MediaKind::Movie);
        assert_eq!(results[0].year, "2003");

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /search/multi?"));
        assert!(request.contains("query=elf"));
        assert!(request.contains("include_adult=false"));
        assert!(request.contains("bearer test-token"));
    }

    #[tokio::test]
    async fn test_search_sends_cleaned_query_and_keeps_numbers() {
        let body = r#"{"results":[{"id":2316,"media_type":"tv","name":"The Office"}]}"#;
        let (base, request) = serve_once(200, body).await;
        let client = TmdbClient::new(Some("t".into()), base);

        let results = client.search("The Office S03E10").await;
        assert_eq!(results[0].season_number, Some(3));
        assert_eq!(results[0].episode_number, Some(10));

        let request = request.await.unwrap();
        assert!(request.contains("query=The+Office&"));
    }

    #[tokio::test]
    async fn test_search_only_people_returns_empty() {
        let body = r#"{"results":[{"id":1,"media_type":"person","name":"Mariah Carey"}]}"#;
        let (base, _request) = serve_once(200, body).await;
        let client = TmdbClient::new(Some("t".into()), base);
        assert!(client.search("Mariah Carey").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_non_success_returns_empty() {
        let (base, _request) = serve_once(401, r#"{"status_message":"Invalid API key"}"#).await;
        let client = TmdbClient::new(Some("bad".into()), base);
        assert!(client.search("Elf").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_malformed_body_returns_empty() {
        let (base, _request) = serve_once(200, "<html>").await;
        let client = TmdbClient::new(Some("t".into()), base);
        assert!(client.search("Elf").await.is_empty());
    }
}
