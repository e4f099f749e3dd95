//! Shared data model: normalized candidates, assessment results and the
//! static challenge table.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Year placeholder used when a source has no usable release date.
pub const UNKNOWN_YEAR: &str = "Unknown";

// ============================================================================
// Media Candidate
// ============================================================================

/// Display label for the format of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MediaKind {
    #[serde(rename = "Movie")]
    Movie,
    #[serde(rename = "TV Series")]
    TvSeries,
    #[serde(rename = "TV episode")]
    TvEpisode,
    #[serde(rename = "TV season")]
    TvSeason,
    #[serde(rename = "Media")]
    Media,
    /// Only used by the placeholder candidate when nothing was found.
    #[serde(rename = "Unknown format")]
    Unknown,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::TvSeries => "TV Series",
            Self::TvEpisode => "TV episode",
            Self::TvSeason => "TV season",
            Self::Media => "Media",
            Self::Unknown => "Unknown format",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized, possibly-correct search result for a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaCandidate {
    /// Identifier unique within one resolution call.
    pub id: String,
    pub title: String,
    /// Four-digit year, or [`UNKNOWN_YEAR`].
    pub year: String,
    pub kind: MediaKind,
    /// Display-sized artwork URL; empty when the source has none.
    pub artwork_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Canonical page for the title in its source catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
}

// ============================================================================
// Assessment Result
// ============================================================================

/// Which path produced an [`AssessmentResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentSource {
    /// The narrative came from the reasoning service.
    Rag,
    /// The deterministic cautious answer.
    Fallback,
}

impl fmt::Display for AssessmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rag => f.write_str("rag"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Output of one watch check. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentResult {
    /// Human-readable risk narrative.
    pub assessment: String,
    /// The candidate the assessment is about.
    #[serde(rename = "match")]
    pub matched: MediaCandidate,
    /// Every other candidate, in resolution order.
    pub alternatives: Vec<MediaCandidate>,
    pub source: AssessmentSource,
}

// ============================================================================
// Challenges
// ============================================================================

/// A holiday listening challenge fed to the reasoning service as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeRule {
    pub name: &'static str,
    /// Human-readable validity window.
    pub window: &'static str,
    pub knockout_songs: &'static [&'static str],
}

/// Challenges every assessment is checked against.
pub const CHALLENGES: &[ChallengeRule] = &[
    ChallengeRule {
        name: "Whamageddon",
        window: "Day after Thanksgiving → Dec 24",
        knockout_songs: &["Last Christmas by Wham!"],
    },
    ChallengeRule {
        name: "Little Drummer Boy Challenge",
        window: "Day after Thanksgiving → Dec 24",
        knockout_songs: &["Little Drummer Boy (any recognizable version or sample)"],
    },
];

// ============================================================================
// Helpers
// ============================================================================

/// Derive a four-digit year from a catalog release date.
///
/// Accepts plain dates (`2003-11-07`), RFC 3339 timestamps
/// (`2003-11-07T08:00:00Z`) and bare or partial years (`2003`, `2003-11`).
/// Returns [`UNKNOWN_YEAR`] for missing or
/// unparseable input.
pub fn release_year(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return UNKNOWN_YEAR.to_string();
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.year().to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.year().to_string();
    }
    leading_year(raw)
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}

/// A four-digit year standing alone or followed by `-`.
fn leading_year(raw: &str) -> Option<&str> {
    let year = raw.get(..4)?;
    let rest = &raw[4..];
    (year.bytes().all(|b| b.is_ascii_digit()) && (rest.is_empty() || rest.starts_with('-')))
        .then_some(year)
}

/// First non-empty string among the given optional fields.
pub(crate) fn first_present<'a, const N: usize>(fields: [&'a Option<String>; N]) -> Option<&'a str> {
    fields
        .into_iter()
        .filter_map(|f| f.as_deref())
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> MediaCandidate {
        MediaCandidate {
            id: id.into(),
            title: "Love Actually".into(),
            year: "2003".into(),
            kind: MediaKind::Movie,
            artwork_url: String::new(),
            backdrop_url: None,
            description: None,
            source: None,
            season_number: None,
            episode_number: None,
            original_query: None,
        }
    }

    #[test]
    fn test_release_year_plain_date() {
        assert_eq!(release_year(Some("2003-11-14")), "2003");
    }

    #[test]
    fn test_release_year_timestamp() {
        assert_eq!(release_year(Some("1990-11-16T08:00:00Z")), "1990");
    }

    #[test]
    fn test_release_year_bare_and_partial_year() {
        assert_eq!(release_year(Some("2003")), "2003");
        assert_eq!(release_year(Some(" 1994 ")), "1994");
        assert_eq!(release_year(Some("2003-11")), "2003");
    }

    #[test]
    fn test_release_year_missing_or_garbage() {
        assert_eq!(release_year(None), UNKNOWN_YEAR);
        assert_eq!(release_year(Some("")), UNKNOWN_YEAR);
        assert_eq!(release_year(Some("someday")), UNKNOWN_YEAR);
        assert_eq!(release_year(Some("20031")), UNKNOWN_YEAR);
        assert_eq!(release_year(Some("déjà")), UNKNOWN_YEAR);
    }

    #[test]
    fn test_first_present_skips_empty() {
        let a = Some(String::new());
        let b = None;
        let c = Some("short".to_string());
        assert_eq!(first_present([&a, &b, &c]), Some("short"));
        assert_eq!(first_present([&a, &b]), None);
    }

    #[test]
    fn test_candidate_serializes_camel_case_and_skips_absent() {
        let mut c = candidate("42");
        c.season_number = Some(2);
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["artworkUrl"], "");
        assert_eq!(value["seasonNumber"], 2);
        assert_eq!(value["kind"], "Movie");
        assert!(value.get("episodeNumber").is_none());
        assert!(value.get("backdropUrl").is_none());
    }

    #[test]
    fn test_result_uses_match_and_lowercase_source() {
        let result = AssessmentResult {
            assessment: "Safe to watch.".into(),
            matched: candidate("1"),
            alternatives: vec![candidate("2")],
            source: AssessmentSource::Rag,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["match"]["id"], "1");
        assert_eq!(value["alternatives"][0]["id"], "2");
        assert_eq!(value["source"], "rag");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(MediaKind::TvSeries.to_string(), "TV Series");
        assert_eq!(MediaKind::TvEpisode.to_string(), "TV episode");
        assert_eq!(MediaKind::TvSeason.to_string(), "TV season");
        assert_eq!(MediaKind::Unknown.to_string(), "Unknown format");
    }

    #[test]
    fn test_challenges_have_knockout_songs() {
        assert_eq!(CHALLENGES.len(), 2);
        assert!(CHALLENGES.iter().all(|c| !c.knockout_songs.is_empty()));
    }
}
