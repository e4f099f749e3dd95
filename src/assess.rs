//! Assessment engine.
//!
//! Turns a query and its candidates into an [`AssessmentResult`]. With no
//! reasoning client configured the answer is the deterministic fallback.
//! Otherwise the reasoning service is asked once; any failure returns the
//! fallback with the failure message appended in parentheses.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::candidate::{
    AssessmentResult, AssessmentSource, CHALLENGES, ChallengeRule, MediaCandidate, MediaKind,
    UNKNOWN_YEAR,
};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::reasoning::{OpenAiClient, ReasoningClient, ReasoningError, ReasoningRequest};

/// Narrative used whenever the reasoning service is not consulted or fails.
pub const FALLBACK_ASSESSMENT: &str = "Could not reach the safety checker. Based on public metadata alone, no soundtrack details were found. If you suspect the soundtrack includes holiday pop hits, use caution or verify the official track list.";

/// Id of the placeholder candidate built when nothing was found.
pub const PLACEHOLDER_ID: &str = "unknown";

const SCHEMA_NAME: &str = "watch_check_assessment";

const SYSTEM_PROMPT: &[&str] = &[
    "You are providing summaries to players in various holiday challenges to help them avoid being knocked by hearing specific songs.",
    "Step 1: produce an exhaustive list of all music used in the best-matching title (movie or TV episode): original score cues plus every pop/licensed song used anywhere in scenes. Use search tools to determine what information is available, and use your knowledge as supplementary. Do not guess or approximate—if you cannot verify, state that clearly. If the content is a TV series, use season and episode details to narrow it down",
    "Step 2: check if any of those songs match the challenge knockout songs provided. Consider exact matches and well-known holiday pop tracks (e.g., 'Last Christmas', 'Little Drummer Boy').",
    "Step 3: respond playfully: if a knockout song is present, name it and the challenge and warn they'll be out; otherwise tell them it's safe to watch. If you cannot verify all music, say so and recommend not watching until verified.",
    "Use only verifiable details; no speculation. Keep responses under 90 words and bias toward caution when verification is incomplete.",
    "Use the player's original text together with the candidate metadata to pick the intended title (including season/episode if provided).",
];

// ============================================================================
// Engine
// ============================================================================

/// Produces assessments, optionally backed by a reasoning service.
#[derive(Clone)]
pub struct AssessmentEngine {
    reasoning: Option<Arc<dyn ReasoningClient>>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl AssessmentEngine {
    /// Create an engine. `None` pins it to the fallback path.
    pub fn new(
        reasoning: Option<Arc<dyn ReasoningClient>>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            reasoning,
            diagnostics,
        }
    }

    pub fn from_config(config: &Config, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let reasoning = match OpenAiClient::from_config(config, diagnostics.clone()) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn ReasoningClient>),
            Err(e) => {
                info!("{e}; assessments will use the fallback answer");
                None
            }
        };
        Self::new(reasoning, diagnostics)
    }

    /// Assess `candidates` for `query`. Never fails.
    pub async fn assess(&self, query: &str, candidates: Vec<MediaCandidate>) -> AssessmentResult {
        let fallback = build_fallback(query, &candidates);

        let Some(reasoning) = self.reasoning.as_ref() else {
            return fallback;
        };

        match self.ask(reasoning.as_ref(), query, &candidates).await {
            Ok(answer) => {
                let matched = candidates
                    .iter()
                    .find(|c| c.id == answer.best_id)
                    .cloned()
                    .unwrap_or_else(|| {
                        warn!(best_id = %answer.best_id, "Reasoning service named an unknown candidate");
                        fallback.matched.clone()
                    });
                let alternatives = candidates
                    .into_iter()
                    .filter(|c| c.id != matched.id)
                    .collect();

                AssessmentResult {
                    assessment: if answer.assessment.is_empty() {
                        fallback.assessment
                    } else {
                        answer.assessment
                    },
                    matched,
                    alternatives,
                    source: AssessmentSource::Rag,
                }
            }
            Err(e) => {
                error!("Reasoning assessment failed: {e}");
                AssessmentResult {
                    assessment: format!("{} ({e})", fallback.assessment),
                    ..fallback
                }
            }
        }
    }

    async fn ask(
        &self,
        reasoning: &dyn ReasoningClient,
        query: &str,
        candidates: &[MediaCandidate],
    ) -> Result<AiAssessment, ReasoningError> {
        self.diagnostics
            .append(
                "openai",
                "request",
                json!({
                    "query": query,
                    "candidates": candidates
                        .iter()
                        .map(|c| json!({
                            "id": c.id,
                            "title": c.title,
                            "year": c.year,
                            "kind": c.kind,
                            "season": c.season_number,
                            "episode": c.episode_number,
                        }))
                        .collect::<Vec<_>>(),
                }),
            )
            .await;

        let body = reasoning
            .respond(&build_request(query, candidates, CHALLENGES))
            .await?;
        extract_assessment(&body, candidates).ok_or(ReasoningError::NoAssessment)
    }
}

// ============================================================================
// Fallback
// ============================================================================

/// Deterministic cautious answer: first candidate wins.
pub fn build_fallback(query: &str, candidates: &[MediaCandidate]) -> AssessmentResult {
    let matched = candidates
        .first()
        .cloned()
        .unwrap_or_else(|| placeholder_candidate(query));

    AssessmentResult {
        assessment: FALLBACK_ASSESSMENT.to_string(),
        alternatives: candidates
            .iter()
            .filter(|c| c.id != matched.id)
            .cloned()
            .collect(),
        matched,
        source: AssessmentSource::Fallback,
    }
}

fn placeholder_candidate(query: &str) -> MediaCandidate {
    MediaCandidate {
        id: PLACEHOLDER_ID.to_string(),
        title: query.to_string(),
        year: UNKNOWN_YEAR.to_string(),
        kind: MediaKind::Unknown,
        artwork_url: String::new(),
        backdrop_url: None,
        description: Some(
            "No metadata found in public sources. Please double-check the title.".to_string(),
        ),
        source: None,
        season_number: None,
        episode_number: None,
        original_query: None,
    }
}

// ============================================================================
// Request Construction
// ============================================================================

/// Build the reasoning request for a query, its candidates and the challenges.
pub fn build_request(
    query: &str,
    candidates: &[MediaCandidate],
    challenges: &[ChallengeRule],
) -> ReasoningRequest {
    ReasoningRequest {
        system: SYSTEM_PROMPT.join(" "),
        user: vec![
            format!("User query (player text): {query}"),
            format!(
                "Candidates (title/year/media):\n{}\n\nChallenges and knockout songs:\n{}\nPick the best candidate id and provide a short, playful assessment per the rules.",
                render_candidates(candidates),
                render_challenges(challenges),
            ),
        ],
        schema_name: SCHEMA_NAME.to_string(),
        schema: assessment_schema(),
    }
}

/// One line per candidate: `id: .. | title: .. | year: .. | kind: .. | ...`.
pub fn render_candidates(candidates: &[MediaCandidate]) -> String {
    candidates
        .iter()
        .map(|c| {
            let mut parts = vec![
                format!("id: {}", c.id),
                format!("title: {}", c.title),
                format!("year: {}", c.year),
                format!("kind: {}", c.kind),
            ];
            if let Some(season) = c.season_number.filter(|n| *n > 0) {
                parts.push(format!("season: {season}"));
            }
            if let Some(episode) = c.episode_number.filter(|n| *n > 0) {
                parts.push(format!("episode: {episode}"));
            }
            parts.push(format!(
                "description: {}",
                c.description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or("No description provided.")
            ));
            parts.join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per challenge with its window and knockout songs.
pub fn render_challenges(challenges: &[ChallengeRule]) -> String {
    challenges
        .iter()
        .map(|c| {
            format!(
                "{} ({}): avoid songs -> {}. Knocked out if recognized.",
                c.name,
                c.window,
                c.knockout_songs.join("; ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Declared schema of the structured answer. Extra fields are rejected.
pub fn assessment_schema() -> Value {
    json!({
        "type": "object",
        "required": ["best_id", "assessment"],
        "additionalProperties": false,
        "properties": {
            "best_id": {
                "type": "string",
                "description": "The id of the candidate that best matches the query."
            },
            "assessment": {
                "type": "string",
                "description": "A concise risk summary of whether watching the media is likely to include challenge songs. Under 90 words."
            }
        }
    })
}

// ============================================================================
// Response Parsing
// ============================================================================

/// The two fields the reasoning service is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiAssessment {
    pub best_id: String,
    pub assessment: String,
}

type Extractor = fn(&Value, &[MediaCandidate]) -> Option<AiAssessment>;

/// Response shapes, tried in order. First match wins.
const EXTRACTORS: &[Extractor] = &[from_output_parsed, from_output_text, from_output_items];

/// Pull the chosen id and narrative out of a response body.
///
/// Returns `None` when no known shape carries an answer.
pub fn extract_assessment(body: &Value, candidates: &[MediaCandidate]) -> Option<AiAssessment> {
    EXTRACTORS
        .iter()
        .find_map(|extract| extract(body, candidates))
}

/// `output_parsed`: structured output already decoded by the service.
fn from_output_parsed(body: &Value, _candidates: &[MediaCandidate]) -> Option<AiAssessment> {
    complete_pair(body.get("output_parsed")?)
}

/// `output_text`: a plain-text convenience field.
fn from_output_text(body: &Value, candidates: &[MediaCandidate]) -> Option<AiAssessment> {
    let text = body.get("output_text")?.as_str()?;
    Some(scan_text(text, candidates))
}

/// `output`: typed output items holding message content blocks.
fn from_output_items(body: &Value, candidates: &[MediaCandidate]) -> Option<AiAssessment> {
    for item in body.get("output")?.as_array()? {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let Some(blocks) = item.get("content").and_then(Value::as_array) else {
            continue;
        };

        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("output_text") => {
                    if let Some(text) = block.get("text").and_then(Value::as_str) {
                        return Some(scan_text(text, candidates));
                    }
                }
                Some("json") => {
                    if let Some(answer) = block.get("json").and_then(complete_pair) {
                        return Some(answer);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Look for an inline JSON answer; otherwise the whole text is the narrative.
fn scan_text(text: &str, candidates: &[MediaCandidate]) -> AiAssessment {
    parse_inline_json(text).unwrap_or_else(|| AiAssessment {
        best_id: first_candidate_id(candidates),
        assessment: text.to_string(),
    })
}

/// Parse the outermost brace-delimited object embedded in `text`.
fn parse_inline_json(text: &str) -> Option<AiAssessment> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    complete_pair(&value)
}

/// Accept an object only when both fields are present and non-empty.
///
/// A numeric `best_id` is kept in its decimal form.
fn complete_pair(value: &Value) -> Option<AiAssessment> {
    let best_id = match value.get("best_id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    let assessment = value.get("assessment")?.as_str()?.to_string();
    (!best_id.is_empty() && !assessment.is_empty()).then_some(AiAssessment {
        best_id,
        assessment,
    })
}

fn first_candidate_id(candidates: &[MediaCandidate]) -> String {
    candidates
        .first()
        .map(|c| c.id.clone())
        .unwrap_or_else(|| PLACEHOLDER_ID.to_string())
}

// ============================================================================
// Tests
// ============================================================================
