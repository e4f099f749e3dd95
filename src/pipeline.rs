//! End-to-end watch check: validate, resolve, assess.

use std::sync::Arc;

use tracing::info;

use crate::assess::AssessmentEngine;
use crate::candidate::{AssessmentResult, MediaCandidate};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::WatchCheckError;
use crate::resolver::CandidateResolver;

/// The full candidate resolution and assessment pipeline.
#[derive(Clone)]
pub struct WatchCheck {
    resolver: CandidateResolver,
    engine: AssessmentEngine,
}

impl WatchCheck {
    pub fn new(resolver: CandidateResolver, engine: AssessmentEngine) -> Self {
        Self { resolver, engine }
    }

    /// Wire every component from one configuration value.
    pub fn from_config(config: &Config, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self::new(
            CandidateResolver::from_config(config),
            AssessmentEngine::from_config(config, diagnostics),
        )
    }

    /// Answer "will watching this knock me out?" for a free-text query.
    ///
    /// Only an empty query is an error; every upstream failure degrades to a
    /// best-effort result.
    pub async fn check(&self, query: &str) -> Result<AssessmentResult, WatchCheckError> {
        let query = validate_query(query)?;
        let candidates = self.resolver.resolve(query).await;
        let result = self.engine.assess(query, candidates).await;
        info!(
            query,
            matched = %result.matched.id,
            alternatives = result.alternatives.len(),
            source = %result.source,
            "Watch check complete"
        );
        Ok(result)
    }

    /// Resolve candidates without assessing them.
    pub async fn search(&self, query: &str) -> Result<Vec<MediaCandidate>, WatchCheckError> {
        let query = validate_query(query)?;
        Ok(self.resolver.resolve(query).await)
    }
}

fn validate_query(query: &str) -> Result<&str, WatchCheckError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(WatchCheckError::InvalidQuery("Query is required".into()));
    }
    Ok(query)
}
