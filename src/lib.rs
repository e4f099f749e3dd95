//! Watch Check: will watching this title knock me out of a holiday song challenge?
//!
//! Resolves a free-text title query into ranked media candidates and asks a
//! reasoning service for a risk assessment, falling back to a cautious
//! deterministic answer when that service is missing or fails.

pub mod assess;
pub mod candidate;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod itunes;
pub mod pipeline;
pub mod reasoning;
pub mod resolver;
pub mod server;
pub mod tmdb;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use diagnostics::{Diagnostics, JsonlDiagnostics, NoopDiagnostics};

pub use candidate::{AssessmentResult, AssessmentSource, MediaCandidate, MediaKind};
pub use config::Config;
pub use error::WatchCheckError;
pub use pipeline::WatchCheck;

/// Build the diagnostics sink for a configuration.
///
/// `enabled = false` discards every event.
pub fn diagnostics_for(config: &Config, enabled: bool) -> Arc<dyn Diagnostics> {
    if enabled {
        Arc::new(JsonlDiagnostics::new(config.diagnostics_path.clone()))
    } else {
        Arc::new(NoopDiagnostics)
    }
}
