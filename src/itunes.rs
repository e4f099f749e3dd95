//! Secondary catalog client (iTunes Search API).
//!
//! Queried only when the primary catalog has nothing. Results come back raw;
//! scoring and normalization happen in the resolver.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::{CatalogError, SecondaryCatalog};
use crate::config::Config;

/// Per-kind result limit requested from the catalog.
pub const SEARCH_LIMIT: u32 = 10;

/// Media kinds the secondary catalog is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItunesMedia {
    Movie,
    TvShow,
}

impl ItunesMedia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvShow => "tvShow",
        }
    }
}

/// One raw search hit. Every field is optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItunesResult {
    pub track_id: Option<u64>,
    pub collection_id: Option<u64>,
    pub track_name: Option<String>,
    pub collection_name: Option<String>,
    pub release_date: Option<String>,
    pub kind: Option<String>,
    pub artwork_url100: Option<String>,
    pub artwork_url60: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub primary_genre_name: Option<String>,
    pub track_view_url: Option<String>,
    pub collection_view_url: Option<String>,
    pub wrapper_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItunesSearchResponse {
    #[serde(default)]
    results: Vec<ItunesResult>,
}

/// Unauthenticated client for the iTunes search endpoint.
pub struct ItunesClient {
    base_url: String,
    client: reqwest::Client,
}

impl ItunesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.itunes_base_url.clone())
    }

    async fn fetch(&self, term: &str, media: ItunesMedia) -> Result<Vec<ItunesResult>, CatalogError> {
        let limit = SEARCH_LIMIT.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("term", term),
                ("media", media.as_str()),
                ("limit", limit.as_str()),
            ])
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

        let body: ItunesSearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(body.results)
    }
}

#[async_trait]
impl SecondaryCatalog for ItunesClient {
    async fn search(&self, term: &str, media: ItunesMedia) -> Vec<ItunesResult> {
        match self.fetch(term, media).await {
            Ok(results) => {
                debug!(media = media.as_str(), count = results.len(), "iTunes search");
                results
            }
            Err(e) => {
                warn!(media = media.as_str(), "iTunes search failed: {e}");
                Vec::new()
            }
        }
    }
}
